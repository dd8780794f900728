//! Agent configuration helpers.
//!
//! This module loads, validates, and writes `config.json`. A missing file is
//! not an error: the agent falls back to the defaults it was built with.
use super::{StatePaths, CONFIG_SCHEMA_VERSION};
use crate::util::write_atomic;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_PACKAGE_URL: &str =
    "https://dl.influxdata.com/chronograf/releases/chronograf_1.3.3.0_amd64.deb";
const DEFAULT_PACKAGE_PATH: &str = "/opt/chronograf_1.3.3.0_amd64.deb";
const DEFAULT_UNIT_PATHS: [&str; 2] = [
    "/lib/systemd/system/chronograf.service",
    "/usr/lib/chronograf/scripts/chronograf.service",
];
const DEFAULT_INIT_SCRIPT_PATH: &str = "/usr/lib/chronograf/scripts/init.sh";

/// Default listening port announced to the http relation.
pub const DEFAULT_PORT: u16 = 8888;

/// Agent-owned configuration stored in `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub schema_version: u32,
    pub package_url: String,
    pub package_path: PathBuf,
    /// Package manager invocation; the package path is appended.
    pub install_command: String,
    pub reload_command: String,
    /// Service manager invocation; `restart|stop <service_name>` is appended.
    pub service_command: String,
    pub service_name: String,
    pub port: u16,
    /// Prefix applied to every rendered path.
    pub root: PathBuf,
    pub unit_paths: Vec<PathBuf>,
    pub init_script_path: PathBuf,
}

impl AgentConfig {
    /// Resolve a rendered artifact path under the configured root.
    pub fn rooted(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.root.join(relative)
    }
}

/// Build the config used when no `config.json` exists.
pub fn default_config() -> AgentConfig {
    AgentConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        package_url: DEFAULT_PACKAGE_URL.to_string(),
        package_path: PathBuf::from(DEFAULT_PACKAGE_PATH),
        install_command: "dpkg -i".to_string(),
        reload_command: "sudo systemctl daemon-reload".to_string(),
        service_command: "systemctl".to_string(),
        service_name: "chronograf".to_string(),
        port: DEFAULT_PORT,
        root: PathBuf::from("/"),
        unit_paths: DEFAULT_UNIT_PATHS.iter().map(PathBuf::from).collect(),
        init_script_path: PathBuf::from(DEFAULT_INIT_SCRIPT_PATH),
    }
}

/// Load `config.json`, or the defaults when the file does not exist.
pub fn load_config_or_default(state_dir: &Path) -> Result<AgentConfig> {
    let paths = StatePaths::new(state_dir.to_path_buf());
    let path = paths.config_path();
    if !path.is_file() {
        tracing::debug!(path = %path.display(), "config missing; using defaults");
        return Ok(default_config());
    }
    let bytes = fs::read(&path).with_context(|| format!("read config {}", path.display()))?;
    let config: AgentConfig = serde_json::from_slice(&bytes).context("parse agent config JSON")?;
    validate_config(&config)?;
    Ok(config)
}

/// Persist a config to disk in a stable JSON format.
pub fn write_config(state_dir: &Path, config: &AgentConfig) -> Result<()> {
    let paths = StatePaths::new(state_dir.to_path_buf());
    let text = serde_json::to_string_pretty(config).context("serialize agent config")?;
    write_atomic(&paths.config_path(), text.as_bytes())
}

/// Validate config schema and user-provided values.
pub fn validate_config(config: &AgentConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported agent config schema_version {}",
            config.schema_version
        ));
    }
    let commands = [
        ("install_command", &config.install_command),
        ("reload_command", &config.reload_command),
        ("service_command", &config.service_command),
    ];
    for (label, command) in commands {
        let words = shell_words::split(command)
            .with_context(|| format!("parse {label}: {command}"))?;
        if words.is_empty() {
            return Err(anyhow!("{label} must be non-empty"));
        }
    }
    if config.package_url.trim().is_empty() {
        return Err(anyhow!("package_url must be non-empty"));
    }
    if config.service_name.trim().is_empty() {
        return Err(anyhow!("service_name must be non-empty"));
    }
    if config.port == 0 {
        return Err(anyhow!("port must be non-zero"));
    }
    if config.unit_paths.is_empty() {
        return Err(anyhow!("unit_paths must list at least one path"));
    }
    for path in config.unit_paths.iter().chain([&config.init_script_path]) {
        if !path.is_absolute() {
            return Err(anyhow!(
                "rendered paths must be absolute (got {})",
                path.display()
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
