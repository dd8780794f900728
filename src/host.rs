//! Side effects on the machine the agent manages.
//!
//! Handlers only talk to the machine through [`Host`], which keeps the
//! reactor testable with an in-memory double.
use crate::agent::AgentConfig;
use crate::hooktools::run_hook_tool;
use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::time::Instant;

/// Workload status shown to an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadStatus {
    Maintenance,
    Blocked,
    Active,
}

impl WorkloadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadStatus::Maintenance => "maintenance",
            WorkloadStatus::Blocked => "blocked",
            WorkloadStatus::Active => "active",
        }
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External collaborators: package source, package manager, service manager,
/// port table, and status reporting.
pub trait Host {
    /// Fetch `url` to `dest`, replacing any previous download.
    fn download(&mut self, url: &str, dest: &Path) -> Result<()>;
    /// Install a downloaded package archive.
    fn install_package(&mut self, package: &Path) -> Result<()>;
    /// Tell the service manager to reload unit definitions.
    fn daemon_reload(&mut self) -> Result<()>;
    /// Restart the service. A service manager failure is logged, not raised.
    fn service_restart(&mut self, service: &str) -> Result<()>;
    /// Stop the service. A service manager failure is logged, not raised.
    fn service_stop(&mut self, service: &str) -> Result<()>;
    fn open_port(&mut self, port: u16) -> Result<()>;
    fn close_port(&mut self, port: u16) -> Result<()>;
    fn status_set(&mut self, status: WorkloadStatus, message: &str) -> Result<()>;
}

/// [`Host`] backed by the real machine: `ureq` for downloads, configured
/// commands for the package and service managers, hook tools for the rest.
pub struct SystemHost {
    install_command: Vec<String>,
    reload_command: Vec<String>,
    service_command: Vec<String>,
}

impl SystemHost {
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        Ok(Self {
            install_command: split_command("install_command", &config.install_command)?,
            reload_command: split_command("reload_command", &config.reload_command)?,
            service_command: split_command("service_command", &config.service_command)?,
        })
    }

    fn service_action(&self, action: &str, service: &str) -> Result<()> {
        let mut args = self.service_command.clone();
        args.push(action.to_string());
        args.push(service.to_string());
        let output = run_command(&args)?;
        if !output.status.success() {
            tracing::warn!(
                action,
                service,
                status = %output.status,
                stderr = %stderr_trim(&output),
                "service manager reported failure"
            );
        }
        Ok(())
    }
}

impl Host for SystemHost {
    fn download(&mut self, url: &str, dest: &Path) -> Result<()> {
        let start = Instant::now();
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        let response = ureq::get(url)
            .call()
            .with_context(|| format!("download {url}"))?;
        let mut reader = response.into_body().into_reader();
        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .with_context(|| format!("create temp file in {}", parent.display()))?;
        let bytes = std::io::copy(&mut reader, &mut tmp)
            .with_context(|| format!("download {url}"))?;
        tmp.persist(dest)
            .map_err(|err| err.error)
            .with_context(|| format!("publish {}", dest.display()))?;
        tracing::info!(
            url,
            bytes,
            elapsed_ms = start.elapsed().as_millis(),
            "package downloaded"
        );
        Ok(())
    }

    fn install_package(&mut self, package: &Path) -> Result<()> {
        let mut args = self.install_command.clone();
        args.push(
            package
                .to_str()
                .ok_or_else(|| anyhow!("package path is not valid UTF-8"))?
                .to_string(),
        );
        check_call(&args)
    }

    fn daemon_reload(&mut self) -> Result<()> {
        check_call(&self.reload_command)
    }

    fn service_restart(&mut self, service: &str) -> Result<()> {
        self.service_action("restart", service)
    }

    fn service_stop(&mut self, service: &str) -> Result<()> {
        self.service_action("stop", service)
    }

    fn open_port(&mut self, port: u16) -> Result<()> {
        run_hook_tool("open-port", &[format!("{port}/tcp")])?;
        Ok(())
    }

    fn close_port(&mut self, port: u16) -> Result<()> {
        run_hook_tool("close-port", &[format!("{port}/tcp")])?;
        Ok(())
    }

    fn status_set(&mut self, status: WorkloadStatus, message: &str) -> Result<()> {
        tracing::info!(%status, message, "status");
        run_hook_tool("status-set", &[status.to_string(), message.to_string()])?;
        Ok(())
    }
}

fn split_command(label: &str, command: &str) -> Result<Vec<String>> {
    let args = shell_words::split(command).with_context(|| format!("parse {label}: {command}"))?;
    if args.is_empty() {
        return Err(anyhow!("{label} is empty"));
    }
    Ok(args)
}

fn run_command(args: &[String]) -> Result<Output> {
    let (program, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("command is empty"))?;
    let start = Instant::now();
    let output = Command::new(program)
        .args(rest)
        .output()
        .with_context(|| format!("spawn {program}"))?;
    tracing::info!(
        command = %args.join(" "),
        elapsed_ms = start.elapsed().as_millis(),
        success = output.status.success(),
        "command complete"
    );
    Ok(output)
}

/// Run a command that must succeed.
fn check_call(args: &[String]) -> Result<()> {
    let output = run_command(args)?;
    if !output.status.success() {
        return Err(anyhow!(
            "`{}` failed with status {}: {}",
            args.join(" "),
            output.status,
            stderr_trim(&output)
        ));
    }
    Ok(())
}

fn stderr_trim(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
