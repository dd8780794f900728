//! Persistent flag set and connection records.
//!
//! The state file is the only memory the agent has between events. It is
//! read once at the start of a cycle and flushed after every handler.
use super::{StatePaths, STATE_SCHEMA_VERSION};
use crate::util::write_atomic;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Named milestone controlling handler eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Flag {
    Installed,
    InfluxdbConfigured,
    KapacitorConfigured,
    Started,
    HttpConfigured,
}

impl Flag {
    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Installed => "installed",
            Flag::InfluxdbConfigured => "influxdb-configured",
            Flag::KapacitorConfigured => "kapacitor-configured",
            Flag::Started => "started",
            Flag::HttpConfigured => "http-configured",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dependent service whose connection details feed the rendered config.
///
/// Declaration order is the order fragments appear in the options string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Influxdb,
    Kapacitor,
}

impl Service {
    pub const ALL: [Service; 2] = [Service::Influxdb, Service::Kapacitor];

    pub fn as_str(self) -> &'static str {
        match self {
            Service::Influxdb => "influxdb",
            Service::Kapacitor => "kapacitor",
        }
    }

    /// Flag recording that this service's connection has been rendered.
    pub fn configured_flag(self) -> Flag {
        match self {
            Service::Influxdb => Flag::InfluxdbConfigured,
            Service::Kapacitor => Flag::KapacitorConfigured,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection details supplied by a relation. Values are stored as given,
/// the port included: it is only ever spliced into a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub hostname: String,
    pub port: String,
    pub user: String,
    pub password: String,
}

/// Everything persisted in `state.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub schema_version: u32,
    #[serde(default)]
    pub flags: BTreeSet<Flag>,
    /// `None` marks a record explicitly cleared when its relation dropped.
    #[serde(default)]
    pub connections: BTreeMap<Service, Option<ConnectionRecord>>,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            schema_version: STATE_SCHEMA_VERSION,
            flags: BTreeSet::new(),
            connections: BTreeMap::new(),
        }
    }
}

impl AgentState {
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn set(&mut self, flag: Flag) {
        self.flags.insert(flag);
    }

    pub fn clear(&mut self, flag: Flag) {
        self.flags.remove(&flag);
    }

    pub fn connection(&self, service: Service) -> Option<&ConnectionRecord> {
        self.connections.get(&service).and_then(Option::as_ref)
    }

    pub fn store_connection(&mut self, service: Service, record: ConnectionRecord) {
        self.connections.insert(service, Some(record));
    }

    pub fn null_connection(&mut self, service: Service) {
        self.connections.insert(service, None);
    }
}

/// Load `state.json`, or the fresh state when the file does not exist.
pub fn load_state(state_dir: &Path) -> Result<AgentState> {
    let paths = StatePaths::new(state_dir.to_path_buf());
    let path = paths.state_path();
    if !path.is_file() {
        return Ok(AgentState::default());
    }
    let bytes = fs::read(&path).with_context(|| format!("read state {}", path.display()))?;
    let state: AgentState = serde_json::from_slice(&bytes).context("parse agent state JSON")?;
    if state.schema_version != STATE_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported agent state schema_version {}",
            state.schema_version
        ));
    }
    Ok(state)
}

/// Flush the state snapshot in a stable JSON format.
pub fn write_state(state_dir: &Path, state: &AgentState) -> Result<()> {
    let paths = StatePaths::new(state_dir.to_path_buf());
    let text = serde_json::to_string_pretty(state).context("serialize agent state")?;
    write_atomic(&paths.state_path(), text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_when_file_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = load_state(dir.path()).expect("load state");
        assert!(state.flags.is_empty());
        assert!(state.connections.is_empty());
    }

    #[test]
    fn nulled_connections_survive_a_flush() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut state = AgentState::default();
        state.set(Flag::Installed);
        state.set(Flag::HttpConfigured);
        state.null_connection(Service::Influxdb);
        write_state(dir.path(), &state).expect("write state");

        let text = std::fs::read_to_string(dir.path().join("state.json")).expect("read");
        assert!(text.contains("\"installed\""), "{text}");
        assert!(text.contains("\"http-configured\""), "{text}");
        assert!(text.contains("\"influxdb\": null"), "{text}");

        let loaded = load_state(dir.path()).expect("load state");
        assert_eq!(loaded, state);
        assert!(loaded.connection(Service::Influxdb).is_none());
    }

    #[test]
    fn services_order_primary_first() {
        assert!(Service::Influxdb < Service::Kapacitor);
        assert_eq!(Service::ALL[0], Service::Influxdb);
    }
}
