//! Relation contracts and the snapshot they are read from.
//!
//! Each dependent service is reached through a narrow trait exposing only the
//! accessors its interface provides. A relation is available exactly when the
//! snapshot carries an entry for it.
use crate::agent::ConnectionRecord;
use crate::hooktools::run_hook_tool;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Primary dependency: the time-series store.
pub trait InfluxdbRelation {
    fn hostname(&self) -> String;
    fn port(&self) -> String;
    fn user(&self) -> String;
    fn password(&self) -> String;
}

/// Secondary dependency: the alerting engine.
pub trait KapacitorRelation {
    fn host(&self) -> String;
    fn port(&self) -> String;
    fn username(&self) -> String;
    fn password(&self) -> String;
}

/// Generic http consumer that wants to know where the dashboard listens.
pub trait HttpRelation {
    fn configure(&mut self, port: u16) -> Result<()>;
}

/// Relations present for the current event cycle.
#[derive(Default)]
pub struct Relations {
    pub influxdb: Option<Box<dyn InfluxdbRelation>>,
    pub kapacitor: Option<Box<dyn KapacitorRelation>>,
    pub http: Option<Box<dyn HttpRelation>>,
}

impl Relations {
    /// Read relations from a JSON snapshot. A missing path means no relations.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let bytes = fs::read(path).with_context(|| format!("read relations {}", path.display()))?;
        let snapshot: RelationSnapshot =
            serde_json::from_slice(&bytes).context("parse relations JSON")?;
        Ok(snapshot.into_relations())
    }
}

pub(crate) fn influxdb_record<R: InfluxdbRelation + ?Sized>(relation: &R) -> ConnectionRecord {
    ConnectionRecord {
        hostname: relation.hostname(),
        port: relation.port(),
        user: relation.user(),
        password: relation.password(),
    }
}

pub(crate) fn kapacitor_record<R: KapacitorRelation + ?Sized>(relation: &R) -> ConnectionRecord {
    ConnectionRecord {
        hostname: relation.host(),
        port: relation.port(),
        user: relation.username(),
        password: relation.password(),
    }
}

/// On-disk shape of the relation snapshot passed to `dispatch`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RelationSnapshot {
    #[serde(default)]
    influxdb: Option<InfluxdbEndpoint>,
    #[serde(default)]
    kapacitor: Option<KapacitorEndpoint>,
    #[serde(default)]
    http: Option<HttpEndpoint>,
}

impl RelationSnapshot {
    fn into_relations(self) -> Relations {
        Relations {
            influxdb: self
                .influxdb
                .map(|endpoint| Box::new(endpoint) as Box<dyn InfluxdbRelation>),
            kapacitor: self
                .kapacitor
                .map(|endpoint| Box::new(endpoint) as Box<dyn KapacitorRelation>),
            http: self
                .http
                .map(|endpoint| Box::new(endpoint) as Box<dyn HttpRelation>),
        }
    }
}

/// Port as published on the relation: peers send either a JSON number or a
/// string, and neither is range-checked.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RelationPort {
    Number(serde_json::Number),
    Text(String),
}

impl RelationPort {
    fn as_string(&self) -> String {
        match self {
            RelationPort::Number(number) => number.to_string(),
            RelationPort::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct InfluxdbEndpoint {
    hostname: String,
    port: RelationPort,
    user: String,
    password: String,
}

impl InfluxdbRelation for InfluxdbEndpoint {
    fn hostname(&self) -> String {
        self.hostname.clone()
    }

    fn port(&self) -> String {
        self.port.as_string()
    }

    fn user(&self) -> String {
        self.user.clone()
    }

    fn password(&self) -> String {
        self.password.clone()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct KapacitorEndpoint {
    host: String,
    port: RelationPort,
    username: String,
    password: String,
}

impl KapacitorRelation for KapacitorEndpoint {
    fn host(&self) -> String {
        self.host.clone()
    }

    fn port(&self) -> String {
        self.port.as_string()
    }

    fn username(&self) -> String {
        self.username.clone()
    }

    fn password(&self) -> String {
        self.password.clone()
    }
}

/// Publishes the listening address on the http relation with `relation-set`.
#[derive(Debug, Clone, Default, Deserialize)]
struct HttpEndpoint {
    #[serde(default)]
    relation_id: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
}

impl HttpRelation for HttpEndpoint {
    fn configure(&mut self, port: u16) -> Result<()> {
        let mut args = Vec::new();
        if let Some(relation_id) = &self.relation_id {
            args.push("-r".to_string());
            args.push(relation_id.clone());
        }
        if let Some(hostname) = &self.hostname {
            args.push(format!("hostname={hostname}"));
        }
        args.push(format!("port={port}"));
        run_hook_tool("relation-set", &args)?;
        Ok(())
    }
}
