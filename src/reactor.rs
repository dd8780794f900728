//! Flag-gated handler dispatch.
//!
//! One event cycle evaluates the handler table in order, in passes, firing
//! every handler whose precondition holds and that has not fired yet in this
//! cycle. Passes repeat until one fires nothing. State is flushed after every
//! handler that completes; a failing handler aborts the cycle and its changes
//! are dropped, so its precondition re-gates it on the next event.
use crate::agent::{
    self, append_history, now_epoch_ms, write_state, AgentConfig, AgentState, Flag,
    HistoryEntry, Service, HISTORY_SCHEMA_VERSION,
};
use crate::host::{Host, WorkloadStatus};
use crate::options::build_options;
use crate::relations::{influxdb_record, kapacitor_record, Relations};
use crate::render::render_service_files;
use anyhow::{anyhow, Result};
use std::fmt;
use std::path::{Path, PathBuf};

/// Every handler the reactor knows, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Install,
    BlockOnMissingDependency,
    Configure(Service),
    StartService,
    Unconfigure(Service),
    ExposeHttp,
    RetractHttp,
}

impl Handler {
    pub const ALL: [Handler; 9] = [
        Handler::Install,
        Handler::BlockOnMissingDependency,
        Handler::Configure(Service::Influxdb),
        Handler::Configure(Service::Kapacitor),
        Handler::StartService,
        Handler::Unconfigure(Service::Influxdb),
        Handler::Unconfigure(Service::Kapacitor),
        Handler::ExposeHttp,
        Handler::RetractHttp,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Handler::Install => "install",
            Handler::BlockOnMissingDependency => "block-on-missing-dependency",
            Handler::Configure(Service::Influxdb) => "configure-influxdb",
            Handler::Configure(Service::Kapacitor) => "configure-kapacitor",
            Handler::StartService => "start-service",
            Handler::Unconfigure(Service::Influxdb) => "unconfigure-influxdb",
            Handler::Unconfigure(Service::Kapacitor) => "unconfigure-kapacitor",
            Handler::ExposeHttp => "expose-http",
            Handler::RetractHttp => "retract-http",
        }
    }

    /// Evaluate the handler's precondition against flags and relation presence.
    pub fn is_eligible(self, state: &AgentState, relations: &Relations) -> bool {
        match self {
            Handler::Install => !state.has(Flag::Installed),
            Handler::BlockOnMissingDependency => {
                state.has(Flag::Installed) && !state.has(Flag::InfluxdbConfigured)
            }
            Handler::Configure(service) => {
                relation_available(service, relations) && !state.has(service.configured_flag())
            }
            Handler::StartService => {
                state.has(Flag::Installed)
                    && state.has(Flag::InfluxdbConfigured)
                    && !state.has(Flag::Started)
            }
            Handler::Unconfigure(service) => {
                state.has(service.configured_flag()) && !relation_available(service, relations)
            }
            Handler::ExposeHttp => {
                state.has(Flag::Started)
                    && relations.http.is_some()
                    && !state.has(Flag::HttpConfigured)
            }
            Handler::RetractHttp => state.has(Flag::HttpConfigured) && relations.http.is_none(),
        }
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn relation_available(service: Service, relations: &Relations) -> bool {
    match service {
        Service::Influxdb => relations.influxdb.is_some(),
        Service::Kapacitor => relations.kapacitor.is_some(),
    }
}

/// Handlers fired by one event cycle, in firing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fired: Vec<Handler>,
}

/// Lifecycle reactor bound to a state directory and a [`Host`].
pub struct Reactor<H: Host> {
    config: AgentConfig,
    state_dir: PathBuf,
    state: AgentState,
    host: H,
}

impl<H: Host> Reactor<H> {
    /// Load persisted state from `state_dir` and bind the reactor to `host`.
    pub fn load(config: AgentConfig, state_dir: &Path, host: H) -> Result<Self> {
        let state = agent::load_state(state_dir)?;
        Ok(Self {
            config,
            state_dir: state_dir.to_path_buf(),
            state,
            host,
        })
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Run one event cycle against the given relation snapshot.
    pub fn dispatch(&mut self, relations: &mut Relations) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        loop {
            let mut progressed = false;
            for handler in Handler::ALL {
                if report.fired.contains(&handler) || !handler.is_eligible(&self.state, relations)
                {
                    continue;
                }
                self.fire(handler, relations)?;
                report.fired.push(handler);
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
        tracing::info!(fired = report.fired.len(), "event cycle complete");
        Ok(report)
    }

    fn fire(&mut self, handler: Handler, relations: &mut Relations) -> Result<()> {
        let _span = tracing::info_span!("handler", handler = handler.name()).entered();
        tracing::info!("firing");
        let started_at_epoch_ms = now_epoch_ms()?;
        let mut working = self.state.clone();
        let result = self.run(handler, relations, &mut working);
        let entry = HistoryEntry {
            schema_version: HISTORY_SCHEMA_VERSION,
            started_at_epoch_ms,
            finished_at_epoch_ms: now_epoch_ms()?,
            handler: handler.name().to_string(),
            success: result.is_ok(),
            message: result.as_ref().err().map(|err| format!("{err:#}")),
        };
        append_history(&self.state_dir, &entry)?;
        match result {
            Ok(()) => {
                self.state = working;
                write_state(&self.state_dir, &self.state)
            }
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "handler failed");
                Err(err.context(format!("handler {handler} failed")))
            }
        }
    }

    fn run(
        &mut self,
        handler: Handler,
        relations: &mut Relations,
        state: &mut AgentState,
    ) -> Result<()> {
        match handler {
            Handler::Install => self.install(state),
            Handler::BlockOnMissingDependency => self
                .host
                .status_set(WorkloadStatus::Blocked, "Please create a relation with InfluxDB."),
            Handler::Configure(service) => self.configure(service, relations, state),
            Handler::StartService => self.start(state),
            Handler::Unconfigure(service) => self.unconfigure(service, state),
            Handler::ExposeHttp => {
                let http = relations
                    .http
                    .as_deref_mut()
                    .ok_or_else(|| anyhow!("http relation vanished mid-cycle"))?;
                http.configure(self.config.port)?;
                state.set(Flag::HttpConfigured);
                Ok(())
            }
            Handler::RetractHttp => {
                state.clear(Flag::HttpConfigured);
                Ok(())
            }
        }
    }

    fn install(&mut self, state: &mut AgentState) -> Result<()> {
        self.host
            .status_set(WorkloadStatus::Maintenance, "Installing Chronograf...")?;
        self.host
            .download(&self.config.package_url, &self.config.package_path)?;
        self.host.install_package(&self.config.package_path)?;
        state.set(Flag::Installed);
        Ok(())
    }

    fn configure(
        &mut self,
        service: Service,
        relations: &Relations,
        state: &mut AgentState,
    ) -> Result<()> {
        let record = match service {
            Service::Influxdb => relations.influxdb.as_deref().map(influxdb_record),
            Service::Kapacitor => relations.kapacitor.as_deref().map(kapacitor_record),
        }
        .ok_or_else(|| anyhow!("{service} relation vanished mid-cycle"))?;
        state.store_connection(service, record);

        let options = build_options(state);
        render_service_files(&self.config, &options)?;
        self.host.daemon_reload()?;

        state.clear(Flag::Started);
        state.set(service.configured_flag());
        Ok(())
    }

    fn start(&mut self, state: &mut AgentState) -> Result<()> {
        self.host
            .status_set(WorkloadStatus::Maintenance, "Starting up...")?;
        self.host.service_restart(&self.config.service_name)?;
        self.host.open_port(self.config.port)?;
        state.set(Flag::Started);
        self.host
            .status_set(WorkloadStatus::Active, "Chronograf is running.")
    }

    fn unconfigure(&mut self, service: Service, state: &mut AgentState) -> Result<()> {
        state.null_connection(service);
        if service == Service::Influxdb {
            self.host.service_stop(&self.config.service_name)?;
            self.host.close_port(self.config.port)?;
            // The process is down, so `started` cannot outlive the primary.
            state.clear(Flag::Started);
        }
        state.clear(service.configured_flag());
        Ok(())
    }
}

#[cfg(test)]
#[path = "reactor_tests.rs"]
mod tests;
