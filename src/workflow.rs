use crate::agent::{self, StatePaths};
use crate::cli::{DispatchArgs, InitArgs, OptionsArgs, StatusArgs};
use crate::host::SystemHost;
use crate::options::build_options;
use crate::reactor::Reactor;
use crate::relations::Relations;
use crate::util::redact;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const STATE_DIR_NAME: &str = "chronograf-agent";

/// Resolve `--state-dir`, defaulting to the per-user data directory.
fn resolve_state_dir(state_dir: Option<&Path>, create: bool) -> Result<PathBuf> {
    let path = match state_dir {
        Some(path) => path.to_path_buf(),
        None => dirs::data_local_dir()
            .ok_or_else(|| anyhow!("no data directory; pass --state-dir"))?
            .join(STATE_DIR_NAME),
    };
    if create {
        fs::create_dir_all(&path)
            .with_context(|| format!("create state dir {}", path.display()))?;
    }
    Ok(path)
}

pub fn run_init(args: InitArgs) -> Result<()> {
    let state_dir = resolve_state_dir(args.state_dir.as_deref(), true)?;
    let paths = StatePaths::new(state_dir);
    let config_path = paths.config_path();
    if config_path.is_file() && !args.force {
        return Err(anyhow!(
            "config already exists at {} (use --force to overwrite)",
            config_path.display()
        ));
    }
    agent::write_config(paths.root(), &agent::default_config())?;
    println!("wrote {}", config_path.display());
    Ok(())
}

pub fn run_dispatch(args: DispatchArgs) -> Result<()> {
    let state_dir = resolve_state_dir(args.state_dir.as_deref(), true)?;
    let config = agent::load_config_or_default(&state_dir)?;
    let host = SystemHost::from_config(&config)?;
    let mut relations = Relations::load(args.relations.as_deref())?;
    let mut reactor = Reactor::load(config, &state_dir, host)?;
    let report = reactor.dispatch(&mut relations)?;
    tracing::debug!(flags = ?reactor.state().flags, "flags after cycle");
    for handler in &report.fired {
        println!("fired {handler}");
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusReport {
    state_dir: String,
    flags: Vec<String>,
    connections: Vec<ConnectionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_handler: Option<agent::HistoryEntry>,
}

#[derive(Serialize)]
struct ConnectionStatus {
    service: String,
    present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

pub fn run_status(args: StatusArgs) -> Result<()> {
    let state_dir = resolve_state_dir(args.state_dir.as_deref(), false)?;
    let state = agent::load_state(&state_dir)?;
    let report = StatusReport {
        state_dir: state_dir.display().to_string(),
        flags: state.flags.iter().map(|flag| flag.to_string()).collect(),
        connections: agent::Service::ALL
            .iter()
            .map(|&service| {
                let record = state.connection(service);
                ConnectionStatus {
                    service: service.to_string(),
                    present: record.is_some(),
                    url: record.map(|r| format!("http://{}:{}", r.hostname, r.port)),
                    user: record.map(|r| r.user.clone()),
                    password: record.map(|r| redact(&r.password).to_string()),
                }
            })
            .collect(),
        last_handler: agent::load_last_history(&state_dir)?,
    };
    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize status")?;
        println!("{text}");
        return Ok(());
    }
    println!("state dir: {}", report.state_dir);
    if report.flags.is_empty() {
        println!("flags: (none)");
    } else {
        println!("flags: {}", report.flags.join(", "));
    }
    for connection in &report.connections {
        match &connection.url {
            Some(url) => println!(
                "{}: {} as {}",
                connection.service,
                url,
                connection.user.as_deref().unwrap_or_default()
            ),
            None => println!("{}: not related", connection.service),
        }
    }
    if let Some(entry) = &report.last_handler {
        let outcome = if entry.success { "ok" } else { "failed" };
        println!("last handler: {} ({outcome})", entry.handler);
        if let Some(message) = &entry.message {
            println!("  {message}");
        }
    }
    Ok(())
}

pub fn run_options(args: OptionsArgs) -> Result<()> {
    let state_dir = resolve_state_dir(args.state_dir.as_deref(), false)?;
    let state = agent::load_state(&state_dir)?;
    println!("{}", build_options(&state));
    Ok(())
}
