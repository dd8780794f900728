//! Orchestrator hook tools (`status-set`, `open-port`, `relation-set`, ...).
//!
//! The tools only exist on `PATH` while an event is being handled by the
//! orchestrator. Outside that context the agent still runs, and calls to a
//! missing tool are logged and skipped.
use anyhow::{anyhow, Context, Result};
use std::process::Command;
use std::time::Instant;

/// Outcome of a hook tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Ran,
    Unavailable,
}

/// Run a hook tool, failing on a non-zero exit.
pub fn run_hook_tool(tool: &str, args: &[String]) -> Result<HookOutcome> {
    let path = match which::which(tool) {
        Ok(path) => path,
        Err(_) => {
            tracing::warn!(tool, ?args, "hook tool not on PATH; skipping");
            return Ok(HookOutcome::Unavailable);
        }
    };
    let start = Instant::now();
    let output = Command::new(&path)
        .args(args)
        .output()
        .with_context(|| format!("run hook tool {tool}"))?;
    tracing::debug!(
        tool,
        elapsed_ms = start.elapsed().as_millis(),
        "hook tool complete"
    );
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "{tool} failed with status {}: {}",
            output.status,
            stderr.trim()
        ));
    }
    Ok(HookOutcome::Ran)
}
