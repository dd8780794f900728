//! CLI argument parsing for the lifecycle agent.
//!
//! Each invocation handles exactly one event; the orchestrator calls
//! `dispatch` whenever a relation appears, changes, or goes away.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "chronograf-agent",
    version,
    about = "Relation-driven lifecycle agent for Chronograf",
    after_help = "Commands:\n  init --state-dir <dir>                      Write the default config.json\n  dispatch --state-dir <dir> --relations <f>  Run one event cycle\n  status --state-dir <dir>                    Show flags and connections\n  options --state-dir <dir>                   Print the rendered options string\n\nExamples:\n  chronograf-agent init --state-dir /var/lib/chronograf-agent\n  chronograf-agent dispatch --state-dir /var/lib/chronograf-agent --relations relations.json\n  chronograf-agent status --state-dir /var/lib/chronograf-agent --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level agent commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Init(InitArgs),
    Dispatch(DispatchArgs),
    Status(StatusArgs),
    Options(OptionsArgs),
}

/// Init command inputs.
#[derive(Parser, Debug)]
#[command(about = "Write the default agent config")]
pub struct InitArgs {
    /// Directory holding config.json, state.json, and history.jsonl
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Overwrite an existing config.json
    #[arg(long)]
    pub force: bool,
}

/// Dispatch command inputs.
#[derive(Parser, Debug)]
#[command(about = "Run one event cycle against the current relations")]
pub struct DispatchArgs {
    /// Directory holding config.json, state.json, and history.jsonl
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// JSON snapshot of the relations currently available (none when omitted)
    #[arg(long, value_name = "PATH")]
    pub relations: Option<PathBuf>,

    /// Emit debug logging
    #[arg(long)]
    pub verbose: bool,
}

/// Status command inputs.
#[derive(Parser, Debug)]
#[command(about = "Show flags and connection records")]
pub struct StatusArgs {
    /// Directory holding config.json, state.json, and history.jsonl
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Options command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print the options string the service files are rendered with")]
pub struct OptionsArgs {
    /// Directory holding config.json, state.json, and history.jsonl
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,
}

impl Command {
    pub fn verbose(&self) -> bool {
        matches!(self, Command::Dispatch(args) if args.verbose)
    }
}
