use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod agent;
mod cli;
mod hooktools;
mod host;
mod options;
mod reactor;
mod relations;
mod render;
mod templates;
mod util;
mod workflow;

use cli::{Command, RootArgs};

const LOG_ENV: &str = "CHRONOGRAF_AGENT_LOG";

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.command.verbose());

    match args.command {
        Command::Init(args) => workflow::run_init(args),
        Command::Dispatch(args) => workflow::run_dispatch(args),
        Command::Status(args) => workflow::run_status(args),
        Command::Options(args) => workflow::run_options(args),
    }
}
