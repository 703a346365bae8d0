//! `vso`: CLI front-end and daemon entry point for the variety-gap
//! orchestrator.

mod cli;
mod commands;
mod serve;

use clap::Parser;
use cli::{Cli, Command};
use vso_core::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let exit_code = match &cli.command {
        Command::Serve(args) => {
            init_tracing(args.verbose);
            run_serve().await
        }
        Command::Trigger(args) => {
            init_tracing(false);
            run_trigger(&cli.endpoint, args.clone()).await
        }
        Command::Status(args) => {
            init_tracing(false);
            run_status(&cli.endpoint, args.clone()).await
        }
    };

    std::process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let _ = tracing_subscriber::fmt().with_max_level(level).with_target(false).try_init();
}

async fn run_serve() -> i32 {
    let config = Config::from_env();
    match serve::run(config).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("vso failed: {e:#}");
            2
        }
    }
}

async fn run_trigger(endpoint: &str, args: cli::TriggerArgs) -> i32 {
    match commands::trigger(endpoint, args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}

async fn run_status(endpoint: &str, args: cli::StatusArgs) -> i32 {
    match commands::status(endpoint, args).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            1
        }
    }
}
