//! CLI argument types for the `vso` binary.

use clap::{Args, Parser, Subcommand};

/// Variety-gap orchestrator: supervises MCP tool servers and closes
/// capability gaps by discovering and launching new ones.
#[derive(Parser, Debug)]
#[command(name = "vso", version, about)]
pub struct Cli {
    /// Base URL of a running vso HTTP facade (used by `trigger`/`status`).
    #[arg(long, global = true, default_value = "http://127.0.0.1:4000")]
    pub endpoint: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the supervisor, router, variety monitor, and HTTP facade.
    Serve(ServeArgs),
    /// Inject a capability gap into a running daemon.
    Trigger(TriggerArgs),
    /// Print the running daemon's monitor and supervisor status.
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct TriggerArgs {
    /// Capability name(s) to require (repeatable).
    #[arg(required = true)]
    pub capabilities: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Output as JSON instead of a human-readable summary.
    #[arg(long)]
    pub json: bool,
}
