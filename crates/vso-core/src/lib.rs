//! vso-core: shared identifiers, config, error taxonomy, and structured
//! logging used by every crate in the variety-gap orchestrator workspace.

pub mod config;
pub mod error;
pub mod event_log;
pub mod ids;
pub mod logging;

pub use config::Config;
pub use error::{ErrorKind, OrchestratorError};
pub use ids::{Capability, ServerId};
