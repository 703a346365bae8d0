//! The Variety Monitor and Acquisition Coordinator: closes
//! the gap between a required capability set and what the router currently
//! exposes.

mod config;
mod coordinator;
mod error;
mod monitor;
mod ordered_set;

pub use config::DaemonConfig;
pub use coordinator::AcquisitionCoordinator;
pub use error::CoordinatorError;
pub use monitor::{DaemonState, DaemonStatus, VarietyGap, VarietyMonitor};
