//! Installs, spawns, monitors, restarts and stops child tool-servers.

mod error;
mod events;
mod install;
mod record;
mod supervisor;

pub use error::SupervisorError;
pub use events::LifecycleEvent;
pub use install::{InstalledPackage, PackageInstaller, PathShimInstaller};
pub use record::{ExitInfo, PackageSpec, ServerRecord, ServerStatus};
pub use supervisor::{Supervisor, SupervisorConfig};
