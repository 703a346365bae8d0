//! `ServerRecord`: the supervisor's public view of a child.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vso_core::ids::ServerId;

/// Registry identifier for a package, as handed to [`crate::install::PackageInstaller`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }
}

impl std::fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(v) => write!(f, "{}@{v}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Lifecycle status of a [`ServerRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Installing,
    Starting,
    Running,
    Unhealthy,
    Stopping,
    Exited,
    Failed,
}

impl ServerStatus {
    /// Invariant: `pid ≠ ⊥ ⇔ status ∈ {running, unhealthy, stopping}`.
    pub fn expects_pid(self) -> bool {
        matches!(self, Self::Running | Self::Unhealthy | Self::Stopping)
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Installing => "installing",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Unhealthy => "unhealthy",
            Self::Stopping => "stopping",
            Self::Exited => "exited",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// A snapshot of one child server's lifecycle state, safe to clone and hand
/// out via `list()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerRecord {
    pub id: ServerId,
    pub package: PackageSpec,
    pub command: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub pid: Option<u32>,
    pub status: ServerStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub last_health_at: Option<DateTime<Utc>>,
    pub restart_count: u32,
    /// Advertised capabilities/tool list from the `initialize` handshake.
    pub capabilities: Option<Value>,
}

/// Outcome of a child's exit, reported on the `server_stopped` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitInfo {
    pub code: Option<i32>,
    pub clean: bool,
}
