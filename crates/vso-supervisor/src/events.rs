//! Lifecycle events. A corresponding `server_stopped` event is emitted
//! exactly once for every server that ever reached `running`.

use serde_json::Value;

use vso_core::event_log::{emit_event_best_effort, EventFields};
use vso_core::ids::ServerId;

use crate::record::{ExitInfo, PackageSpec};

#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    ServerStarted {
        id: ServerId,
        package: PackageSpec,
        capabilities: Value,
    },
    ServerStopped {
        id: ServerId,
        exit_info: ExitInfo,
    },
    ServerFailed {
        id: ServerId,
        reason: String,
    },
}

impl LifecycleEvent {
    /// Append this transition to the structured JSONL event log.
    pub fn log(&self) {
        let fields = match self {
            Self::ServerStarted { id, package, .. } => EventFields {
                level: "info",
                source: "vso-supervisor",
                action: "server_started",
                server_id: Some(id.to_string()),
                result: Some(package.to_string()),
                ..Default::default()
            },
            Self::ServerStopped { id, exit_info } => EventFields {
                level: "info",
                source: "vso-supervisor",
                action: "server_stopped",
                server_id: Some(id.to_string()),
                result: Some(if exit_info.clean { "clean".into() } else { "abnormal".into() }),
                ..Default::default()
            },
            Self::ServerFailed { id, reason } => EventFields {
                level: "warn",
                source: "vso-supervisor",
                action: "server_failed",
                server_id: Some(id.to_string()),
                result: Some(reason.clone()),
                ..Default::default()
            },
        };
        emit_event_best_effort(fields);
    }
}

/// Capacity of the lifecycle broadcast channel. Subscribers that lag behind
/// this many events miss the oldest ones (`tokio::sync::broadcast`'s usual
/// lagged-receiver semantics); the router's periodic refresh is the
/// fallback for anything a subscriber misses.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
