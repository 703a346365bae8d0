use std::sync::Arc;

use vso_daemon::VarietyMonitor;
use vso_router::Router;
use vso_supervisor::Supervisor;

/// Shared application state, attached to the axum router via `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub supervisor: Supervisor,
    pub monitor: Arc<VarietyMonitor>,
    pub call_default_timeout: std::time::Duration,
}
