use axum::extract::State;
use axum::Json;

use vso_daemon::DaemonStatus;

use crate::state::AppState;

/// `GET /daemon`: monitor status.
pub async fn daemon(State(state): State<AppState>) -> Json<DaemonStatus> {
    Json(state.monitor.status())
}
