use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use vso_core::ids::ServerId;
use vso_supervisor::PackageSpec;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ServerSummary {
    id: ServerId,
    package: PackageSpec,
    pid: Option<u32>,
    status: String,
    started_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ServersResponse {
    servers: Vec<ServerSummary>,
}

/// `GET /mcp/servers`: a supervisor snapshot.
pub async fn servers(State(state): State<AppState>) -> Json<ServersResponse> {
    let records = state.supervisor.list().await;
    let servers = records
        .into_iter()
        .map(|r| ServerSummary {
            id: r.id,
            package: r.package,
            pid: r.pid,
            status: r.status.to_string(),
            started_at: r.started_at,
        })
        .collect();
    Json(ServersResponse { servers })
}
