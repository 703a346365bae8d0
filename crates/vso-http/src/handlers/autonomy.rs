use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use vso_core::ids::Capability;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    capabilities: Vec<String>,
}

/// `POST /autonomy/trigger`: inject a gap, return immediately.
pub async fn trigger(State(state): State<AppState>, Json(body): Json<TriggerRequest>) -> Json<Value> {
    let capabilities = body.capabilities.into_iter().map(Capability::new).collect();
    let gap = state.monitor.inject(capabilities).await;
    Json(json!({ "triggered": true, "gap": gap }))
}
