use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `POST /mcp/refresh`: force a router refresh.
pub async fn refresh(State(state): State<AppState>) -> Json<Value> {
    state.router.refresh().await;
    Json(json!({ "refreshed": true }))
}
