use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let capabilities = state.router.capability_names();
    Json(json!({
        "status": "alive",
        "capabilities": capabilities,
    }))
}
