use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// `GET /capabilities`: a router snapshot.
pub async fn capabilities(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "capabilities": state.router.capability_names() }))
}
