use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use vso_core::ids::Capability;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    capability: String,
    task: Value,
}

/// `POST /mcp/execute`: routes to the provider, blocks until reply
/// or timeout. Errors are reported in the `200` body per the endpoint's
/// documented `{"success":false,"error":string}` shape rather than as an
/// HTTP error status, since a routing/provider failure here is a normal,
/// expected outcome rather than a malformed request.
pub async fn execute(State(state): State<AppState>, Json(body): Json<ExecuteRequest>) -> Json<Value> {
    let capability = Capability::new(body.capability);
    match state
        .router
        .execute(&capability, body.task, state.call_default_timeout)
        .await
    {
        Ok(result) => Json(json!({ "success": true, "result": result })),
        Err(e) => Json(json!({ "success": false, "error": e.to_string() })),
    }
}
