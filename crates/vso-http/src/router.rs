//! axum router construction: wires every HTTP endpoint to its handler.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/capabilities", get(handlers::capabilities::capabilities))
        .route("/mcp/servers", get(handlers::servers::servers))
        .route("/autonomy/trigger", post(handlers::autonomy::trigger))
        .route("/mcp/execute", post(handlers::execute::execute))
        .route("/daemon", get(handlers::daemon::daemon))
        .route("/mcp/refresh", post(handlers::refresh::refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;
    use vso_daemon::{AcquisitionCoordinator, DaemonConfig, VarietyMonitor};
    use vso_discovery::Discovery;
    use vso_router::{IdentityMapper, Router as CapabilityRouter};
    use vso_supervisor::{PathShimInstaller, Supervisor, SupervisorConfig};

    fn test_state() -> AppState {
        let supervisor = Supervisor::new(Arc::new(PathShimInstaller), SupervisorConfig::default());
        let router = CapabilityRouter::new(supervisor.clone(), Arc::new(IdentityMapper));
        let coordinator = Arc::new(AcquisitionCoordinator::new(
            Discovery::new(vec![]),
            supervisor.clone(),
            router.clone(),
            std::time::Duration::from_secs(1),
        ));
        let monitor = VarietyMonitor::new(coordinator, router.clone(), DaemonConfig::default(), false);
        AppState {
            router,
            supervisor,
            monitor,
            call_default_timeout: std::time::Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn health_reports_alive_with_empty_capabilities() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "alive");
        assert_eq!(json["capabilities"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn execute_with_unknown_capability_reports_failure_not_http_error() {
        let app = build_router(test_state());
        let body = serde_json::json!({ "capability": "blockchain", "task": {} }).to_string();
        let response = app
            .oneshot(
                Request::post("/mcp/execute")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn daemon_status_reflects_disabled_monitor() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::get("/daemon").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["running"], false);
        assert_eq!(json["state"], "idle");
    }
}
