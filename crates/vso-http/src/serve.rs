use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;

use crate::router::build_router;
use crate::state::AppState;

/// Binds the HTTP facade and serves it until `cancel` fires.
pub async fn serve(addr: SocketAddr, state: AppState, cancel: CancellationToken) -> std::io::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP facade listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
            tracing::info!("HTTP facade shutting down");
        })
        .await
}
