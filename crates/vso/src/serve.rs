//! Builds the full dependency graph and runs it until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use vso_core::Config;
use vso_daemon::{AcquisitionCoordinator, DaemonConfig};
use vso_discovery::{Discovery, HttpRegistryClient, RegistryClient};
use vso_http::AppState;
use vso_router::{IdentityMapper, Router};
use vso_supervisor::{PathShimInstaller, Supervisor, SupervisorConfig};

fn registries_from_env() -> Vec<Arc<dyn RegistryClient>> {
    match std::env::var("VSO_REGISTRY_URL") {
        Ok(url) if !url.is_empty() => {
            vec![Arc::new(HttpRegistryClient::new("primary", url)) as Arc<dyn RegistryClient>]
        }
        _ => Vec::new(),
    }
}

pub async fn run(config: Config) -> Result<()> {
    let supervisor_config = SupervisorConfig {
        install_timeout: Duration::from_millis(config.install_timeout_ms),
        spawn_handshake_timeout: Duration::from_millis(config.spawn_handshake_ms),
        restart_max_attempts: config.restart_max_attempts,
        restart_window: Duration::from_millis(config.restart_window_ms),
        max_child_memory_bytes: config.max_child_memory_bytes,
        max_child_cpu_pct: config.max_child_cpu_pct,
        ..SupervisorConfig::default()
    };
    let supervisor = Supervisor::new(Arc::new(PathShimInstaller), supervisor_config);

    let router = Router::new(supervisor.clone(), Arc::new(IdentityMapper));

    let discovery = Discovery::new(registries_from_env());

    let coordinator = Arc::new(AcquisitionCoordinator::new(
        discovery,
        supervisor.clone(),
        router.clone(),
        Duration::from_millis(config.acquisition_wait_ms),
    ));

    let daemon_config = DaemonConfig {
        tick_interval: Duration::from_millis(config.daemon_interval_ms),
        concurrency: config.acquisition_concurrency as usize,
        acquisition_wait: Duration::from_millis(config.acquisition_wait_ms),
        retry_max_attempts: config.restart_max_attempts,
        retry_window: Duration::from_millis(config.restart_window_ms),
    };
    let monitor = vso_daemon::VarietyMonitor::new(
        coordinator,
        router.clone(),
        daemon_config,
        config.daemon_enabled,
    );

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    supervisor.start_reaper(cancel.clone());
    router.start(Duration::from_millis(config.router_refresh_ms), cancel.clone());
    monitor.start(cancel.clone());

    let state = AppState {
        router: router.clone(),
        supervisor: supervisor.clone(),
        monitor: monitor.clone(),
        call_default_timeout: Duration::from_millis(config.call_default_timeout_ms),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    info!(%addr, "vso starting");
    vso_http::serve(addr, state, cancel)
        .await
        .context("HTTP facade exited with an error")?;

    stop_all_children(&supervisor).await;

    info!("vso shutdown complete");
    Ok(())
}

/// Sends every still-running child a graceful stop, in parallel, before the
/// process exits. Without this, children only die via `kill_on_drop` when
/// their `Child` handles are dropped — an abrupt kill rather than the
/// close-stdin/SIGTERM/escalate sequence `Supervisor::stop` implements.
async fn stop_all_children(supervisor: &Supervisor) {
    let records = supervisor.list().await;
    if records.is_empty() {
        return;
    }
    info!(count = records.len(), "stopping running child servers");

    let mut stops = tokio::task::JoinSet::new();
    for record in records {
        let supervisor = supervisor.clone();
        stops.spawn(async move {
            if let Err(e) = supervisor.stop(record.id, true).await {
                tracing::warn!(id = %record.id, "graceful stop failed: {e}");
            }
        });
    }
    while stops.join_next().await.is_some() {}
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("failed to install SIGTERM handler: {e}");
                    let _ = ctrl_c.await;
                    cancel.cancel();
                    return;
                }
            };

            tokio::select! {
                _ = ctrl_c => info!("received SIGINT"),
                _ = sigterm.recv() => info!("received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C");
        }

        cancel.cancel();
    });
}
