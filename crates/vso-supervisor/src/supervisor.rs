//! The Process Supervisor: installs, spawns, monitors, restarts, and stops
//! child tool-servers.

use std::collections::{HashMap, VecDeque};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;

use vso_core::ids::ServerId;
use vso_rpc::RpcClient;
use vso_transport::StderrSink;

use crate::error::SupervisorError;
use crate::events::{LifecycleEvent, EVENT_CHANNEL_CAPACITY};
use crate::install::{InstalledPackage, PackageInstaller};
use crate::record::{ExitInfo, PackageSpec, ServerRecord, ServerStatus};

/// Backoff floor for abnormal-exit restarts.
const RESTART_BACKOFF_FLOOR: Duration = Duration::from_millis(100);
/// Backoff ceiling: doubles from the floor up to this cap.
const RESTART_BACKOFF_CAP: Duration = Duration::from_secs(30);
/// How often the reaper polls child status.
const REAP_INTERVAL: Duration = Duration::from_millis(200);
/// Poll granularity while waiting out a graceful-stop deadline.
const GRACEFUL_POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Bounded stderr capture depth.
const STDERR_CAPACITY: usize = 200;

pub struct SupervisorConfig {
    pub install_timeout: Duration,
    pub spawn_handshake_timeout: Duration,
    pub restart_max_attempts: u32,
    pub restart_window: Duration,
    pub graceful_stop_timeout: Duration,
    pub max_child_memory_bytes: Option<u64>,
    #[allow(dead_code)] // CPU-share capping has no portable libc knob; kept as a recorded config field
    pub max_child_cpu_pct: Option<u32>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            install_timeout: Duration::from_millis(120_000),
            spawn_handshake_timeout: Duration::from_millis(10_000),
            restart_max_attempts: 5,
            restart_window: Duration::from_millis(60_000),
            graceful_stop_timeout: Duration::from_secs(10),
            max_child_memory_bytes: None,
            max_child_cpu_pct: None,
        }
    }
}

/// A tracked server. `child`/`rpc` are `None` only for a record that failed
/// before or during spawn (install failure never reaches the map at all;
/// spawn failure does, with the record transitioning `starting -> failed`).
struct ChildEntry {
    record: ServerRecord,
    child: Option<Child>,
    rpc: Option<RpcClient>,
    stderr: StderrSink,
    restart_history: VecDeque<Instant>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StopMode {
    Graceful,
    Immediate,
}

/// Owns every child server's OS process and JSON-RPC client. The only
/// module in the workspace allowed to launch subprocesses.
#[derive(Clone)]
pub struct Supervisor {
    children: Arc<Mutex<HashMap<ServerId, ChildEntry>>>,
    events_tx: broadcast::Sender<LifecycleEvent>,
    installer: Arc<dyn PackageInstaller>,
    config: Arc<SupervisorConfig>,
}

impl Supervisor {
    pub fn new(installer: Arc<dyn PackageInstaller>, config: SupervisorConfig) -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            children: Arc::new(Mutex::new(HashMap::new())),
            events_tx,
            installer,
            config: Arc::new(config),
        }
    }

    /// Spawn the background reaper task. Call once; the task runs until
    /// `cancel` fires.
    pub fn start_reaper(&self, cancel: CancellationToken) {
        let children = self.children.clone();
        let events_tx = self.events_tx.clone();
        let config = self.config.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(REAP_INTERVAL) => {
                        reap_once(&children, &events_tx, &config).await;
                    }
                }
            }
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events_tx.subscribe()
    }

    /// `list() -> [ServerRecord]`: a consistent snapshot, safe to call
    /// concurrently.
    pub async fn list(&self) -> Vec<ServerRecord> {
        self.children
            .lock()
            .await
            .values()
            .map(|e| e.record.clone())
            .collect()
    }

    pub async fn rpc_client(&self, id: ServerId) -> Option<RpcClient> {
        self.children.lock().await.get(&id).and_then(|e| e.rpc.clone())
    }

    /// `spawn(packageSpec) -> serverID`.
    pub async fn spawn(&self, package: PackageSpec) -> Result<ServerId, SupervisorError> {
        let installed = self
            .installer
            .install(&package, self.config.install_timeout)
            .await
            .map_err(|e| SupervisorError::InstallError(e.to_string()))?;

        let id = ServerId::new();
        let mut record = ServerRecord {
            id,
            package: package.clone(),
            command: installed.command.clone(),
            args: installed.args.clone(),
            env: installed.env.clone(),
            pid: None,
            status: ServerStatus::Starting,
            started_at: None,
            last_health_at: None,
            restart_count: 0,
            capabilities: None,
        };

        let mut child = match launch_process(&installed, &self.config) {
            Ok(child) => child,
            Err(e) => {
                record.status = ServerStatus::Failed;
                self.children.lock().await.insert(
                    id,
                    ChildEntry {
                        record: record.clone(),
                        child: None,
                        rpc: None,
                        stderr: StderrSink::new(STDERR_CAPACITY),
                        restart_history: VecDeque::new(),
                    },
                );
                let event = LifecycleEvent::ServerFailed {
                    id,
                    reason: e.to_string(),
                };
                event.log();
                let _ = self.events_tx.send(event);
                return Err(e);
            }
        };

        record.pid = child.id();

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        let stderr_sink = StderrSink::new(STDERR_CAPACITY);
        stderr_sink.spawn_drain(stderr);

        let rpc = RpcClient::spawn(
            Box::new(stdout),
            Box::new(stdin),
            self.config.spawn_handshake_timeout,
        );

        match rpc.initialize(self.config.spawn_handshake_timeout).await {
            Ok(capabilities) => {
                record.status = ServerStatus::Running;
                record.started_at = Some(Utc::now());
                record.last_health_at = Some(Utc::now());
                record.capabilities = Some(capabilities.clone());

                self.children.lock().await.insert(
                    id,
                    ChildEntry {
                        record: record.clone(),
                        child: Some(child),
                        rpc: Some(rpc),
                        stderr: stderr_sink,
                        restart_history: VecDeque::new(),
                    },
                );

                let event = LifecycleEvent::ServerStarted {
                    id,
                    package,
                    capabilities,
                };
                event.log();
                let _ = self.events_tx.send(event);
                Ok(id)
            }
            Err(_) => {
                // No server record remains on a handshake timeout: kill
                // and reap the child rather than leaving a dead entry
                // behind. See DESIGN.md's handshake-timeout entry.
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(SupervisorError::HandshakeTimeout)
            }
        }
    }

    /// `stop(serverID, mode)`. Idempotent: stopping an already-absent
    /// server succeeds with no effect. Once the child is confirmed dead
    /// the record is removed and a `server_stopped` event is emitted,
    /// the same contract a crash gets from `reap_once`.
    pub async fn stop(&self, id: ServerId, graceful: bool) -> Result<(), SupervisorError> {
        let mode = if graceful {
            StopMode::Graceful
        } else {
            StopMode::Immediate
        };

        let pid = {
            let mut guard = self.children.lock().await;
            let Some(entry) = guard.get_mut(&id) else {
                return Ok(());
            };
            entry.record.status = ServerStatus::Stopping;
            entry.record.pid
        };

        if mode == StopMode::Graceful {
            {
                let guard = self.children.lock().await;
                if let Some(Some(rpc)) = guard.get(&id).map(|e| &e.rpc) {
                    rpc.close().await;
                }
            }
            signal_terminate(pid);

            let deadline = Instant::now() + self.config.graceful_stop_timeout;
            while Instant::now() < deadline {
                let exit_code = {
                    let mut guard = self.children.lock().await;
                    match guard.get_mut(&id).and_then(|e| e.child.as_mut()) {
                        Some(child) => match child.try_wait() {
                            Ok(Some(status)) => Some(status.code()),
                            _ => None,
                        },
                        // entry vanished from under us (shouldn't happen
                        // while a stop is in flight, but treat it as done)
                        None => Some(None),
                    }
                };
                if let Some(code) = exit_code {
                    self.finish_stop(id, code).await;
                    return Ok(());
                }
                tokio::time::sleep(GRACEFUL_POLL_INTERVAL).await;
            }
        }

        // Take the `Child` out of the map before waiting on it — `wait` can
        // block until the process actually exits, and must not hold the
        // `children` lock (shared with `list`/`spawn`/the reaper) while it does.
        let mut child = {
            let mut guard = self.children.lock().await;
            guard.get_mut(&id).and_then(|e| e.child.take())
        };
        let code = if let Some(child) = &mut child {
            let _ = child.start_kill();
            child.wait().await.ok().and_then(|s| s.code())
        } else {
            None
        };
        self.finish_stop(id, code).await;
        Ok(())
    }

    /// Remove a confirmed-dead entry from the map and emit its
    /// `server_stopped` event. No-op if the entry is already gone
    /// (e.g. a concurrent `stop()` on the same id beat us to it).
    async fn finish_stop(&self, id: ServerId, code: Option<i32>) {
        let removed = self.children.lock().await.remove(&id);
        if removed.is_none() {
            return;
        }
        let event = LifecycleEvent::ServerStopped {
            id,
            exit_info: ExitInfo { code, clean: true },
        };
        event.log();
        let _ = self.events_tx.send(event);
    }

    pub async fn stderr_recent(&self, id: ServerId) -> Option<Vec<String>> {
        let guard = self.children.lock().await;
        match guard.get(&id) {
            Some(entry) => Some(entry.stderr.recent().await),
            None => None,
        }
    }
}

fn launch_process(
    installed: &InstalledPackage,
    config: &SupervisorConfig,
) -> Result<Child, SupervisorError> {
    let mut cmd = Command::new(&installed.command);
    cmd.args(&installed.args)
        .envs(installed.env.iter().cloned())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    if let Some(limit_bytes) = config.max_child_memory_bytes {
        // Safety: the closure only calls async-signal-safe libc functions
        // between fork and exec, per `Command::pre_exec`'s contract.
        unsafe {
            cmd.pre_exec(move || {
                let rlim = libc::rlimit {
                    rlim_cur: limit_bytes,
                    rlim_max: limit_bytes,
                };
                if libc::setrlimit(libc::RLIMIT_AS, &rlim) != 0 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
    #[cfg(not(unix))]
    let _ = config;

    cmd.spawn()
        .map_err(|e| SupervisorError::SpawnError(format!("{}: {e}", installed.command)))
}

#[cfg(unix)]
fn signal_terminate(pid: Option<u32>) {
    if let Some(pid) = pid {
        unsafe { libc::kill(pid as i32, libc::SIGTERM) };
    }
}

#[cfg(not(unix))]
fn signal_terminate(_pid: Option<u32>) {}

/// Poll every child for exit, handle events + restart policy. Exited
/// children are removed from the map before any restart attempt is made
/// (a restart allocates a fresh entry under a new spawn), avoiding
/// recursive locking.
async fn reap_once(
    children: &Arc<Mutex<HashMap<ServerId, ChildEntry>>>,
    events_tx: &broadcast::Sender<LifecycleEvent>,
    config: &Arc<SupervisorConfig>,
) {
    let mut exited = Vec::new();
    {
        let mut guard = children.lock().await;
        for (id, entry) in guard.iter_mut() {
            if entry.record.status == ServerStatus::Stopping {
                continue;
            }
            let Some(child) = entry.child.as_mut() else {
                continue;
            };
            if let Ok(Some(status)) = child.try_wait() {
                exited.push((*id, status.code()));
            }
        }
    }

    for (id, code) in exited {
        let removed = {
            let mut guard = children.lock().await;
            let Some(mut entry) = guard.remove(&id) else {
                continue;
            };
            entry.record.pid = None;
            let clean = code == Some(0);
            entry.record.status = if clean {
                ServerStatus::Exited
            } else {
                ServerStatus::Failed
            };
            let event = LifecycleEvent::ServerStopped {
                id,
                exit_info: ExitInfo { code, clean },
            };
            event.log();
            let _ = events_tx.send(event);
            if clean {
                None
            } else {
                Some((
                    entry.record.package.clone(),
                    entry.restart_history,
                    entry.record.command.clone(),
                    entry.record.args.clone(),
                    entry.record.env.clone(),
                ))
            }
        };

        let Some((package, mut restart_history, command, args, env)) = removed else {
            continue;
        };

        let now = Instant::now();
        while restart_history
            .front()
            .is_some_and(|t| now.duration_since(*t) > config.restart_window)
        {
            restart_history.pop_front();
        }

        if restart_history.len() as u32 >= config.restart_max_attempts {
            tracing::warn!(
                ?id,
                package = %package,
                "restart attempts exhausted within the rolling window; giving up"
            );
            continue;
        }

        let attempt = restart_history.len() as u32;
        restart_history.push_back(now);
        let backoff = backoff_for_attempt(attempt);

        let children = children.clone();
        let events_tx = events_tx.clone();
        let config = config.clone();
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            restart_child(
                &children,
                &events_tx,
                &config,
                id,
                package,
                command,
                args,
                env,
                restart_history,
            )
            .await;
        });
    }
}

fn backoff_for_attempt(attempt: u32) -> Duration {
    let scaled =
        RESTART_BACKOFF_FLOOR.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    scaled.min(RESTART_BACKOFF_CAP)
}

#[allow(clippy::too_many_arguments)]
async fn restart_child(
    children: &Arc<Mutex<HashMap<ServerId, ChildEntry>>>,
    events_tx: &broadcast::Sender<LifecycleEvent>,
    config: &Arc<SupervisorConfig>,
    old_id: ServerId,
    package: PackageSpec,
    command: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    restart_history: VecDeque<Instant>,
) {
    let installed = InstalledPackage { command, args, env };
    let new_id = ServerId::new();
    let mut record = ServerRecord {
        id: new_id,
        package: package.clone(),
        command: installed.command.clone(),
        args: installed.args.clone(),
        env: installed.env.clone(),
        pid: None,
        status: ServerStatus::Starting,
        started_at: None,
        last_health_at: None,
        restart_count: restart_history.len() as u32,
        capabilities: None,
    };

    let mut child = match launch_process(&installed, config) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(?old_id, "restart spawn failed: {e}");
            let event = LifecycleEvent::ServerFailed {
                id: new_id,
                reason: e.to_string(),
            };
            event.log();
            let _ = events_tx.send(event);
            return;
        }
    };

    record.pid = child.id();
    let stdin = child.stdin.take().expect("piped stdin");
    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");

    let stderr_sink = StderrSink::new(STDERR_CAPACITY);
    stderr_sink.spawn_drain(stderr);

    let rpc = RpcClient::spawn(
        Box::new(stdout),
        Box::new(stdin),
        config.spawn_handshake_timeout,
    );

    match rpc.initialize(config.spawn_handshake_timeout).await {
        Ok(capabilities) => {
            record.status = ServerStatus::Running;
            record.started_at = Some(Utc::now());
            record.last_health_at = Some(Utc::now());
            record.capabilities = Some(capabilities.clone());

            children.lock().await.insert(
                new_id,
                ChildEntry {
                    record,
                    child: Some(child),
                    rpc: Some(rpc),
                    stderr: stderr_sink,
                    restart_history,
                },
            );
            let event = LifecycleEvent::ServerStarted {
                id: new_id,
                package,
                capabilities,
            };
            event.log();
            let _ = events_tx.send(event);
        }
        Err(_) => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            let event = LifecycleEvent::ServerFailed {
                id: new_id,
                reason: "restart handshake timed out".into(),
            };
            event.log();
            let _ = events_tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::PathShimInstaller;

    fn test_config() -> SupervisorConfig {
        SupervisorConfig {
            install_timeout: Duration::from_secs(1),
            spawn_handshake_timeout: Duration::from_millis(200),
            restart_max_attempts: 5,
            restart_window: Duration::from_secs(60),
            graceful_stop_timeout: Duration::from_secs(1),
            max_child_memory_bytes: None,
            max_child_cpu_pct: None,
        }
    }

    #[tokio::test]
    async fn spawn_nonexistent_binary_fails_without_hanging() {
        let supervisor = Supervisor::new(Arc::new(PathShimInstaller), test_config());
        let package = PackageSpec::new("/nonexistent/binary/path/for/tests");
        let err = supervisor.spawn(package).await.unwrap_err();
        assert!(matches!(err, SupervisorError::SpawnError(_)));
        assert_eq!(supervisor.list().await.len(), 1);
        assert_eq!(supervisor.list().await[0].status, ServerStatus::Failed);
    }

    #[tokio::test]
    async fn handshake_timeout_against_a_silent_child_removes_no_record() {
        // `cat` never speaks JSON-RPC; initialize() will time out.
        let supervisor = Supervisor::new(Arc::new(PathShimInstaller), test_config());
        let package = PackageSpec::new("cat");
        let err = supervisor.spawn(package).await.unwrap_err();
        assert!(matches!(err, SupervisorError::HandshakeTimeout));
        assert!(supervisor.list().await.is_empty());
    }

    #[tokio::test]
    async fn stop_on_unknown_id_is_a_no_op() {
        let supervisor = Supervisor::new(Arc::new(PathShimInstaller), test_config());
        let result = supervisor.stop(ServerId::new(), true).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn backoff_schedule_doubles_and_caps() {
        assert_eq!(backoff_for_attempt(0), Duration::from_millis(100));
        assert_eq!(backoff_for_attempt(1), Duration::from_millis(200));
        assert_eq!(backoff_for_attempt(2), Duration::from_millis(400));
        assert_eq!(backoff_for_attempt(20), Duration::from_secs(30));
    }
}
