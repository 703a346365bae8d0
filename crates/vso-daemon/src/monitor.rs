//! The Variety Monitor.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use vso_core::event_log::{emit_event_best_effort, EventFields};
use vso_core::ids::Capability;
use vso_router::Router;

use crate::config::DaemonConfig;
use crate::coordinator::AcquisitionCoordinator;
use crate::ordered_set::OrderedSet;

const BACKOFF_FLOOR: Duration = Duration::from_millis(100);
const BACKOFF_CAP: Duration = Duration::from_secs(30);

fn backoff_for_attempt(attempt: u32) -> Duration {
    let exp = attempt.min(8);
    (BACKOFF_FLOOR * 2u32.pow(exp)).min(BACKOFF_CAP)
}

/// `idle | scanning | acting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    Idle,
    Scanning,
    Acting,
}

impl std::fmt::Display for DaemonState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Scanning => write!(f, "scanning"),
            Self::Acting => write!(f, "acting"),
        }
    }
}

/// `/daemon` response shape.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonStatus {
    pub running: bool,
    pub interval_ms: u64,
    pub state: String,
    pub checks: u64,
}

/// `VarietyGap`: a point-in-time snapshot, not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct VarietyGap {
    pub required: Vec<Capability>,
    pub missing: Vec<Capability>,
    pub in_flight: Vec<Capability>,
}

#[derive(Default)]
struct BackoffEntry {
    failures: VecDeque<Instant>,
    next_eligible_at: Option<Instant>,
}

/// A single long-lived task evaluating the gap between `required` and the
/// router's current registry, dispatching acquisitions through the
/// [`AcquisitionCoordinator`].
pub struct VarietyMonitor {
    required: Mutex<OrderedSet<Capability>>,
    in_flight: Mutex<HashSet<Capability>>,
    backoff: Mutex<HashMap<Capability, BackoffEntry>>,
    state: Mutex<DaemonState>,
    checks: AtomicU64,
    enabled: AtomicBool,
    config: DaemonConfig,
    coordinator: Arc<AcquisitionCoordinator>,
    router: Arc<Router>,
}

impl VarietyMonitor {
    pub fn new(
        coordinator: Arc<AcquisitionCoordinator>,
        router: Arc<Router>,
        config: DaemonConfig,
        enabled: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            required: Mutex::new(OrderedSet::new()),
            in_flight: Mutex::new(HashSet::new()),
            backoff: Mutex::new(HashMap::new()),
            state: Mutex::new(if enabled {
                DaemonState::Scanning
            } else {
                DaemonState::Idle
            }),
            checks: AtomicU64::new(0),
            enabled: AtomicBool::new(enabled),
            config,
            coordinator,
            router,
        })
    }

    /// Spawn the periodic tick loop. Call once.
    pub fn start(self: &Arc<Self>, cancel: CancellationToken) {
        let monitor = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(monitor.config.tick_interval) => {
                        monitor.tick().await;
                    }
                }
            }
        });
    }

    /// `idle -> scanning`.
    pub async fn enable(&self) {
        if !self.enabled.swap(true, Ordering::SeqCst) {
            *self.state.lock().await = DaemonState::Scanning;
        }
    }

    /// `any -> idle`; in-flight acquisitions finish but are not retried
    /// (enforced by `tick` refusing to dispatch while disabled).
    pub async fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        *self.state.lock().await = DaemonState::Idle;
    }

    pub fn status(&self) -> DaemonStatus {
        DaemonStatus {
            running: self.enabled.load(Ordering::SeqCst),
            interval_ms: self.config.tick_interval.as_millis() as u64,
            state: self.state.try_lock().map(|s| s.to_string()).unwrap_or_else(|_| "unknown".into()),
            checks: self.checks.load(Ordering::SeqCst),
        }
    }

    /// `POST /autonomy/trigger`: injects capabilities into `required` and
    /// returns the resulting gap immediately; dispatch happens in the
    /// background on the next tick (kicked off right away rather than
    /// waiting out the full tick interval).
    pub async fn inject(self: &Arc<Self>, capabilities: Vec<Capability>) -> VarietyGap {
        {
            let mut required = self.required.lock().await;
            for capability in capabilities {
                required.insert(capability);
            }
        }
        let gap = self.gap().await;
        let monitor = self.clone();
        tokio::spawn(async move {
            monitor.tick().await;
        });
        gap
    }

    pub async fn gap(&self) -> VarietyGap {
        let required: Vec<Capability> = self.required.lock().await.iter().cloned().collect();
        let running: HashSet<Capability> = self.router.capability_names().into_iter().collect();
        let in_flight: Vec<Capability> = self.in_flight.lock().await.iter().cloned().collect();
        let in_flight_set: HashSet<Capability> = in_flight.iter().cloned().collect();
        let missing = required
            .iter()
            .filter(|c| !running.contains(c) && !in_flight_set.contains(c))
            .cloned()
            .collect();
        VarietyGap {
            required,
            missing,
            in_flight,
        }
    }

    /// One evaluation cycle: recompute the gap, filter by backoff
    /// eligibility, dispatch up to the remaining concurrency slots.
    ///
    /// `in_flight` is held across the missing/eligible/slots computation
    /// and the reservation insert, so two ticks racing (the periodic loop
    /// and an `inject`-spawned one, say) can't both see the same capability
    /// as dispatchable and both acquire it — the second tick to reach the
    /// lock sees the first tick's reservation and skips the capability.
    pub async fn tick(self: &Arc<Self>) {
        self.checks.fetch_add(1, Ordering::SeqCst);

        if !self.enabled.load(Ordering::SeqCst) {
            *self.state.lock().await = DaemonState::Idle;
            return;
        }

        let required: Vec<Capability> = self.required.lock().await.iter().cloned().collect();
        let running: HashSet<Capability> = self.router.capability_names().into_iter().collect();
        let now = Instant::now();

        let mut in_flight = self.in_flight.lock().await;
        let missing: Vec<Capability> = required
            .iter()
            .filter(|c| !running.contains(c) && !in_flight.contains(c))
            .cloned()
            .collect();

        let eligible: Vec<Capability> = {
            let backoff = self.backoff.lock().await;
            missing
                .into_iter()
                .filter(|c| {
                    backoff
                        .get(c)
                        .and_then(|entry| entry.next_eligible_at)
                        .map(|at| now >= at)
                        .unwrap_or(true)
                })
                .collect()
        };

        let slots = self.config.concurrency.saturating_sub(in_flight.len());
        let to_dispatch: Vec<Capability> = eligible.into_iter().take(slots).collect();

        if to_dispatch.is_empty() {
            let still_acting = !in_flight.is_empty();
            drop(in_flight);
            *self.state.lock().await = if still_acting {
                DaemonState::Acting
            } else {
                DaemonState::Scanning
            };
            return;
        }

        for capability in &to_dispatch {
            in_flight.insert(capability.clone());
        }
        drop(in_flight);

        *self.state.lock().await = DaemonState::Acting;
        for capability in to_dispatch {
            self.dispatch(capability);
        }
    }

    fn dispatch(self: &Arc<Self>, capability: Capability) {
        let monitor = self.clone();
        tokio::spawn(async move {
            emit_event_best_effort(EventFields {
                level: "info",
                source: "vso-daemon",
                action: "acquisition_started",
                capability: Some(capability.to_string()),
                ..Default::default()
            });
            let result = monitor.coordinator.acquire(&capability).await;
            monitor.in_flight.lock().await.remove(&capability);
            match result {
                Ok(server_id) => {
                    tracing::info!(%capability, %server_id, "acquisition succeeded");
                    emit_event_best_effort(EventFields {
                        level: "info",
                        source: "vso-daemon",
                        action: "acquisition_succeeded",
                        capability: Some(capability.to_string()),
                        server_id: Some(server_id.to_string()),
                        ..Default::default()
                    });
                }
                Err(e) => {
                    tracing::warn!(%capability, "acquisition failed: {e}");
                    emit_event_best_effort(EventFields {
                        level: "warn",
                        source: "vso-daemon",
                        action: "acquisition_failed",
                        capability: Some(capability.to_string()),
                        result: Some(e.to_string()),
                        ..Default::default()
                    });
                    let mut backoff = monitor.backoff.lock().await;
                    let entry = backoff.entry(capability.clone()).or_default();
                    entry.failures.push_back(Instant::now());
                    while entry.failures.len() as u32 > 1
                        && entry
                            .failures
                            .front()
                            .map(|t| t.elapsed() > monitor.config.retry_window)
                            .unwrap_or(false)
                    {
                        entry.failures.pop_front();
                    }
                    let attempt = entry.failures.len().min(monitor.config.retry_max_attempts as usize) as u32;
                    entry.next_eligible_at = Some(Instant::now() + backoff_for_attempt(attempt));
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vso_discovery::Discovery;
    use vso_router::{IdentityMapper, Router};
    use vso_supervisor::{PathShimInstaller, Supervisor, SupervisorConfig};

    fn build_monitor(enabled: bool) -> Arc<VarietyMonitor> {
        let supervisor = Supervisor::new(Arc::new(PathShimInstaller), SupervisorConfig::default());
        let router = Router::new(supervisor.clone(), Arc::new(IdentityMapper));
        let coordinator = Arc::new(AcquisitionCoordinator::new(
            Discovery::new(vec![]),
            supervisor,
            router.clone(),
            Duration::from_millis(50),
        ));
        VarietyMonitor::new(coordinator, router, DaemonConfig::default(), enabled)
    }

    #[tokio::test]
    async fn starts_idle_when_disabled() {
        let monitor = build_monitor(false);
        assert_eq!(monitor.status().state, "idle");
    }

    #[tokio::test]
    async fn starts_scanning_when_enabled() {
        let monitor = build_monitor(true);
        assert_eq!(monitor.status().state, "scanning");
    }

    #[tokio::test]
    async fn disable_sets_idle_even_mid_cycle() {
        let monitor = build_monitor(true);
        monitor.disable().await;
        assert_eq!(monitor.status().state, "idle");
        assert!(!monitor.status().running);
    }

    #[tokio::test]
    async fn inject_adds_to_required_and_reports_missing() {
        let monitor = build_monitor(false);
        let gap = monitor.inject(vec![Capability::new("blockchain")]).await;
        assert_eq!(gap.required, vec![Capability::new("blockchain")]);
        assert_eq!(gap.missing, vec![Capability::new("blockchain")]);
        assert!(gap.in_flight.is_empty());
    }

    #[tokio::test]
    async fn tick_while_disabled_does_not_dispatch() {
        let monitor = build_monitor(false);
        monitor.required.lock().await.insert(Capability::new("blockchain"));
        monitor.tick().await;
        assert!(monitor.in_flight.lock().await.is_empty());
        assert_eq!(monitor.status().state, "idle");
    }

    #[tokio::test]
    async fn tick_does_not_redispatch_a_capability_already_in_flight() {
        // Simulates what a concurrent tick's reservation looks like from
        // this tick's point of view: the capability is already reserved
        // before `tick` computes its own `missing` set, so it must not be
        // inserted or dispatched a second time.
        let monitor = build_monitor(true);
        let cap = Capability::new("blockchain");
        monitor.required.lock().await.insert(cap.clone());
        monitor.in_flight.lock().await.insert(cap.clone());
        monitor.tick().await;
        assert_eq!(monitor.in_flight.lock().await.len(), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_for_attempt(0), Duration::from_millis(100));
        assert_eq!(backoff_for_attempt(1), Duration::from_millis(200));
        assert_eq!(backoff_for_attempt(20), Duration::from_secs(30));
    }
}
