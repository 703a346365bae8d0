use std::time::Duration;

/// Tunables for the [`crate::VarietyMonitor`] and [`crate::AcquisitionCoordinator`].
/// Backoff parameters intentionally mirror
/// `vso_supervisor::SupervisorConfig`'s restart policy: same shape, same
/// defaults.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub tick_interval: Duration,
    pub concurrency: usize,
    pub acquisition_wait: Duration,
    pub retry_max_attempts: u32,
    pub retry_window: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(30),
            concurrency: 3,
            acquisition_wait: Duration::from_secs(15),
            retry_max_attempts: 5,
            retry_window: Duration::from_secs(60),
        }
    }
}
