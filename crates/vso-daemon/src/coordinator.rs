//! The Acquisition Coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use vso_core::ids::{Capability, ServerId};
use vso_discovery::Discovery;
use vso_router::Router;
use vso_supervisor::{PackageSpec, Supervisor};

use crate::error::CoordinatorError;

/// Poll interval for the router-reflection wait. Subscription-with-poll-
/// fallback would be the ideal mechanism; this implementation polls only,
/// since the router does not (yet) expose its own update stream
/// independent of the supervisor's lifecycle events.
const REFLECTION_POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct AcquisitionCoordinator {
    discovery: Discovery,
    supervisor: Supervisor,
    router: Arc<Router>,
    wait_deadline: Duration,
}

impl AcquisitionCoordinator {
    pub fn new(
        discovery: Discovery,
        supervisor: Supervisor,
        router: Arc<Router>,
        wait_deadline: Duration,
    ) -> Self {
        Self {
            discovery,
            supervisor,
            router,
            wait_deadline,
        }
    }

    /// `acquire(capability) -> Result`: discover candidates, spawn the
    /// first that succeeds, wait for the router to reflect the new
    /// provider, roll back on timeout.
    pub async fn acquire(&self, capability: &Capability) -> Result<ServerId, CoordinatorError> {
        let candidates = self.discovery.search(capability.as_str(), None).await;
        if candidates.is_empty() {
            return Err(CoordinatorError::NoCandidates(capability.clone()));
        }

        let mut server_id = None;
        for candidate in &candidates {
            let mut spec = PackageSpec::new(candidate.package.clone());
            spec.version = candidate.version.clone();
            match self.supervisor.spawn(spec).await {
                Ok(id) => {
                    server_id = Some(id);
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        package = %candidate.package,
                        "candidate failed to spawn, falling through: {e}"
                    );
                }
            }
        }

        let Some(server_id) = server_id else {
            return Err(CoordinatorError::AllCandidatesFailed(capability.clone()));
        };

        if self.wait_for_reflection(capability).await {
            return Ok(server_id);
        }

        // Step 4 atomicity: a partial acquisition must not linger.
        tracing::warn!(
            %capability,
            "router did not reflect acquired server in time, rolling back"
        );
        if let Err(e) = self.supervisor.stop(server_id, true).await {
            tracing::warn!(%capability, "rollback stop failed: {e}");
        }
        Err(CoordinatorError::ReflectionTimeout(capability.clone()))
    }

    async fn wait_for_reflection(&self, capability: &Capability) -> bool {
        let deadline = Instant::now() + self.wait_deadline;
        loop {
            if self.router.resolve(capability).is_some() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(REFLECTION_POLL_INTERVAL).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vso_discovery::Discovery;
    use vso_router::{IdentityMapper, Router};
    use vso_supervisor::{PathShimInstaller, SupervisorConfig};

    fn build_coordinator(wait: Duration) -> AcquisitionCoordinator {
        let supervisor = Supervisor::new(Arc::new(PathShimInstaller), SupervisorConfig::default());
        let router = Router::new(supervisor.clone(), Arc::new(IdentityMapper));
        let discovery = Discovery::new(vec![]);
        AcquisitionCoordinator::new(discovery, supervisor, router, wait)
    }

    #[tokio::test]
    async fn no_candidates_fails_immediately() {
        let coordinator = build_coordinator(Duration::from_millis(50));
        let err = coordinator
            .acquire(&Capability::new("blockchain"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoordinatorError::NoCandidates(_)));
    }
}
