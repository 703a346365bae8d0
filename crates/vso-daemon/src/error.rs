use thiserror::Error;

use vso_core::error::{ErrorKind, OrchestratorError};
use vso_core::ids::Capability;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("no candidate packages found for capability '{0}'")]
    NoCandidates(Capability),

    #[error("every candidate package for capability '{0}' failed to spawn")]
    AllCandidatesFailed(Capability),

    #[error("router did not reflect a provider for '{0}' within the wait deadline")]
    ReflectionTimeout(Capability),

    #[error(transparent)]
    Supervisor(#[from] vso_supervisor::SupervisorError),

    #[error(transparent)]
    Router(#[from] vso_router::RouterError),
}

impl CoordinatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCandidates(_) => ErrorKind::Validation,
            Self::AllCandidatesFailed(_) => ErrorKind::Lifecycle,
            Self::ReflectionTimeout(_) => ErrorKind::Transient,
            Self::Supervisor(e) => e.kind(),
            Self::Router(e) => e.kind(),
        }
    }
}

impl From<CoordinatorError> for OrchestratorError {
    fn from(err: CoordinatorError) -> Self {
        match err.kind() {
            ErrorKind::Validation => OrchestratorError::validation(err.to_string()),
            ErrorKind::Transient => OrchestratorError::transient(err.to_string()),
            ErrorKind::Lifecycle => OrchestratorError::lifecycle(err.to_string()),
            ErrorKind::Protocol | ErrorKind::Internal => OrchestratorError::internal(err.to_string()),
        }
    }
}
