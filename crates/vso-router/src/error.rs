use thiserror::Error;
use vso_core::error::{ErrorKind, OrchestratorError};
use vso_core::ids::Capability;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no provider for capability '{0}'")]
    NoProvider(Capability),

    #[error(transparent)]
    Rpc(#[from] vso_rpc::RpcError),
}

impl RouterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoProvider(_) => ErrorKind::Validation,
            Self::Rpc(e) => e.kind(),
        }
    }
}

impl From<RouterError> for OrchestratorError {
    fn from(err: RouterError) -> Self {
        match err.kind() {
            ErrorKind::Validation => OrchestratorError::validation(err.to_string()),
            ErrorKind::Transient => OrchestratorError::transient(err.to_string()),
            ErrorKind::Lifecycle => OrchestratorError::lifecycle(err.to_string()),
            ErrorKind::Protocol | ErrorKind::Internal => OrchestratorError::internal(err.to_string()),
        }
    }
}
