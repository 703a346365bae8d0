use thiserror::Error;
use vso_core::error::{ErrorKind, OrchestratorError};
use vso_core::ids::ServerId;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("failed to install package: {0}")]
    InstallError(String),

    #[error("failed to spawn child process: {0}")]
    SpawnError(String),

    #[error("handshake did not complete within the configured deadline")]
    HandshakeTimeout,

    #[error("no server with id {0}")]
    NotFound(ServerId),

    #[error("rpc error: {0}")]
    Rpc(#[from] vso_rpc::RpcError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InstallError(_) | Self::SpawnError(_) | Self::HandshakeTimeout => {
                ErrorKind::Lifecycle
            }
            Self::NotFound(_) => ErrorKind::Validation,
            Self::Rpc(e) => e.kind(),
            Self::Io(_) => ErrorKind::Transient,
        }
    }
}

impl From<SupervisorError> for OrchestratorError {
    fn from(err: SupervisorError) -> Self {
        match err.kind() {
            ErrorKind::Validation => OrchestratorError::validation(err.to_string()),
            ErrorKind::Transient => OrchestratorError::transient(err.to_string()),
            ErrorKind::Lifecycle => OrchestratorError::lifecycle(err.to_string()),
            ErrorKind::Protocol => OrchestratorError::internal(err.to_string()),
            ErrorKind::Internal => OrchestratorError::internal(err.to_string()),
        }
    }
}
