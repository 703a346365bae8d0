use thiserror::Error;

use vso_core::error::{ErrorKind, OrchestratorError};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("registry query failed: {0}")]
    RegistryUnreachable(String),

    #[error("registry response could not be parsed: {0}")]
    Malformed(String),
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RegistryUnreachable(_) => ErrorKind::Transient,
            Self::Malformed(_) => ErrorKind::Internal,
        }
    }
}

impl From<DiscoveryError> for OrchestratorError {
    fn from(err: DiscoveryError) -> Self {
        match err.kind() {
            ErrorKind::Transient => OrchestratorError::transient(err.to_string()),
            _ => OrchestratorError::internal(err.to_string()),
        }
    }
}
