use thiserror::Error;
use vso_core::error::{ErrorKind, OrchestratorError};
use vso_transport::TransportError;

use crate::message::RpcErrorObj;

/// Failure modes of an outbound JSON-RPC call. Every call resolves to
/// either a response or one of these within `timeout + ε` — no caller
/// hangs indefinitely.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("transport closed before a response arrived")]
    TransportClosed,

    #[error("remote returned an error: {0:?}")]
    Remote(RpcErrorObj),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("client is shutting down")]
    Closed,
}

impl RpcError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout(_) => ErrorKind::Transient,
            Self::TransportClosed | Self::Closed => ErrorKind::Lifecycle,
            Self::Remote(_) => ErrorKind::Protocol,
            Self::Transport(_) => ErrorKind::Transient,
            Self::Serialize(_) => ErrorKind::Internal,
        }
    }
}

impl From<RpcError> for OrchestratorError {
    fn from(err: RpcError) -> Self {
        match err.kind() {
            ErrorKind::Protocol => {
                if let RpcError::Remote(obj) = &err {
                    OrchestratorError::Protocol {
                        code: obj.code,
                        message: obj.message.clone(),
                    }
                } else {
                    OrchestratorError::internal(err.to_string())
                }
            }
            ErrorKind::Transient => OrchestratorError::transient(err.to_string()),
            ErrorKind::Lifecycle => OrchestratorError::lifecycle(err.to_string()),
            ErrorKind::Validation => OrchestratorError::validation(err.to_string()),
            ErrorKind::Internal => OrchestratorError::internal(err.to_string()),
        }
    }
}
