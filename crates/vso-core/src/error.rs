//! Shared error taxonomy: kinds, not types.
//!
//! Each downstream crate defines the concrete error conditions it raises,
//! but every one of them funnels into this shared vocabulary so the HTTP
//! facade and JSON-RPC client can map to the right status code / JSON-RPC
//! error code without knowing which crate produced the failure.

use thiserror::Error;

/// A classification of failure, independent of which component raised it.
///
/// Concrete error enums (`vso_rpc::RpcError`, `vso_supervisor::SupervisorError`,
/// ...) each expose a `kind()` method returning one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input the caller sent us; nothing is retried.
    Validation,
    /// Transient I/O failure; the caller's own retry/backoff schedule applies.
    Transient,
    /// A lifecycle failure recorded against a server record.
    Lifecycle,
    /// A JSON-RPC protocol-level error (has a reserved numeric code).
    Protocol,
    /// An invariant that should be unreachable in a correct implementation.
    Internal,
}

/// Top-level error type used by the binary and the HTTP facade to carry a
/// human-readable message plus an optional machine-readable code, matching
/// the `{"error": string, "details"?: object}` HTTP error body shape.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("transient error: {message}")]
    Transient { message: String },

    #[error("lifecycle error: {message}")]
    Lifecycle { message: String },

    #[error("protocol error ({code}): {message}")]
    Protocol { code: i64, message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl OrchestratorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Transient { .. } => ErrorKind::Transient,
            Self::Lifecycle { .. } => ErrorKind::Lifecycle,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Well-known JSON-RPC 2.0 error codes.
pub mod jsonrpc_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Reserved range for application-defined codes.
    pub const APP_DEFINED_MIN: i64 = -32099;
    pub const APP_DEFINED_MAX: i64 = -32000;

    pub fn is_app_defined(code: i64) -> bool {
        (APP_DEFINED_MIN..=APP_DEFINED_MAX).contains(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_mapping() {
        assert_eq!(
            OrchestratorError::validation("x").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            OrchestratorError::internal("x").kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn app_defined_range() {
        assert!(jsonrpc_codes::is_app_defined(-32005));
        assert!(!jsonrpc_codes::is_app_defined(-32700));
        assert!(!jsonrpc_codes::is_app_defined(-31999));
    }
}
