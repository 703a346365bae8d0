//! Identifiers shared across every crate in the workspace.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, unique identifier for a [`crate::server::ServerRecord`].
///
/// Monotonic in spirit (assigned by the supervisor in spawn order) but
/// implemented as a UUID so identifiers remain unique across daemon restarts
/// without a persisted counter — state does not survive a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServerId(Uuid);

impl ServerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ServerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An abstract capability name (GLOSSARY: "Capability"). Not a type — just a
/// key, so it is a thin newtype over `String` rather than an enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Capability(String);

impl Capability {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_id_unique() {
        assert_ne!(ServerId::new(), ServerId::new());
    }

    #[test]
    fn capability_equality_by_name() {
        assert_eq!(Capability::new("blockchain"), Capability::new("blockchain"));
        assert_ne!(Capability::new("blockchain"), Capability::new("weather"));
    }
}
