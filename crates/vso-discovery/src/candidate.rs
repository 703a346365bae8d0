//! The `Candidate` type returned by `search`.

use serde::{Deserialize, Serialize};

/// One ranked package suggestion for a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub package: String,
    pub version: Option<String>,
    pub score: f64,
    pub rationale: String,
}

impl Candidate {
    pub fn new(package: impl Into<String>, score: f64, rationale: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: None,
            score,
            rationale: rationale.into(),
        }
    }
}
