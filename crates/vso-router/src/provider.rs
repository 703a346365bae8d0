use serde::{Deserialize, Serialize};

use vso_core::ids::{Capability, ServerId};

/// One `(serverID, toolName, score)` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub server_id: ServerId,
    pub tool_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityEntry {
    pub capability: Capability,
    pub providers: Vec<Provider>,
}
