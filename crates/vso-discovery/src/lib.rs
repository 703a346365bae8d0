//! External server discovery: ranks candidate packages for a capability.

mod candidate;
mod discovery;
mod error;
mod registry;
mod scoring;

pub use candidate::Candidate;
pub use discovery::Discovery;
pub use error::DiscoveryError;
pub use registry::{HttpRegistryClient, RegistryClient, StaticRegistryClient, DEFAULT_QUERY_TIMEOUT};
