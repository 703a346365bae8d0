//! The HTTP facade: health, capability listing, server listing,
//! autonomy triggering, execution, and daemon status endpoints.

mod handlers;
mod router;
mod serve;
mod state;

pub use router::build_router;
pub use serve::serve;
pub use state::AppState;
