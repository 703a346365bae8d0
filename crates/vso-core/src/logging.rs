//! `tracing` subscriber initialization, shared by the `vso` binary and tests.

/// Install a global `tracing` subscriber reading `RUST_LOG` (default `info`).
///
/// Idempotent-ish: calling this twice in the same process (e.g. across test
/// binaries) is harmless because `tracing_subscriber` already guards against
/// double-init internally via `try_init`.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
