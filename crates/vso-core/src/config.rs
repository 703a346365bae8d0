//! Runtime configuration.
//!
//! Every tunable is read from an environment variable with a documented
//! default, using a typed `Default` + env-var-resolution shape. A TOML
//! file could seed the same struct (the workspace already depends on
//! `toml`) but only the env-var path is wired up, since any one mechanism
//! is enough.

use serde::{Deserialize, Serialize};

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// The complete set of runtime tunables, plus resource-cap fields which
/// are `Option` because they are best-effort / platform-dependent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub http_port: u16,
    pub daemon_enabled: bool,
    pub daemon_interval_ms: u64,
    pub router_refresh_ms: u64,
    pub spawn_handshake_ms: u64,
    pub call_default_timeout_ms: u64,
    pub restart_max_attempts: u32,
    pub restart_window_ms: u64,
    pub install_timeout_ms: u64,
    pub acquisition_wait_ms: u64,
    pub acquisition_concurrency: u32,
    pub max_child_memory_bytes: Option<u64>,
    pub max_child_cpu_pct: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 4000,
            daemon_enabled: true,
            daemon_interval_ms: 30_000,
            router_refresh_ms: 5_000,
            spawn_handshake_ms: 10_000,
            call_default_timeout_ms: 30_000,
            restart_max_attempts: 5,
            restart_window_ms: 60_000,
            install_timeout_ms: 120_000,
            acquisition_wait_ms: 15_000,
            acquisition_concurrency: 3,
            max_child_memory_bytes: None,
            max_child_cpu_pct: None,
        }
    }
}

impl Config {
    /// Build configuration from the process environment, falling back to
    /// the documented defaults for any key that is absent or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_port: env_u16("VSO_HTTP_PORT", defaults.http_port),
            daemon_enabled: env_bool("VSO_DAEMON_ENABLED", defaults.daemon_enabled),
            daemon_interval_ms: env_u64("VSO_DAEMON_INTERVAL_MS", defaults.daemon_interval_ms),
            router_refresh_ms: env_u64("VSO_ROUTER_REFRESH_MS", defaults.router_refresh_ms),
            spawn_handshake_ms: env_u64("VSO_SPAWN_HANDSHAKE_MS", defaults.spawn_handshake_ms),
            call_default_timeout_ms: env_u64(
                "VSO_CALL_DEFAULT_TIMEOUT_MS",
                defaults.call_default_timeout_ms,
            ),
            restart_max_attempts: env_u32(
                "VSO_RESTART_MAX_ATTEMPTS",
                defaults.restart_max_attempts,
            ),
            restart_window_ms: env_u64("VSO_RESTART_WINDOW_MS", defaults.restart_window_ms),
            install_timeout_ms: env_u64("VSO_INSTALL_TIMEOUT_MS", defaults.install_timeout_ms),
            acquisition_wait_ms: env_u64(
                "VSO_ACQUISITION_WAIT_MS",
                defaults.acquisition_wait_ms,
            ),
            acquisition_concurrency: env_u32(
                "VSO_ACQUISITION_CONCURRENCY",
                defaults.acquisition_concurrency,
            ),
            max_child_memory_bytes: std::env::var("VSO_MAX_CHILD_MEMORY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok()),
            max_child_cpu_pct: std::env::var("VSO_MAX_CHILD_CPU_PCT")
                .ok()
                .and_then(|v| v.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_have_documented_values() {
        let c = Config::default();
        assert_eq!(c.http_port, 4000);
        assert_eq!(c.daemon_interval_ms, 30_000);
        assert_eq!(c.router_refresh_ms, 5_000);
        assert_eq!(c.restart_max_attempts, 5);
        assert_eq!(c.acquisition_concurrency, 3);
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        // SAFETY: serialized via #[serial] — no other test mutates these keys
        // concurrently.
        unsafe {
            std::env::set_var("VSO_HTTP_PORT", "9001");
            std::env::set_var("VSO_DAEMON_INTERVAL_MS", "1000");
        }
        let c = Config::from_env();
        assert_eq!(c.http_port, 9001);
        assert_eq!(c.daemon_interval_ms, 1000);
        unsafe {
            std::env::remove_var("VSO_HTTP_PORT");
            std::env::remove_var("VSO_DAEMON_INTERVAL_MS");
        }
    }

    #[test]
    #[serial]
    fn malformed_env_falls_back_to_default() {
        unsafe {
            std::env::set_var("VSO_HTTP_PORT", "not-a-number");
        }
        let c = Config::from_env();
        assert_eq!(c.http_port, Config::default().http_port);
        unsafe {
            std::env::remove_var("VSO_HTTP_PORT");
        }
    }
}
