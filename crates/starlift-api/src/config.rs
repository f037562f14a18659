//! # Coordinator Configuration
//!
//! Environment-driven, with sane defaults for a single-host cluster:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `STARLIFT_PORT` | `8440` | HTTP/WebSocket listen port |
//! | `STARLIFT_DATA_DIR` | `data` | Durable state directory |
//! | `STARLIFT_AUTH_TOKEN` | unset | Bearer/handshake token (unset = auth disabled) |
//! | `STARLIFT_MAX_EXPORTS` | `50` | Export store cap |
//! | `STARLIFT_MAX_ACTIVE_TRANSFERS` | `100` | Active transfer cap |
//! | `STARLIFT_TREE_BROADCAST_MS` | `300` | Tree broadcast rate-limit window |
//! | `STARLIFT_VALIDATION_TIMEOUT_MS` | `120000` | Validation verdict deadline |
//! | `STARLIFT_EXPORT_WAIT_MS` | `10000` | Export staging wait |

use std::path::PathBuf;
use std::time::Duration;

/// Fully resolved coordinator configuration.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// HTTP/WebSocket listen port.
    pub port: u16,
    /// Directory for `platform_exports.json` and `transaction_logs.json`.
    pub data_dir: PathBuf,
    /// Shared-secret token; `None` disables auth (development mode).
    pub auth_token: Option<String>,
    /// Export store cap.
    pub max_exports: usize,
    /// Active transfer cap.
    pub max_active_transfers: usize,
    /// Tree broadcast rate-limit window.
    pub tree_broadcast_window: Duration,
    /// Validation verdict deadline.
    pub validation_timeout: Duration,
    /// Export staging wait deadline.
    pub export_store_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            port: 8440,
            data_dir: PathBuf::from("data"),
            auth_token: None,
            max_exports: 50,
            max_active_transfers: 100,
            tree_broadcast_window: Duration::from_millis(300),
            validation_timeout: Duration::from_millis(120_000),
            export_store_timeout: Duration::from_millis(10_000),
        }
    }
}

impl CoordinatorConfig {
    /// Build configuration from the environment, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: env_parse("STARLIFT_PORT", defaults.port),
            data_dir: std::env::var("STARLIFT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            auth_token: std::env::var("STARLIFT_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            max_exports: env_parse("STARLIFT_MAX_EXPORTS", defaults.max_exports),
            max_active_transfers: env_parse(
                "STARLIFT_MAX_ACTIVE_TRANSFERS",
                defaults.max_active_transfers,
            ),
            tree_broadcast_window: env_parse_ms(
                "STARLIFT_TREE_BROADCAST_MS",
                defaults.tree_broadcast_window,
            ),
            validation_timeout: env_parse_ms(
                "STARLIFT_VALIDATION_TIMEOUT_MS",
                defaults.validation_timeout,
            ),
            export_store_timeout: env_parse_ms(
                "STARLIFT_EXPORT_WAIT_MS",
                defaults.export_store_timeout,
            ),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_parse_ms(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.port, 8440);
        assert_eq!(config.max_exports, 50);
        assert_eq!(config.max_active_transfers, 100);
        assert_eq!(config.validation_timeout, Duration::from_millis(120_000));
        assert_eq!(config.export_store_timeout, Duration::from_millis(10_000));
        assert!(config.auth_token.is_none());
    }
}
