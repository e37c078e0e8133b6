//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files;
//! environment overrides are applied on top by `loader.rs`.

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind host, port).
    pub listener: ListenerConfig,

    /// Monolith / movies-service traffic split.
    pub migration: MigrationConfig,

    /// Upstream timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Inbound request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Listen port.
    pub port: u16,
}

impl ListenerConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Backend base URLs and the migration split.
///
/// Immutable once the gateway starts. `movies_migration_percent` is kept
/// exactly as configured; the selector clamps it when it is evaluated.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MigrationConfig {
    /// Legacy backend base URL.
    pub monolith_url: Url,

    /// Replacement backend base URL.
    pub movies_service_url: Url,

    /// When false every request goes to the monolith.
    pub gradual_migration: bool,

    /// Share of traffic (in percent) routed to the movies service.
    pub movies_migration_percent: i64,
}

impl MigrationConfig {
    /// Percent clamped into `[0, 100]`.
    pub fn effective_percent(&self) -> u32 {
        self.movies_migration_percent.clamp(0, 100) as u32
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            monolith_url: Url::parse(DEFAULT_MONOLITH_URL).expect("default monolith URL is valid"),
            movies_service_url: Url::parse(DEFAULT_MOVIES_SERVICE_URL)
                .expect("default movies service URL is valid"),
            gradual_migration: true,
            movies_migration_percent: 0,
        }
    }
}

pub const DEFAULT_MONOLITH_URL: &str = "http://monolith:8080";
pub const DEFAULT_MOVIES_SERVICE_URL: &str = "http://movies-service:8081";

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time for the upstream exchange (including the body) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 10,
        }
    }
}

/// Inbound request limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes buffered for forwarding.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.listener.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.migration.monolith_url.as_str(), "http://monolith:8080/");
        assert_eq!(config.migration.movies_service_url.as_str(), "http://movies-service:8081/");
        assert!(config.migration.gradual_migration);
        assert_eq!(config.migration.movies_migration_percent, 0);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.timeouts.request_secs, 10);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn effective_percent_clamps() {
        let mut migration = MigrationConfig::default();

        migration.movies_migration_percent = -5;
        assert_eq!(migration.effective_percent(), 0);

        migration.movies_migration_percent = 250;
        assert_eq!(migration.effective_percent(), 100);

        migration.movies_migration_percent = 37;
        assert_eq!(migration.effective_percent(), 37);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [migration]
            movies_migration_percent = 40

            [timeouts]
            request_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.migration.movies_migration_percent, 40);
        assert!(config.migration.gradual_migration);
        assert_eq!(config.timeouts.request_secs, 3);
        assert_eq!(config.timeouts.connect_secs, 5);
        assert_eq!(config.listener.port, 8000);
    }
}
