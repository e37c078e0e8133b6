//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var} ('{value}'): {reason}")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub const ENV_PORT: &str = "PORT";
pub const ENV_MONOLITH_URL: &str = "MONOLITH_URL";
pub const ENV_MOVIES_SERVICE_URL: &str = "MOVIES_SERVICE_URL";
pub const ENV_GRADUAL_MIGRATION: &str = "GRADUAL_MIGRATION";
pub const ENV_MOVIES_MIGRATION_PERCENT: &str = "MOVIES_MIGRATION_PERCENT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_METRICS_ADDRESS: &str = "METRICS_ADDRESS";

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with<F>(path: Option<&Path>, env: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overwrite fields for every variable present in the environment.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = env(ENV_PORT) {
        config.listener.port = value.trim().parse().map_err(|e: std::num::ParseIntError| {
            invalid(ENV_PORT, &value, e.to_string())
        })?;
    }

    if let Some(value) = env(ENV_MONOLITH_URL) {
        config.migration.monolith_url = parse_url(ENV_MONOLITH_URL, &value)?;
    }

    if let Some(value) = env(ENV_MOVIES_SERVICE_URL) {
        config.migration.movies_service_url = parse_url(ENV_MOVIES_SERVICE_URL, &value)?;
    }

    if let Some(value) = env(ENV_GRADUAL_MIGRATION) {
        // Only "true" enables the split; anything else pins to the monolith.
        config.migration.gradual_migration = value.trim().eq_ignore_ascii_case("true");
    }

    if let Some(value) = env(ENV_MOVIES_MIGRATION_PERCENT) {
        config.migration.movies_migration_percent =
            value.trim().parse().map_err(|e: std::num::ParseIntError| {
                invalid(ENV_MOVIES_MIGRATION_PERCENT, &value, e.to_string())
            })?;
    }

    if let Some(value) = env(ENV_LOG_LEVEL) {
        config.observability.log_level = value;
    }

    if let Some(value) = env(ENV_METRICS_ADDRESS) {
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = value;
    }

    Ok(())
}

fn parse_url(var: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|e| invalid(var, value, e.to_string()))
}

fn invalid(var: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = load_config_with(None, env_from(&[])).unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn environment_overrides_every_documented_variable() {
        let config = load_config_with(
            None,
            env_from(&[
                ("PORT", "9000"),
                ("MONOLITH_URL", "http://legacy.internal:8080"),
                ("MOVIES_SERVICE_URL", "https://movies.internal"),
                ("GRADUAL_MIGRATION", "TRUE"),
                ("MOVIES_MIGRATION_PERCENT", "25"),
                ("LOG_LEVEL", "debug"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.migration.monolith_url.as_str(), "http://legacy.internal:8080/");
        assert_eq!(config.migration.movies_service_url.as_str(), "https://movies.internal/");
        assert!(config.migration.gradual_migration);
        assert_eq!(config.migration.movies_migration_percent, 25);
        assert_eq!(config.observability.log_level, "debug");
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn gradual_migration_is_true_only_for_true() {
        for (raw, expected) in [("true", true), ("True", true), ("false", false), ("1", false), ("yes", false)] {
            let config =
                load_config_with(None, env_from(&[("GRADUAL_MIGRATION", raw)])).unwrap();
            assert_eq!(config.migration.gradual_migration, expected, "GRADUAL_MIGRATION={raw}");
        }
    }

    #[test]
    fn out_of_range_percent_is_kept_verbatim() {
        let config =
            load_config_with(None, env_from(&[("MOVIES_MIGRATION_PERCENT", "150")])).unwrap();
        assert_eq!(config.migration.movies_migration_percent, 150);
        assert_eq!(config.migration.effective_percent(), 100);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = load_config_with(None, env_from(&[("MOVIES_MIGRATION_PERCENT", "ten")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { var: "MOVIES_MIGRATION_PERCENT", .. }
        ));

        let err = load_config_with(None, env_from(&[("MONOLITH_URL", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "MONOLITH_URL", .. }));

        let err = load_config_with(None, env_from(&[("PORT", "70000")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PORT", .. }));
    }

    #[test]
    fn non_http_backend_fails_validation() {
        let err = load_config_with(None, env_from(&[("MOVIES_SERVICE_URL", "ftp://movies")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("migration.movies_service_url"));
    }

    #[test]
    fn metrics_address_enables_exporter() {
        let config =
            load_config_with(None, env_from(&[("METRICS_ADDRESS", "127.0.0.1:9100")])).unwrap();
        assert!(config.observability.metrics_enabled);
        assert_eq!(config.observability.metrics_address, "127.0.0.1:9100");
    }

    #[test]
    fn environment_wins_over_file() {
        let path = std::env::temp_dir().join(format!(
            "strangler-gateway-config-{}.toml",
            std::process::id()
        ));
        fs::write(
            &path,
            r#"
            [listener]
            port = 7000

            [migration]
            monolith_url = "http://file-monolith:8080"
            movies_migration_percent = 10
            "#,
        )
        .unwrap();

        let config = load_config_with(
            Some(&path),
            env_from(&[("MOVIES_MIGRATION_PERCENT", "60")]),
        )
        .unwrap();
        fs::remove_file(&path).unwrap_or_default();

        assert_eq!(config.listener.port, 7000);
        assert_eq!(config.migration.monolith_url.as_str(), "http://file-monolith:8080/");
        assert_eq!(config.migration.movies_migration_percent, 60);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_config_with(
            Some(Path::new("/definitely/not/here/gateway.toml")),
            env_from(&[]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
