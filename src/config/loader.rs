//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },

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

/// Listen port.
pub const ENV_PORT: &str = "PORT";
/// Rate-limit window length in seconds.
pub const ENV_WINDOW_SECS: &str = "RATE_LIMIT_WINDOW_SECS";
/// Requests per window.
pub const ENV_MAX_REQUESTS: &str = "RATE_LIMIT_MAX_REQUESTS";
/// Token signing secret.
pub const ENV_SIGNING_SECRET: &str = "SIGNING_SECRET";
/// Older deployments name the signing secret this way (case-sensitive).
pub const ENV_LEGACY_SIGNING_SECRET: &str = "AccessKey";
/// Log level fallback when `RUST_LOG` is unset.
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated before it is returned.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_file(path)?,
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn parse_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = parse_var(&lookup, ENV_PORT)? {
        config.listener.port = port;
    }
    if let Some(window) = parse_var(&lookup, ENV_WINDOW_SECS)? {
        config.rate_limit.window_secs = window;
    }
    if let Some(max) = parse_var(&lookup, ENV_MAX_REQUESTS)? {
        config.rate_limit.max_requests = max;
    }

    let secret = lookup(ENV_SIGNING_SECRET).or_else(|| lookup(ENV_LEGACY_SIGNING_SECRET));
    if let Some(secret) = secret {
        config.auth.signing_secret = secret;
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }

    Ok(())
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("PORT", "9000"),
                ("RATE_LIMIT_WINDOW_SECS", "60"),
                ("RATE_LIMIT_MAX_REQUESTS", "5"),
                ("SIGNING_SECRET", "0123456789abcdef"),
            ]),
        )
        .unwrap();

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.auth.signing_secret, "0123456789abcdef");
    }

    #[test]
    fn test_legacy_secret_name() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, env(&[("AccessKey", "legacy-secret-value")])).unwrap();
        assert_eq!(config.auth.signing_secret, "legacy-secret-value");

        // Only the exact legacy spelling is read.
        let mut upper = GatewayConfig::default();
        apply_env_overrides(&mut upper, env(&[("ACCESS_KEY", "wrong-spelling")])).unwrap();
        assert_eq!(upper.auth.signing_secret, "");

        // The new name wins when both are set.
        apply_env_overrides(
            &mut config,
            env(&[("AccessKey", "legacy"), ("SIGNING_SECRET", "current")]),
        )
        .unwrap();
        assert_eq!(config.auth.signing_secret, "current");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut config = GatewayConfig::default();
        let err = apply_env_overrides(&mut config, env(&[("RATE_LIMIT_MAX_REQUESTS", "lots")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv { var: "RATE_LIMIT_MAX_REQUESTS", .. }
        ));
    }

    #[test]
    fn test_parse_toml_sections() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [rate_limit]
            window_secs = 30
            max_requests = 3

            [cors]
            allowed_origins = ["https://shop.example"]
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.window_secs, 30);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.cors.allowed_origins, vec!["https://shop.example"]);
        // Untouched sections keep their defaults.
        assert_eq!(config.listener.port, 8080);
    }
}
