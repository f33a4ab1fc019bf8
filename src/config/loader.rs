//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{LogFormat, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{key}: {reason}")]
    Env { key: &'static str, reason: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: defaults, then the optional TOML file, then the
/// process environment. The result is validated.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, std::env::vars())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment-style key/value pairs onto `config`.
///
/// Unknown keys are ignored. Durations are whole seconds.
pub fn apply_env<I, K, V>(config: &mut ProxyConfig, vars: I) -> Result<(), ConfigError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut port = None;
    let mut listen_address = None;

    for (key, value) in vars {
        let value = value.into();
        match key.as_ref() {
            "PORT" => port = Some(value),
            "LISTEN_ADDRESS" => listen_address = Some(value),
            "DOMAIN" => config.routing.root_domain = value,
            "ENDPOINT" => config.domain_source.url = value,
            "FORCE_TLS" => config.routing.force_secure_redirect = parse_bool("FORCE_TLS", &value)?,
            "FETCH_ON_STARTUP" => {
                config.domain_source.fetch_on_startup = parse_bool("FETCH_ON_STARTUP", &value)?
            }
            "READ_TIMEOUT" => config.timeouts.read_secs = parse_secs("READ_TIMEOUT", &value)?,
            "WRITE_TIMEOUT" => config.timeouts.request_secs = parse_secs("WRITE_TIMEOUT", &value)?,
            "SHUTDOWN_TIMEOUT" => {
                config.timeouts.shutdown_secs = parse_secs("SHUTDOWN_TIMEOUT", &value)?
            }
            "REFRESH_INTERVAL" => {
                config.domain_source.refresh_interval_secs = parse_secs("REFRESH_INTERVAL", &value)?
            }
            "SERVER_HEADER" => config.routing.server_header = value,
            "LOG_LEVEL" => config.observability.log_level = value,
            "LOG_FORMAT" => {
                config.observability.log_format = match value.as_str() {
                    "text" => LogFormat::Text,
                    "json" => LogFormat::Json,
                    _ => {
                        return Err(ConfigError::Env {
                            key: "LOG_FORMAT",
                            reason: format!("expected \"text\" or \"json\", got {value:?}"),
                        })
                    }
                }
            }
            "METRICS_ADDRESS" => config.observability.metrics_address = Some(value),
            _ => {}
        }
    }

    // An explicit address wins over a bare port regardless of iteration order.
    if let Some(address) = listen_address {
        config.listener.bind_address = address;
    } else if let Some(port) = port {
        let port: u16 = port.parse().map_err(|e| ConfigError::Env {
            key: "PORT",
            reason: format!("must be a port number: {e}"),
        })?;
        config.listener.bind_address = format!("0.0.0.0:{port}");
    }

    Ok(())
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
        _ => Err(ConfigError::Env {
            key,
            reason: format!("must be a boolean, got {value:?}"),
        }),
    }
}

fn parse_secs(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse().map_err(|e| ConfigError::Env {
        key,
        reason: format!("must be a whole number of seconds: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        let mut config = ProxyConfig::default();
        apply_env(
            &mut config,
            [
                ("PORT", "8080"),
                ("DOMAIN", "example.com"),
                ("ENDPOINT", "http://registry.internal/domains"),
                ("FORCE_TLS", "True"),
                ("REFRESH_INTERVAL", "30"),
                ("SHUTDOWN_TIMEOUT", "3"),
                ("HOME", "/root"),
            ],
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.routing.root_domain, "example.com");
        assert_eq!(config.domain_source.url, "http://registry.internal/domains");
        assert!(config.routing.force_secure_redirect);
        assert_eq!(config.domain_source.refresh_interval_secs, 30);
        assert_eq!(config.timeouts.shutdown_secs, 3);
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn listen_address_beats_port() {
        let mut config = ProxyConfig::default();
        apply_env(
            &mut config,
            [("LISTEN_ADDRESS", "127.0.0.1:9000"), ("PORT", "8080")],
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn rejects_malformed_values() {
        let mut config = ProxyConfig::default();

        let err = apply_env(&mut config, [("FORCE_TLS", "yes")]).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "FORCE_TLS", .. }));

        let err = apply_env(&mut config, [("REFRESH_INTERVAL", "5s")]).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "REFRESH_INTERVAL", .. }));

        let err = apply_env(&mut config, [("PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Env { key: "PORT", .. }));
    }

    #[test]
    fn out_of_range_interval_fails_validation() {
        let mut config = ProxyConfig::default();
        apply_env(
            &mut config,
            [
                ("DOMAIN", "example.com"),
                ("ENDPOINT", "http://registry.internal/domains"),
                ("REFRESH_INTERVAL", "0"),
            ],
        )
        .unwrap();

        let errors = validate_config(&config).unwrap_err();
        let message = ConfigError::Validation(errors).to_string();
        assert_eq!(message, "Validation failed: refresh interval must be at least 1 second");
    }
}
