//! Configuration validation.
//!
//! Semantic checks run after deserialization and env overlay. Every
//! violation is reported, not just the first.

use std::net::SocketAddr;

use axum::http::HeaderValue;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{field} must be at least 1 second")]
    DurationTooShort { field: &'static str },

    #[error("bind address {0:?} is not a valid socket address")]
    BindAddress(String),

    #[error("max_connections must be greater than zero")]
    ZeroConnections,

    #[error("root domain {0:?} must be a bare domain name")]
    RootDomain(String),

    #[error("domain source url {url:?} is invalid: {reason}")]
    SourceUrl { url: String, reason: String },

    #[error("server header {0:?} is not a valid header value")]
    ServerHeader(String),

    #[error("metrics address {0:?} is not a valid socket address")]
    MetricsAddress(String),
}

/// Validate a fully assembled configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    let root = &config.routing.root_domain;
    if root.is_empty() {
        errors.push(ValidationError::Missing("root domain"));
    } else if root.contains("://") || root.contains('/') || root.starts_with('.') || root.ends_with('.') {
        errors.push(ValidationError::RootDomain(root.clone()));
    }

    let source = &config.domain_source.url;
    if source.is_empty() {
        errors.push(ValidationError::Missing("domain source url"));
    } else {
        match Url::parse(source) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(url) => errors.push(ValidationError::SourceUrl {
                url: source.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::SourceUrl {
                url: source.clone(),
                reason: e.to_string(),
            }),
        }
    }

    let durations = [
        ("refresh interval", config.domain_source.refresh_interval_secs),
        ("shutdown timeout", config.timeouts.shutdown_secs),
        ("read timeout", config.timeouts.read_secs),
        ("request timeout", config.timeouts.request_secs),
    ];
    for (field, secs) in durations {
        if secs < 1 {
            errors.push(ValidationError::DurationTooShort { field });
        }
    }

    if HeaderValue::from_str(&config.routing.server_header).is_err() {
        errors.push(ValidationError::ServerHeader(config.routing.server_header.clone()));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::MetricsAddress(addr.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.routing.root_domain = "example.com".into();
        config.domain_source.url = "http://registry.internal/domains".into();
        config
    }

    #[test]
    fn accepts_minimal_config() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn reports_every_missing_value() {
        let errors = validate_config(&ProxyConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::Missing("root domain")));
        assert!(errors.contains(&ValidationError::Missing("domain source url")));
    }

    #[test]
    fn rejects_sub_second_durations() {
        let mut config = valid();
        config.domain_source.refresh_interval_secs = 0;
        config.timeouts.shutdown_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::DurationTooShort { field: "refresh interval" },
                ValidationError::DurationTooShort { field: "shutdown timeout" },
            ]
        );
    }

    #[test]
    fn rejects_scheme_in_root_domain() {
        let mut config = valid();
        config.routing.root_domain = "https://example.com".into();
        assert!(matches!(
            validate_config(&config).unwrap_err()[0],
            ValidationError::RootDomain(_)
        ));
    }

    #[test]
    fn rejects_non_http_source() {
        let mut config = valid();
        config.domain_source.url = "ftp://registry.internal/domains".into();
        assert!(matches!(
            validate_config(&config).unwrap_err()[0],
            ValidationError::SourceUrl { .. }
        ));

        config.domain_source.url = "not a url".into();
        assert!(matches!(
            validate_config(&config).unwrap_err()[0],
            ValidationError::SourceUrl { .. }
        ));
    }

    #[test]
    fn rejects_bad_bind_and_metrics_addresses() {
        let mut config = valid();
        config.listener.bind_address = ":80".into();
        config.observability.metrics_address = Some("nowhere".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ValidationError::BindAddress(_)));
        assert!(matches!(errors[1], ValidationError::MetricsAddress(_)));
    }
}
