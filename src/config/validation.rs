//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (interval > 0, ports valid)
//! - Check URLs and socket addresses parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::AppConfig;
use crate::manager::identity::RolloutStrategy;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.manager.check_interval_secs == 0 {
        errors.push(ValidationError::new(
            "manager.check_interval_secs",
            "must be greater than zero",
        ));
    }

    if let Some(strategy) = &config.manager.rollout_strategy {
        if !strategy.is_empty() && strategy.parse::<RolloutStrategy>().is_err() {
            errors.push(ValidationError::new(
                "manager.rollout_strategy",
                format!("'{}' must be either \"managed\" or \"fixed\"", strategy),
            ));
        }
    }

    if let Err(e) = Url::parse(&config.service_management.url) {
        errors.push(ValidationError::new(
            "service_management.url",
            format!("invalid URL '{}': {}", config.service_management.url, e),
        ));
    }

    if !config.metadata.non_gcp {
        if let Err(e) = Url::parse(&config.metadata.url) {
            errors.push(ValidationError::new(
                "metadata.url",
                format!("invalid URL '{}': {}", config.metadata.url, e),
            ));
        }
    }

    if config.generator.node.is_empty() {
        errors.push(ValidationError::new("generator.node", "must not be empty"));
    }

    if config.generator.listener_port == 0 {
        errors.push(ValidationError::new(
            "generator.listener_port",
            "must be a non-zero port",
        ));
    }

    if Url::parse(&format!("http://{}", config.generator.backend_address))
        .ok()
        .and_then(|u| u.port())
        .is_none()
    {
        errors.push(ValidationError::new(
            "generator.backend_address",
            format!("'{}' must be host:port", config.generator.backend_address),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("invalid socket address '{}'", config.admin.bind_address),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
