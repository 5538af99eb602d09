//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check uniqueness of chain and connector ids
//! - Validate value ranges (timeouts > 0, non-empty endpoint lists)
//!
//! Returns all validation errors, not just the first.

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::AppConfig;
use crate::connector::ConnectorKind;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.chains.is_empty() {
        errors.push(ValidationError::new("chains", "at least one chain is required"));
    }

    let mut chain_ids = HashSet::new();
    for (i, chain) in config.chains.iter().enumerate() {
        if !chain_ids.insert(chain.id) {
            errors.push(ValidationError::new(
                format!("chains[{}].id", i),
                format!("duplicate chain id {}", chain.id),
            ));
        }
        if chain.rpc_urls.is_empty() {
            errors.push(ValidationError::new(
                format!("chains[{}].rpc_urls", i),
                "at least one RPC endpoint is required",
            ));
        }
    }

    if config.connectors.is_empty() {
        errors.push(ValidationError::new("connectors", "at least one connector is required"));
    }

    let mut connector_ids = HashSet::new();
    for (i, connector) in config.connectors.iter().enumerate() {
        if connector.id.trim().is_empty() {
            errors.push(ValidationError::new(format!("connectors[{}].id", i), "must not be empty"));
        }
        if !connector_ids.insert(connector.id.as_str()) {
            errors.push(ValidationError::new(
                format!("connectors[{}].id", i),
                format!("duplicate connector id '{}'", connector.id),
            ));
        }
        if connector.kind == ConnectorKind::RemoteSigner && connector.url.is_none() {
            errors.push(ValidationError::new(
                format!("connectors[{}].url", i),
                "remote_signer connectors require a url",
            ));
        }
    }

    let timeouts = [
        ("transport.probe_timeout_ms", config.transport.probe_timeout_ms),
        ("transport.request_timeout_secs", config.transport.request_timeout_secs),
        ("session.connect_timeout_secs", config.session.connect_timeout_secs),
        ("session.reconnect_timeout_secs", config.session.reconnect_timeout_secs),
        ("session.request_timeout_secs", config.session.request_timeout_secs),
    ];
    for (field, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }

    if config.transport.failure_threshold == 0 {
        errors.push(ValidationError::new("transport.failure_threshold", "must be at least 1"));
    }
    if config.session.reconnect_attempts == 0 {
        errors.push(ValidationError::new("session.reconnect_attempts", "must be at least 1"));
    }
    if config.session.event_buffer == 0 {
        errors.push(ValidationError::new("session.event_buffer", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
