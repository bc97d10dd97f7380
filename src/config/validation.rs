//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges, address formats
//! and path shapes. Every problem is reported, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must start with '/': {value}")]
    InvalidPath { field: &'static str, value: String },

    #[error("routing.tenant_path_prefix must not end with '/'")]
    TrailingSlash,

    #[error("routing.root_domain must not be empty")]
    EmptyRootDomain,

    #[error("admin.api_key must be at least 16 characters when admin is enabled")]
    WeakAdminKey,
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let non_zero: [(&'static str, u64); 10] = [
        ("listener.max_connections", config.listener.max_connections as u64),
        ("cache.ttl_secs", config.cache.ttl_secs),
        ("cache.capacity", config.cache.capacity as u64),
        ("cache.sweep_interval_secs", config.cache.sweep_interval_secs),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("rate_limit.max_requests", config.rate_limit.max_requests as u64),
        ("rate_limit.sweep_interval_secs", config.rate_limit.sweep_interval_secs),
        ("admission.max_concurrent", config.admission.max_concurrent as u64),
        ("admission.lookup_timeout_ms", config.admission.lookup_timeout_ms),
        ("upstream.request_timeout_secs", config.upstream.request_timeout_secs),
    ];
    for (field, value) in non_zero {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_address(&mut errors, "upstream.address", &config.upstream.address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.len() < 16 {
            errors.push(ValidationError::WeakAdminKey);
        }
    }

    let routing = &config.routing;
    if routing.root_domain.trim().is_empty() {
        errors.push(ValidationError::EmptyRootDomain);
    }
    let paths: [(&'static str, &str); 8] = [
        ("routing.tenant_path_prefix", &routing.tenant_path_prefix),
        ("routing.not_found_path", &routing.not_found_path),
        ("routing.error_path", &routing.error_path),
        ("routing.sign_in_path", &routing.sign_in_path),
        ("routing.sign_up_path", &routing.sign_up_path),
        ("routing.home_path", &routing.home_path),
        ("routing.auth_api_prefix", &routing.auth_api_prefix),
        ("routing.jobs_api_prefix", &routing.jobs_api_prefix),
    ];
    for (field, value) in paths {
        if !value.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                field,
                value: value.to_string(),
            });
        }
    }
    for prefix in &routing.public_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPath {
                field: "routing.public_prefixes",
                value: prefix.clone(),
            });
        }
    }
    if routing.tenant_path_prefix.len() > 1 && routing.tenant_path_prefix.ends_with('/') {
        errors.push(ValidationError::TrailingSlash);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
