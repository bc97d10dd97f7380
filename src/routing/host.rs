//! Host header classification.
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110), port ignored
//! - Only single-label subdomains of the root domain are tenants
//! - Hosts outside the root domain belong to the main app

use crate::config::RoutingConfig;

/// Which branch of the gateway a host belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostClass {
    MainApp,
    /// Normalized tenant subdomain.
    Tenant(String),
    /// Under the root domain but not a usable subdomain label.
    InvalidTenant,
}

/// Strip the port and lowercase a `Host` value.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        // IPv6 literal: keep the bracketed part.
        host.find(']').map_or(host, |end| &host[..=end])
    } else {
        host.rsplit_once(':').map_or(host, |(name, _)| name)
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}

/// Classify a `Host` header against the routing rules.
pub fn classify_host(host: &str, routing: &RoutingConfig) -> HostClass {
    let host = normalize_host(host);
    let root = routing.root_domain.trim().to_ascii_lowercase();

    if host == root {
        return HostClass::MainApp;
    }
    let Some(subdomain) = host.strip_suffix(&root).and_then(|s| s.strip_suffix('.')) else {
        return HostClass::MainApp;
    };

    if subdomain.eq_ignore_ascii_case(&routing.app_subdomain)
        || routing
            .reserved_subdomains
            .iter()
            .any(|r| r.eq_ignore_ascii_case(subdomain))
    {
        return HostClass::MainApp;
    }

    if is_valid_label(subdomain) {
        HostClass::Tenant(subdomain.to_string())
    } else {
        HostClass::InvalidTenant
    }
}

/// DNS label rules: 1-63 chars of `[a-z0-9-]`, no leading or trailing hyphen.
fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
