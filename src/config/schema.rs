//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the edge gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// The single application process requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Host and path rules used by the decision state machine.
    pub routing: RoutingConfig,

    /// Tenant cache sizing and expiry.
    pub cache: CacheConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Backing-store admission control.
    pub admission: AdmissionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Seed data for the in-memory store.
    pub store: StoreConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Total time allowed for a forwarded request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Host classification and main-app path rules.
///
/// This is the only section that is hot-reloaded.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Root domain tenants live under (e.g. "example.com").
    pub root_domain: String,

    /// Subdomain that serves the dashboard itself.
    pub app_subdomain: String,

    /// Subdomains that never resolve to a tenant.
    pub reserved_subdomains: Vec<String>,

    /// Prefix tenant requests are rewritten under.
    pub tenant_path_prefix: String,

    /// Page rendered for unknown tenants.
    pub not_found_path: String,

    /// Page rendered when tenant resolution fails.
    pub error_path: String,

    pub sign_in_path: String,
    pub sign_up_path: String,

    /// Where signed-in users are sent from the auth pages.
    pub home_path: String,

    /// Auth-provider routes that are always passed through.
    pub auth_api_prefix: String,

    /// Prefix of the job-trigger API guarded by API keys.
    pub jobs_api_prefix: String,

    /// Static asset prefixes served without a session.
    pub public_prefixes: Vec<String>,

    /// Name of the session cookie.
    pub session_cookie: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            root_domain: "localhost".to_string(),
            app_subdomain: "app".to_string(),
            reserved_subdomains: vec!["www".to_string(), "app".to_string(), "api".to_string()],
            tenant_path_prefix: "/status-pages".to_string(),
            not_found_path: "/status-pages/not-found".to_string(),
            error_path: "/status-pages/error".to_string(),
            sign_in_path: "/sign-in".to_string(),
            sign_up_path: "/sign-up".to_string(),
            home_path: "/dashboard".to_string(),
            auth_api_prefix: "/api/auth".to_string(),
            jobs_api_prefix: "/api/jobs".to_string(),
            public_prefixes: vec!["/_next/".to_string(), "/favicon.ico".to_string()],
            session_cookie: "session_token".to_string(),
        }
    }
}

/// Tenant cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entry lifetime in seconds.
    pub ttl_secs: u64,

    /// Maximum number of entries.
    pub capacity: usize,

    /// Period of the expiry sweep in seconds.
    pub sweep_interval_secs: u64,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            capacity: 1000,
            sweep_interval_secs: 300,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Fixed window length in seconds.
    pub window_secs: u64,

    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// Minimum spacing of "rate limited" warnings per client, in seconds.
    pub warn_interval_secs: u64,

    /// Period of the expired-window purge in seconds.
    pub sweep_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn warn_interval(&self) -> Duration {
        Duration::from_secs(self.warn_interval_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            max_requests: 100,
            warn_interval_secs: 300,
            sweep_interval_secs: 300,
        }
    }
}

/// Admission control for backing-store lookups.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum lookups in flight at once.
    pub max_concurrent: usize,

    /// Per-lookup deadline in milliseconds.
    pub lookup_timeout_ms: u64,
}

impl AdmissionConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 10,
            lookup_timeout_ms: 5_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// In-memory store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Optional JSON file with tenants, API keys and sessions.
    pub seed_path: Option<String>,
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Attach security headers to tenant responses.
    pub enable_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_gateway_contract() {
        let config = GatewayConfig::default();
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.capacity, 1000);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.admission.max_concurrent, 10);
        assert_eq!(config.admission.lookup_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [routing]
            root_domain = "status.example.com"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.routing.root_domain, "status.example.com");
        assert_eq!(config.routing.app_subdomain, "app");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.cache.capacity, 1000);
    }
}
