//! Edge request gateway for a multi-tenant status-page service.
//!
//! Classifies each request by host, resolves tenant subdomains through a
//! bounded cache and an admission-controlled backing store, applies
//! per-client rate limiting and session or API-key authorization, and then
//! forwards to the application or answers directly.

pub mod admin;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod store;

pub use config::GatewayConfig;
pub use error::{ErrorKind, StoreError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Decision, Gateway, Stores};
