//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the routing section
//! ```
//!
//! # Design Decisions
//! - Sizing (cache capacity, limiter window, gate permits) is fixed at startup
//! - Only host/path routing rules are hot-reloaded
//! - All fields have defaults to allow minimal configs

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdmissionConfig, AdminConfig, CacheConfig, GatewayConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, RateLimitConfig, RoutingConfig, SecurityConfig, StoreConfig,
    UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
