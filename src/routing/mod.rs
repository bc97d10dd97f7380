//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers, peer)
//!     → host.rs (main app | tenant label | invalid label)
//!     → paths.rs (main-app path class, tenant rewrite target)
//!     → gateway.rs (rate limit, cache, store, auth)
//!     → Return: Decision
//! ```
//!
//! # Design Decisions
//! - Routing rules live behind an `ArcSwap` and can be replaced at runtime
//! - No regex in the hot path (prefix and label checks only)
//! - Deciding never touches the response; `http` renders the decision

pub mod decision;
pub mod gateway;
pub mod host;
pub mod paths;

pub use decision::{Decision, Rejection, Surface};
pub use gateway::{Branch, Gateway, RequestInfo, Stores};
pub use host::{classify_host, normalize_host, HostClass};
pub use paths::{classify_path, tenant_path, MainAppRoute};
