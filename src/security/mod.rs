//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming tenant request:
//!     → client.rs (derive client identity)
//!     → rate_limit.rs (count against the fixed window)
//!     → headers.rs (hardening + cache headers on the way out)
//! ```
//!
//! # Design Decisions
//! - One mutex for the limiter map, independent of the cache and the gate
//! - Clients without identity share one bucket, counted separately
//! - Over-limit warnings are throttled per client

pub mod client;
pub mod headers;
pub mod rate_limit;

pub use client::{client_id, UNKNOWN_CLIENT};
pub use rate_limit::{RateLimitOutcome, RateLimitStats, RateLimiter};
