//! Tenant resolution cache.
//!
//! # Data Flow
//! ```text
//! Tenant request (subdomain)
//!     → tenant.rs get (expired entries dropped lazily)
//!     → hit: decision made without touching the store
//!     → miss: store lookup → tenant.rs set (evict lowest access count at capacity)
//!
//! Maintenance timer:
//!     → tenant.rs sweep (drop every expired entry)
//! ```
//!
//! # Design Decisions
//! - One mutex per cache; capacity check, eviction and insert are one critical section
//! - Negative results are cached like positive ones
//! - Keys are normalized (trimmed, lowercase) on every call

pub mod tenant;

pub use tenant::{CacheEntry, CacheStats, LookupStatus, TenantCache};
