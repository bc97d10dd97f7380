//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Backing-store lookup:
//!     → admission.rs try_acquire (fail fast when all permits are out)
//!     → admission.rs with_timeout (lookup raced against the deadline)
//!     → permit dropped as soon as the raw result is known
//! ```
//!
//! # Design Decisions
//! - Reject rather than queue: latency never balloons behind a slow store
//! - Timeouts are non-negotiable; every store call has a deadline
//! - A timed-out lookup is dropped, which cancels it

pub mod admission;

pub use admission::{AdmissionGate, AdmissionStats, LookupPermit};
