//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server, admin listener, maintenance stop
//!
//! Maintenance (maintenance.rs):
//!     cache sweep tick ─┐
//!     limiter GC tick  ─┴→ run until shutdown
//! ```
//!
//! # Design Decisions
//! - Cache expiry and rate-limiter GC run on independent timers
//! - Shutdown is a broadcast; every long-running task subscribes

pub mod maintenance;
pub mod shutdown;
pub mod signals;

pub use maintenance::Maintenance;
pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
