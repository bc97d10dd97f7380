//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, host extraction)
//!     → routing::Gateway (decision)
//!     → response.rs (render decision: respond or forward plan)
//!     → server.rs (forward to upstream, apply plan)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{request_host, RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use response::{render, Action, ForwardPlan};
pub use server::{HttpServer, ServerError};
