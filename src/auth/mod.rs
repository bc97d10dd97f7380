//! Edge authorization.
//!
//! # Data Flow
//! ```text
//! Main-app request:
//!     → session.rs (cookie → session store) for dashboard pages and APIs
//!     → api_key.rs (bearer token → key store) for job-trigger APIs
//! ```
//!
//! # Design Decisions
//! - API-key rejections are granular so integrators can tell what is wrong
//! - Only an 8-character prefix of an unknown key is ever logged
//! - Last-used updates run detached and never affect the response

pub mod api_key;
pub mod session;

pub use api_key::{ApiKeyAuth, ApiKeyError, ApiKeyRejection};
pub use session::{read_session, session_token};
