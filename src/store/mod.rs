//! Backing-store collaborators.
//!
//! The gateway only needs key/value style reads from the application's
//! database and session cache. Each concern is a trait so the relational
//! store, a session cache, or test doubles can be plugged in.
//!
//! # Design Decisions
//! - Lookups return `Ok(None)` for absence and `Err` only for store failures
//! - Timestamps are unix seconds

pub mod memory;
pub mod types;

use async_trait::async_trait;

use crate::error::StoreResult;
pub use memory::MemoryStore;
pub use types::{ApiKeyRecord, Session, TenantRecord, TenantStatus};

/// Tenant resolution by subdomain.
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<TenantRecord>>;
}

/// API keys used by automation endpoints.
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Exact match on the presented token.
    async fn find_api_key(&self, token: &str) -> StoreResult<Option<ApiKeyRecord>>;

    async fn touch_api_key_last_used(&self, id: &str) -> StoreResult<()>;
}

/// Dashboard sessions keyed by cookie value.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn read_session(&self, token: &str) -> StoreResult<Option<Session>>;
}
