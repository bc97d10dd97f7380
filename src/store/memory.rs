//! In-memory store, optionally seeded from a JSON file.
//!
//! Serves local development and tests; production deployments plug the
//! relational store in behind the same traits.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;

use crate::error::{unix_now, StoreResult};
use crate::store::{ApiKeyRecord, ApiKeyStore, Session, SessionStore, TenantRecord, TenantStore};

#[derive(Debug, Deserialize)]
struct ApiKeySeed {
    token: String,
    #[serde(flatten)]
    record: ApiKeyRecord,
}

#[derive(Debug, Deserialize)]
struct SessionSeed {
    token: String,
    #[serde(flatten)]
    session: Session,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Seed {
    tenants: Vec<TenantRecord>,
    api_keys: Vec<ApiKeySeed>,
    sessions: Vec<SessionSeed>,
}

/// Thread-safe store backed by concurrent maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tenants: Arc<DashMap<String, TenantRecord>>,
    api_keys: Arc<DashMap<String, ApiKeyRecord>>,
    sessions: Arc<DashMap<String, Session>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load tenants, keys and sessions from a JSON seed file.
    pub fn load_from_file(path: &Path) -> std::io::Result<Self> {
        let store = Self::new();
        let reader = BufReader::new(File::open(path)?);
        let seed: Seed = serde_json::from_reader(reader)?;

        for tenant in seed.tenants {
            store.insert_tenant(tenant);
        }
        for key in seed.api_keys {
            store.insert_api_key(key.token, key.record);
        }
        for session in seed.sessions {
            store.insert_session(session.token, session.session);
        }

        tracing::info!(
            tenants = store.tenants.len(),
            api_keys = store.api_keys.len(),
            sessions = store.sessions.len(),
            "Loaded store seed"
        );
        Ok(store)
    }

    pub fn insert_tenant(&self, tenant: TenantRecord) {
        self.tenants.insert(tenant.subdomain.trim().to_lowercase(), tenant);
    }

    pub fn insert_api_key(&self, token: impl Into<String>, record: ApiKeyRecord) {
        self.api_keys.insert(token.into(), record);
    }

    pub fn insert_session(&self, token: impl Into<String>, session: Session) {
        self.sessions.insert(token.into(), session);
    }

    /// Last-used timestamp of a key, by key id.
    pub fn api_key_last_used(&self, id: &str) -> Option<u64> {
        self.api_keys
            .iter()
            .find(|r| r.value().id == id)
            .and_then(|r| r.value().last_used_at)
    }
}

#[async_trait]
impl TenantStore for MemoryStore {
    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<TenantRecord>> {
        Ok(self.tenants.get(subdomain).map(|r| r.value().clone()))
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn find_api_key(&self, token: &str) -> StoreResult<Option<ApiKeyRecord>> {
        Ok(self.api_keys.get(token).map(|r| r.value().clone()))
    }

    async fn touch_api_key_last_used(&self, id: &str) -> StoreResult<()> {
        let now = unix_now();
        for mut entry in self.api_keys.iter_mut() {
            if entry.value().id == id {
                entry.value_mut().last_used_at = Some(now);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn read_session(&self, token: &str) -> StoreResult<Option<Session>> {
        Ok(self.sessions.get(token).map(|r| r.value().clone()))
    }
}
