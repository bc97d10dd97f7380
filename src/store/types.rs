//! Records returned by the store collaborators.

use serde::{Deserialize, Serialize};

use crate::error::unix_now;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    #[default]
    Active,
    Disabled,
}

/// A status page owner reachable on its own subdomain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: String,
    pub subdomain: String,
    #[serde(default)]
    pub status: TenantStatus,
}

impl TenantRecord {
    pub fn is_active(&self) -> bool {
        self.status == TenantStatus::Active
    }
}

/// An API key as stored. The secret itself is never part of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Unix seconds; `None` never expires.
    #[serde(default)]
    pub expires_at: Option<u64>,
    /// Job the key may trigger; `None` means the key is bound to no job.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub last_used_at: Option<u64>,
}

fn default_enabled() -> bool {
    true
}

impl ApiKeyRecord {
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// A signed-in dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl Session {
    pub fn is_active_at(&self, now: u64) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_expiry() {
        let mut key = ApiKeyRecord {
            id: "k1".into(),
            name: "ci".into(),
            enabled: true,
            expires_at: None,
            job_id: None,
            last_used_at: None,
        };
        assert!(!key.is_expired_at(1_000));
        key.expires_at = Some(999);
        assert!(key.is_expired_at(1_000));
        key.expires_at = Some(1_001);
        assert!(!key.is_expired_at(1_000));
    }

    #[test]
    fn test_record_defaults() {
        let key: ApiKeyRecord = serde_json::from_str(r#"{"id":"k1","name":"ci"}"#).unwrap();
        assert!(key.enabled);
        let tenant: TenantRecord = serde_json::from_str(r#"{"id":"t1","subdomain":"acme"}"#).unwrap();
        assert!(tenant.is_active());
    }
}
