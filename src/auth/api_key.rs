//! API-key authorization for job-trigger endpoints.
//!
//! # Policy
//! 1. Bearer token required
//! 2. Token (trimmed) at least 10 characters
//! 3. Exact-match lookup; unknown keys log only an 8-character prefix
//! 4. Key enabled and not expired
//! 5. Key bound to the job id in the path, when the path names one
//! 6. Last-used timestamp updated in the background

use std::sync::Arc;
use axum::http::{header, HeaderMap, StatusCode};
use thiserror::Error;

use crate::error::{unix_now, StoreError};
use crate::observability::metrics;
use crate::resilience::AdmissionGate;
use crate::store::{ApiKeyRecord, ApiKeyStore};

const MIN_TOKEN_LEN: usize = 10;
const LOGGED_PREFIX_LEN: usize = 8;

/// Why a presented key was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiKeyRejection {
    #[error("API key required")]
    Missing,

    #[error("API key must be at least 10 characters long")]
    InvalidFormat,

    #[error("Invalid API key")]
    Unknown,

    #[error("API key is disabled")]
    Disabled,

    #[error("API key has expired")]
    Expired,

    #[error("API key is not authorized for the requested job")]
    WrongJob,
}

impl ApiKeyRejection {
    pub fn status(self) -> StatusCode {
        match self {
            ApiKeyRejection::WrongJob => StatusCode::FORBIDDEN,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    /// Metric label.
    pub fn reason(self) -> &'static str {
        match self {
            ApiKeyRejection::Missing => "missing",
            ApiKeyRejection::InvalidFormat => "invalid_format",
            ApiKeyRejection::Unknown => "unknown",
            ApiKeyRejection::Disabled => "disabled",
            ApiKeyRejection::Expired => "expired",
            ApiKeyRejection::WrongJob => "wrong_job",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiKeyError {
    #[error(transparent)]
    Rejected(#[from] ApiKeyRejection),

    /// The key could not be checked at all.
    #[error("API key lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

fn redacted(token: &str) -> String {
    token.chars().take(LOGGED_PREFIX_LEN).collect()
}

/// Applies the API-key policy against a key store.
#[derive(Clone)]
pub struct ApiKeyAuth {
    store: Arc<dyn ApiKeyStore>,
    gate: Arc<AdmissionGate>,
}

impl ApiKeyAuth {
    pub fn new(store: Arc<dyn ApiKeyStore>, gate: Arc<AdmissionGate>) -> Self {
        Self { store, gate }
    }

    /// Authorize a job-trigger request.
    ///
    /// `job_id` is the job named by the request path, if any.
    pub async fn authorize(
        &self,
        headers: &HeaderMap,
        job_id: Option<&str>,
    ) -> Result<ApiKeyRecord, ApiKeyError> {
        let result = self.check(headers, job_id).await;
        if let Err(ApiKeyError::Rejected(rejection)) = &result {
            metrics::record_api_key_rejection(rejection.reason());
        }
        result
    }

    async fn check(&self, headers: &HeaderMap, job_id: Option<&str>) -> Result<ApiKeyRecord, ApiKeyError> {
        let token = bearer_token(headers)
            .filter(|t| !t.is_empty())
            .ok_or(ApiKeyRejection::Missing)?;

        if token.len() < MIN_TOKEN_LEN {
            return Err(ApiKeyRejection::InvalidFormat.into());
        }

        let store = self.store.clone();
        let record = self
            .gate
            .run(async move { store.find_api_key(token).await })
            .await?;

        let Some(record) = record else {
            tracing::warn!(key_prefix = %redacted(token), "Unknown API key presented");
            return Err(ApiKeyRejection::Unknown.into());
        };

        if !record.enabled {
            tracing::warn!(key_id = %record.id, "Disabled API key presented");
            return Err(ApiKeyRejection::Disabled.into());
        }
        if record.is_expired_at(unix_now()) {
            tracing::warn!(key_id = %record.id, "Expired API key presented");
            return Err(ApiKeyRejection::Expired.into());
        }
        if let Some(job_id) = job_id {
            if record.job_id.as_deref() != Some(job_id) {
                tracing::warn!(
                    key_id = %record.id,
                    requested_job = %job_id,
                    bound_job = ?record.job_id,
                    "API key used for a job it is not bound to"
                );
                return Err(ApiKeyRejection::WrongJob.into());
            }
        }

        self.touch_in_background(record.id.clone());
        Ok(record)
    }

    fn touch_in_background(&self, key_id: String) {
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.touch_api_key_last_used(&key_id).await {
                tracing::warn!(key_id = %key_id, error = %e, "Failed to update API key last-used time");
            }
        });
    }
}
