//! The per-request decision state machine.
//!
//! # States
//! ```text
//! Start → HostClassified → TenantBranch  → Decided
//!                        → MainAppBranch → Decided
//!
//! TenantBranch:  rate limit → cache → [miss] gate + store → cache.set → rewrite
//! MainAppBranch: path class → session | API key → allow / redirect / reject
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use arc_swap::ArcSwap;
use axum::http::{HeaderMap, Uri};

use crate::auth::{read_session, ApiKeyAuth, ApiKeyError};
use crate::cache::{LookupStatus, TenantCache};
use crate::config::{GatewayConfig, RoutingConfig};
use crate::error::{unix_now, ErrorKind, StoreError};
use crate::observability::metrics;
use crate::resilience::AdmissionGate;
use crate::routing::decision::{Decision, Rejection, Surface};
use crate::routing::host::{classify_host, HostClass};
use crate::routing::paths::{classify_path, tenant_path, MainAppRoute};
use crate::security::{client_id, RateLimiter};
use crate::store::{ApiKeyStore, MemoryStore, SessionStore, TenantStore};

/// The collaborators the gateway reads from.
#[derive(Clone)]
pub struct Stores {
    pub tenants: Arc<dyn TenantStore>,
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl Stores {
    /// All three concerns served by one in-memory store.
    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            tenants: store.clone(),
            api_keys: store.clone(),
            sessions: store,
        }
    }
}

/// The parts of a request the gateway looks at.
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    pub host: &'a str,
    pub uri: &'a Uri,
    pub headers: &'a HeaderMap,
    pub peer: Option<SocketAddr>,
}

/// Which branch a request took, for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Tenant,
    MainApp,
}

impl Branch {
    /// Which branch a host falls into under `routing`.
    pub fn of(host: &str, routing: &RoutingConfig) -> Self {
        match classify_host(host, routing) {
            HostClass::MainApp => Branch::MainApp,
            HostClass::Tenant(_) | HostClass::InvalidTenant => Branch::Tenant,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Branch::Tenant => "tenant",
            Branch::MainApp => "main_app",
        }
    }
}

/// Shared, process-lifetime gateway state.
pub struct Gateway {
    routing: ArcSwap<RoutingConfig>,
    cache: Arc<TenantCache>,
    limiter: Arc<RateLimiter>,
    rate_limit_enabled: bool,
    gate: Arc<AdmissionGate>,
    tenants: Arc<dyn TenantStore>,
    sessions: Arc<dyn SessionStore>,
    api_keys: ApiKeyAuth,
}

impl Gateway {
    pub fn new(config: &GatewayConfig, stores: Stores) -> Self {
        let gate = Arc::new(AdmissionGate::from_config(&config.admission));
        Self {
            routing: ArcSwap::from_pointee(config.routing.clone()),
            cache: Arc::new(TenantCache::from_config(&config.cache)),
            limiter: Arc::new(RateLimiter::from_config(&config.rate_limit)),
            rate_limit_enabled: config.rate_limit.enabled,
            api_keys: ApiKeyAuth::new(stores.api_keys, gate.clone()),
            gate,
            tenants: stores.tenants,
            sessions: stores.sessions,
        }
    }

    /// Current routing rules.
    pub fn routing(&self) -> Arc<RoutingConfig> {
        self.routing.load_full()
    }

    /// Swap in new routing rules; the next request sees them.
    pub fn update_routing(&self, routing: RoutingConfig) {
        self.routing.store(Arc::new(routing));
    }

    pub fn cache(&self) -> &Arc<TenantCache> {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// Which branch a host falls into under the current rules.
    pub fn branch(&self, host: &str) -> Branch {
        Branch::of(host, &self.routing.load())
    }

    /// Decide what to do with a request under the current rules.
    pub async fn decide(&self, req: &RequestInfo<'_>) -> Decision {
        let routing = self.routing.load_full();
        self.decide_with(&routing, req).await
    }

    /// Decide under a routing snapshot the caller keeps for rendering.
    pub async fn decide_with(&self, routing: &RoutingConfig, req: &RequestInfo<'_>) -> Decision {
        match classify_host(req.host, routing) {
            HostClass::MainApp => self.main_app(routing, req).await,
            HostClass::Tenant(subdomain) => self.tenant(routing, &subdomain, req).await,
            HostClass::InvalidTenant => {
                if let Some(limited) = self.rate_limit(req) {
                    return limited;
                }
                Decision::RewriteToNotFound { cache_hit: false }
            }
        }
    }

    fn rate_limit(&self, req: &RequestInfo<'_>) -> Option<Decision> {
        if !self.rate_limit_enabled {
            return None;
        }
        let outcome = self.limiter.check(&client_id(req.headers, req.peer));
        outcome.limited.then_some(Decision::RejectRateLimited(outcome))
    }

    async fn tenant(&self, routing: &RoutingConfig, subdomain: &str, req: &RequestInfo<'_>) -> Decision {
        if let Some(limited) = self.rate_limit(req) {
            return limited;
        }

        let path = req.uri.path();
        if let Some(entry) = self.cache.get(subdomain) {
            metrics::record_cache_lookup(true);
            return match entry.status {
                LookupStatus::Resolved => Decision::RewriteToTenant {
                    path: tenant_path(&routing.tenant_path_prefix, &entry.tenant_id, path),
                    tenant_id: entry.tenant_id,
                    cache_hit: true,
                },
                LookupStatus::NotFound => Decision::RewriteToNotFound { cache_hit: true },
            };
        }
        metrics::record_cache_lookup(false);

        // The permit is released inside `run`, before the cache write.
        let lookup = self
            .gate
            .run(self.tenants.find_tenant_by_subdomain(subdomain))
            .await;

        match lookup {
            Ok(Some(tenant)) if tenant.is_active() => {
                self.cache.set(subdomain, tenant.id.clone(), LookupStatus::Resolved);
                Decision::RewriteToTenant {
                    path: tenant_path(&routing.tenant_path_prefix, &tenant.id, path),
                    tenant_id: tenant.id,
                    cache_hit: false,
                }
            }
            Ok(_) => {
                self.cache.set(subdomain, "", LookupStatus::NotFound);
                Decision::RewriteToNotFound { cache_hit: false }
            }
            Err(e) => Decision::RejectUpstreamError {
                kind: self.classify(&e, req),
                surface: Surface::Tenant,
            },
        }
    }

    async fn main_app(&self, routing: &RoutingConfig, req: &RequestInfo<'_>) -> Decision {
        match classify_path(req.uri.path(), routing) {
            MainAppRoute::Public | MainAppRoute::AuthApi => Decision::Allow,
            MainAppRoute::AuthPage => match self.has_session(routing, req).await {
                Ok(true) => Decision::RedirectToHome,
                Ok(false) => Decision::Allow,
                Err(e) => {
                    // The sign-in form is safe to show without knowing.
                    self.classify(&e, req);
                    Decision::Allow
                }
            },
            MainAppRoute::JobTrigger { job_id } => {
                match self.api_keys.authorize(req.headers, job_id.as_deref()).await {
                    Ok(_) => Decision::Allow,
                    Err(ApiKeyError::Rejected(r)) => Decision::RejectUnauthorized(Rejection::ApiKey(r)),
                    Err(ApiKeyError::Store(e)) => Decision::RejectUpstreamError {
                        kind: self.classify(&e, req),
                        surface: Surface::MainApp,
                    },
                }
            }
            MainAppRoute::Api => match self.has_session(routing, req).await {
                Ok(true) => Decision::Allow,
                Ok(false) => Decision::RejectUnauthorized(Rejection::Unauthenticated),
                Err(e) => Decision::RejectUpstreamError {
                    kind: self.classify(&e, req),
                    surface: Surface::MainApp,
                },
            },
            MainAppRoute::Page => match self.has_session(routing, req).await {
                Ok(true) => Decision::Allow,
                Ok(false) => Decision::RedirectToSignIn {
                    callback: req
                        .uri
                        .path_and_query()
                        .map_or_else(|| req.uri.path().to_string(), |pq| pq.as_str().to_string()),
                },
                Err(e) => Decision::RejectUpstreamError {
                    kind: self.classify(&e, req),
                    surface: Surface::MainApp,
                },
            },
        }
    }

    /// Session reads get the lookup deadline but no admission permit.
    async fn has_session(&self, routing: &RoutingConfig, req: &RequestInfo<'_>) -> Result<bool, StoreError> {
        let session = self
            .gate
            .with_timeout(read_session(self.sessions.as_ref(), req.headers, &routing.session_cookie))
            .await?;
        Ok(session.is_some())
    }

    fn classify(&self, err: &StoreError, req: &RequestInfo<'_>) -> ErrorKind {
        let kind = ErrorKind::classify(err);
        metrics::record_lookup_error(kind.as_str());
        tracing::error!(
            host = %req.host,
            path = %req.uri.path(),
            kind = %kind,
            timestamp = unix_now(),
            error = %err,
            "Backing store lookup failed"
        );
        kind
    }
}
