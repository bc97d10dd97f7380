use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::admin::AdminState;
use crate::cache::{CacheStats, TenantCache};
use crate::resilience::AdmissionStats;
use crate::security::RateLimitStats;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub root_domain: String,
}

#[derive(Serialize)]
pub struct PurgeResult {
    pub subdomain: String,
    pub removed: bool,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started_at.elapsed().as_secs(),
        root_domain: state.gateway.routing().root_domain.clone(),
    })
}

pub async fn get_cache(State(state): State<AdminState>) -> Json<CacheStats> {
    Json(state.gateway.cache().stats())
}

pub async fn purge_cache_entry(
    State(state): State<AdminState>,
    Path(subdomain): Path<String>,
) -> (StatusCode, Json<PurgeResult>) {
    let removed = state.gateway.cache().invalidate(&subdomain);
    tracing::info!(subdomain = %subdomain, removed, "Cache entry purged by operator");
    let status = if removed { StatusCode::OK } else { StatusCode::NOT_FOUND };
    (status, Json(PurgeResult { subdomain: TenantCache::normalize(&subdomain), removed }))
}

pub async fn get_rate_limits(State(state): State<AdminState>) -> Json<RateLimitStats> {
    Json(state.gateway.limiter().stats())
}

pub async fn get_admission(State(state): State<AdminState>) -> Json<AdmissionStats> {
    Json(state.gateway.gate().stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use axum::{body::Body, http::{header, Request}, Router};
    use tower::ServiceExt;
    use crate::admin::setup_admin_router;
    use crate::cache::LookupStatus;
    use crate::config::GatewayConfig;
    use crate::routing::{Gateway, Stores};
    use crate::store::MemoryStore;

    const KEY: &str = "admin-secret-key-0123";

    fn app() -> (Router, Arc<Gateway>) {
        let gateway = Arc::new(Gateway::new(&GatewayConfig::default(), Stores::memory(MemoryStore::new())));
        (setup_admin_router(AdminState::new(gateway.clone(), KEY)), gateway)
    }

    fn request(method: &str, uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_requires_key() {
        let (app, _) = app();
        let response = app.clone().oneshot(request("GET", "/admin/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = app.oneshot(request("GET", "/admin/status", Some("wrong-key-wrong-key"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status() {
        let (app, _) = app();
        let response = app.oneshot(request("GET", "/admin/status", Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "operational");
        assert_eq!(body["root_domain"], "localhost");
    }

    #[tokio::test]
    async fn test_purge_cache_entry() {
        let (app, gateway) = app();
        gateway.cache().set("acme", "", LookupStatus::NotFound);

        let response = app.clone().oneshot(request("DELETE", "/admin/cache/ACME", Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["removed"], true);
        assert!(gateway.cache().is_empty());

        let response = app.oneshot(request("DELETE", "/admin/cache/acme", Some(KEY))).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_stats_endpoints() {
        let (app, gateway) = app();
        gateway.limiter().check("unknown");

        let body = json(app.clone().oneshot(request("GET", "/admin/rate-limits", Some(KEY))).await.unwrap()).await;
        assert_eq!(body["tracked_clients"], 1);
        assert_eq!(body["unknown_client_hits"], 1);

        let body = json(app.clone().oneshot(request("GET", "/admin/admission", Some(KEY))).await.unwrap()).await;
        assert_eq!(body["max"], 10);
        assert_eq!(body["active"], 0);

        let body = json(app.oneshot(request("GET", "/admin/cache", Some(KEY))).await.unwrap()).await;
        assert_eq!(body["capacity"], 1000);
    }
}
