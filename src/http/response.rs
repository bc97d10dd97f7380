//! Decision rendering.
//!
//! # Responsibilities
//! - Turn a [`Decision`] into a direct response or a forward to the upstream
//! - Attach cache, rate-limit, and hardening headers
//! - Map backing-store failures to classified responses per surface
//!
//! # Design Decisions
//! - Forwarded responses stream through; only status and headers change
//! - Tenant error pages degrade to plain text when the upstream is down

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::RoutingConfig;
use crate::error::ErrorKind;
use crate::routing::{Decision, Surface};
use crate::security::headers::{
    apply_security_headers, cache_marker, number, CACHE_NEGATIVE, CACHE_NO_STORE, CACHE_POSITIVE,
    X_CACHE, X_RATELIMIT_LIMIT, X_RATELIMIT_REMAINING, X_RATELIMIT_RESET, X_STATUS_PAGE_ERROR,
};
use crate::security::RateLimitOutcome;

/// What the server does next.
#[derive(Debug)]
pub enum Action {
    Forward(ForwardPlan),
    Respond(Response),
}

/// How to forward a request and dress the upstream's answer.
#[derive(Debug, Default)]
pub struct ForwardPlan {
    /// Replacement path and query; `None` forwards the original.
    pub path_and_query: Option<String>,
    /// Sent upstream as `X-Tenant-Id`.
    pub tenant_id: Option<String>,
    /// Overrides the upstream status.
    pub status: Option<StatusCode>,
    /// Added to the upstream response.
    pub headers: HeaderMap,
    /// Plain-text body used when the upstream cannot be reached.
    pub fallback: Option<&'static str>,
}

impl ForwardPlan {
    /// Apply the plan to the upstream's response.
    pub fn finish(&self, response: &mut Response) {
        if let Some(status) = self.status {
            *response.status_mut() = status;
        }
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
    }

    /// Response when the upstream could not be reached.
    pub fn upstream_unavailable(self) -> Response {
        match (self.fallback, self.status) {
            (Some(body), Some(status)) => (status, self.headers, body).into_response(),
            _ => (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response(),
        }
    }
}

/// Render a decision.
pub fn render(decision: Decision, routing: &RoutingConfig, uri: &Uri, security_headers: bool) -> Action {
    match decision {
        Decision::Allow => Action::Forward(ForwardPlan::default()),

        Decision::RewriteToTenant { tenant_id, path, cache_hit } => {
            let mut headers = tenant_headers(security_headers);
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_POSITIVE));
            headers.insert(X_CACHE, cache_marker(cache_hit));
            Action::Forward(ForwardPlan {
                path_and_query: Some(with_query(&path, uri.query())),
                tenant_id: Some(tenant_id),
                headers,
                ..ForwardPlan::default()
            })
        }

        Decision::RewriteToNotFound { cache_hit } => {
            let mut headers = tenant_headers(security_headers);
            headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_NEGATIVE));
            headers.insert(X_CACHE, cache_marker(cache_hit));
            Action::Forward(ForwardPlan {
                path_and_query: Some(routing.not_found_path.clone()),
                status: Some(StatusCode::NOT_FOUND),
                headers,
                ..ForwardPlan::default()
            })
        }

        Decision::RedirectToSignIn { callback } => {
            let encoded: String = url::form_urlencoded::byte_serialize(callback.as_bytes()).collect();
            Action::Respond(redirect(&format!("{}?callbackUrl={encoded}", routing.sign_in_path)))
        }

        Decision::RedirectToHome => Action::Respond(redirect(&routing.home_path)),

        Decision::RejectUnauthorized(rejection) => Action::Respond(json_error(
            rejection.status(),
            HeaderMap::new(),
            json!({ "error": rejection.message() }),
        )),

        Decision::RejectRateLimited(outcome) => Action::Respond(rate_limited(outcome)),

        Decision::RejectUpstreamError { kind, surface: Surface::Tenant } => {
            let mut headers = tenant_headers(security_headers);
            headers.extend(error_headers(kind));
            headers.insert(X_STATUS_PAGE_ERROR, HeaderValue::from_static(kind.as_str()));
            Action::Forward(ForwardPlan {
                path_and_query: Some(routing.error_path.clone()),
                status: Some(kind.status()),
                headers,
                fallback: Some(kind.message()),
                ..ForwardPlan::default()
            })
        }

        Decision::RejectUpstreamError { kind, surface: Surface::MainApp } => Action::Respond(json_error(
            kind.status(),
            error_headers(kind),
            json!({ "error": kind.message(), "kind": kind.as_str() }),
        )),
    }
}

fn tenant_headers(security_headers: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if security_headers {
        apply_security_headers(&mut headers);
    }
    headers
}

fn error_headers(kind: ErrorKind) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_NO_STORE));
    if let Some(secs) = kind.retry_after_secs() {
        headers.insert(header::RETRY_AFTER, number(secs));
    }
    headers
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{path}?{q}"),
        _ => path.to_string(),
    }
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

fn json_error(status: StatusCode, headers: HeaderMap, body: serde_json::Value) -> Response {
    (status, headers, Json(body)).into_response()
}

fn rate_limited(outcome: RateLimitOutcome) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::RETRY_AFTER, number(outcome.reset_after_secs));
    headers.insert(X_RATELIMIT_LIMIT, number(u64::from(outcome.limit)));
    headers.insert(X_RATELIMIT_REMAINING, number(u64::from(outcome.remaining)));
    headers.insert(X_RATELIMIT_RESET, number(outcome.reset_after_secs));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_NO_STORE));
    json_error(
        StatusCode::TOO_MANY_REQUESTS,
        headers,
        json!({ "error": "Too many requests", "retry_after": outcome.reset_after_secs }),
    )
}
