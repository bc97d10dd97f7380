//! Per-request decisions.

use axum::http::StatusCode;

use crate::auth::ApiKeyRejection;
use crate::error::ErrorKind;
use crate::security::RateLimitOutcome;

/// Who the error response is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Status page visitors; gets an error page.
    Tenant,
    /// Dashboard and API clients; gets JSON.
    MainApp,
}

/// Why a main-app request is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unauthenticated,
    ApiKey(ApiKeyRejection),
}

impl Rejection {
    pub fn status(self) -> StatusCode {
        match self {
            Rejection::Unauthenticated => StatusCode::UNAUTHORIZED,
            Rejection::ApiKey(r) => r.status(),
        }
    }

    pub fn message(self) -> String {
        match self {
            Rejection::Unauthenticated => "Authentication required".to_string(),
            Rejection::ApiKey(r) => r.to_string(),
        }
    }
}

/// What the gateway does with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Forward unchanged.
    Allow,
    /// Send an anonymous user to sign in, then back to `callback`.
    RedirectToSignIn { callback: String },
    /// Send a signed-in user away from the auth pages.
    RedirectToHome,
    /// Forward under the tenant's path. `cache_hit` reports who answered.
    RewriteToTenant { tenant_id: String, path: String, cache_hit: bool },
    /// Unknown tenant.
    RewriteToNotFound { cache_hit: bool },
    RejectUnauthorized(Rejection),
    RejectRateLimited(RateLimitOutcome),
    /// The backing store failed; rendered per surface.
    RejectUpstreamError { kind: ErrorKind, surface: Surface },
}

impl Decision {
    /// Metric label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::RedirectToSignIn { .. } => "redirect_sign_in",
            Decision::RedirectToHome => "redirect_home",
            Decision::RewriteToTenant { .. } => "rewrite_tenant",
            Decision::RewriteToNotFound { .. } => "not_found",
            Decision::RejectUnauthorized(_) => "unauthorized",
            Decision::RejectRateLimited(_) => "rate_limited",
            Decision::RejectUpstreamError { .. } => "upstream_error",
        }
    }
}
