//! Response headers attached by the gateway.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

pub const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
pub const X_STATUS_PAGE_ERROR: HeaderName = HeaderName::from_static("x-status-page-error");
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
pub const X_TENANT_ID: HeaderName = HeaderName::from_static("x-tenant-id");

/// Client cache lifetime for a resolved tenant page.
pub const CACHE_POSITIVE: &str = "public, max-age=300, stale-while-revalidate=60";
/// Client cache lifetime for the unknown-tenant page.
pub const CACHE_NEGATIVE: &str = "public, max-age=60";
pub const CACHE_NO_STORE: &str = "no-store";

/// Fixed hardening headers for tenant pages.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
}

/// `X-Cache` value.
pub fn cache_marker(hit: bool) -> HeaderValue {
    HeaderValue::from_static(if hit { "HIT" } else { "MISS" })
}

/// Numeric header value.
pub fn number(value: u64) -> HeaderValue {
    HeaderValue::from(value)
}
