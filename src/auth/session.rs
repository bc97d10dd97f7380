//! Session cookie extraction.

use axum::http::{header, HeaderMap};

use crate::error::{unix_now, StoreResult};
use crate::store::{Session, SessionStore};

/// Value of the session cookie, accepting the `__Secure-` prefixed variant.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let secure_name = format!("__Secure-{cookie_name}");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| (*name == cookie_name || *name == secure_name) && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Resolve the active session for a request, if any.
pub async fn read_session(
    store: &dyn SessionStore,
    headers: &HeaderMap,
    cookie_name: &str,
) -> StoreResult<Option<Session>> {
    let Some(token) = session_token(headers, cookie_name) else {
        return Ok(None);
    };
    let session = store.read_session(&token).await?;
    Ok(session.filter(|s| s.is_active_at(unix_now())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use crate::store::MemoryStore;

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; session_token=abc123; x=1"));
        assert_eq!(session_token(&headers, "session_token").as_deref(), Some("abc123"));
        assert_eq!(session_token(&headers, "missing"), None);
    }

    #[test]
    fn test_secure_prefix_and_empty_value() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("session_token="));
        headers.append(header::COOKIE, HeaderValue::from_static("__Secure-session_token=s3cure"));
        assert_eq!(session_token(&headers, "session_token").as_deref(), Some("s3cure"));
    }

    #[tokio::test]
    async fn test_expired_session_is_absent() {
        let store = MemoryStore::new();
        store.insert_session("live", Session { user_id: "u1".into(), expires_at: None });
        store.insert_session("dead", Session { user_id: "u2".into(), expires_at: Some(1) });

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session_token=live"));
        assert!(read_session(&store, &headers, "session_token").await.unwrap().is_some());

        headers.insert(header::COOKIE, HeaderValue::from_static("session_token=dead"));
        assert!(read_session(&store, &headers, "session_token").await.unwrap().is_none());
    }
}
