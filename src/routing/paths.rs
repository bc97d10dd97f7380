//! Main-app path classification and tenant path rewriting.

use crate::config::RoutingConfig;

/// What a main-app path requires before it may pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainAppRoute {
    /// Static assets; no checks.
    Public,
    /// Sign-in and sign-up pages.
    AuthPage,
    /// Auth-provider endpoints, handled downstream.
    AuthApi,
    /// Job trigger guarded by an API key. `job_id` is set when the path names one.
    JobTrigger { job_id: Option<String> },
    /// Any other `/api` route; needs a session.
    Api,
    /// Dashboard pages; need a session.
    Page,
}

/// `path` equals `prefix` or continues it at a segment boundary.
fn under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub fn classify_path(path: &str, routing: &RoutingConfig) -> MainAppRoute {
    if routing.public_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
        return MainAppRoute::Public;
    }
    if under(path, &routing.sign_in_path) || under(path, &routing.sign_up_path) {
        return MainAppRoute::AuthPage;
    }
    if under(path, &routing.auth_api_prefix) {
        return MainAppRoute::AuthApi;
    }
    if let Some(job_id) = job_trigger(path, &routing.jobs_api_prefix) {
        return MainAppRoute::JobTrigger { job_id };
    }
    if under(path, "/api") {
        return MainAppRoute::Api;
    }
    MainAppRoute::Page
}

/// Match `{prefix}/{job_id}/trigger` or `{prefix}/trigger`.
fn job_trigger(path: &str, prefix: &str) -> Option<Option<String>> {
    let rest = path
        .strip_prefix(prefix.trim_end_matches('/'))?
        .strip_prefix('/')?;
    let segments: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
    match segments.as_slice() {
        ["trigger"] => Some(None),
        [job_id, "trigger"] if !job_id.is_empty() => Some(Some((*job_id).to_string())),
        _ => None,
    }
}

/// Tenant-scoped path: `/` maps to the landing page, anything else is appended.
///
/// Dot segments are resolved first, so the result never leaves the tenant's prefix.
pub fn tenant_path(prefix: &str, tenant_id: &str, path: &str) -> String {
    let landing = format!("{}/{}", prefix.trim_end_matches('/'), tenant_id);
    let path = remove_dot_segments(path);
    if path.is_empty() || path == "/" {
        landing
    } else if path.starts_with('/') {
        format!("{landing}{path}")
    } else {
        format!("{landing}/{path}")
    }
}

/// `.` or `..`, literal or percent-encoded.
fn dot_segment(segment: &str) -> Option<bool> {
    match segment.to_ascii_lowercase().replace("%2e", ".").as_str() {
        "." => Some(false),
        ".." => Some(true),
        _ => None,
    }
}

/// Resolve `.` and `..` segments; `..` at the root stays at the root.
fn remove_dot_segments(path: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut trailing_slash = false;
    for segment in path.trim_start_matches('/').split('/') {
        trailing_slash = false;
        match dot_segment(segment) {
            Some(parent) => {
                if parent {
                    kept.pop();
                }
                trailing_slash = true;
            }
            None => kept.push(segment),
        }
    }

    let mut resolved = String::with_capacity(path.len() + 1);
    for segment in &kept {
        resolved.push('/');
        resolved.push_str(segment);
    }
    if trailing_slash && !kept.is_empty() {
        resolved.push('/');
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let routing = RoutingConfig::default();
        let cases = [
            ("/_next/static/chunk.js", MainAppRoute::Public),
            ("/favicon.ico", MainAppRoute::Public),
            ("/sign-in", MainAppRoute::AuthPage),
            ("/sign-up/verify", MainAppRoute::AuthPage),
            ("/api/auth/callback/github", MainAppRoute::AuthApi),
            ("/api/jobs/job-123/trigger", MainAppRoute::JobTrigger { job_id: Some("job-123".into()) }),
            ("/api/jobs/trigger", MainAppRoute::JobTrigger { job_id: None }),
            ("/api/jobs/job-123", MainAppRoute::Api),
            ("/api/jobs/job-123/runs", MainAppRoute::Api),
            ("/api/monitors", MainAppRoute::Api),
            ("/api", MainAppRoute::Api),
            ("/apiary", MainAppRoute::Page),
            ("/sign-inside", MainAppRoute::Page),
            ("/dashboard", MainAppRoute::Page),
            ("/", MainAppRoute::Page),
        ];
        for (path, expected) in cases {
            assert_eq!(classify_path(path, &routing), expected, "{path}");
        }
    }

    #[test]
    fn test_tenant_path() {
        assert_eq!(tenant_path("/status-pages", "abc", "/"), "/status-pages/abc");
        assert_eq!(tenant_path("/status-pages", "abc", ""), "/status-pages/abc");
        assert_eq!(tenant_path("/status-pages", "abc", "/incidents/7"), "/status-pages/abc/incidents/7");
        assert_eq!(tenant_path("/status-pages/", "abc", "feed.xml"), "/status-pages/abc/feed.xml");
        assert_eq!(tenant_path("/status-pages", "abc", "/incidents/"), "/status-pages/abc/incidents/");
    }

    #[test]
    fn test_tenant_path_stays_under_prefix() {
        let cases = [
            ("/../../api/monitors", "/status-pages/abc/api/monitors"),
            ("/%2e%2e/%2E%2E/api/monitors", "/status-pages/abc/api/monitors"),
            ("/.%2e/api", "/status-pages/abc/api"),
            ("/incidents/../../../other-tenant", "/status-pages/abc/other-tenant"),
            ("/incidents/./7", "/status-pages/abc/incidents/7"),
            ("/incidents/7/..", "/status-pages/abc/incidents/"),
            ("/..", "/status-pages/abc"),
            ("/...", "/status-pages/abc/..."),
        ];
        for (path, expected) in cases {
            assert_eq!(tenant_path("/status-pages", "abc", path), expected, "{path}");
        }
    }
}
