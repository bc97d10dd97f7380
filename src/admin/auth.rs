use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::admin::AdminState;
use crate::auth::api_key::bearer_token;

pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let presented = bearer_token(request.headers()).map(|token| token == &*state.api_key);
    match presented {
        Some(true) => Ok(next.run(request).await),
        Some(false) => {
            tracing::warn!(path = %request.uri().path(), "Admin request with wrong key");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::debug!(
                path = %request.uri().path(),
                has_header = request.headers().contains_key(header::AUTHORIZATION),
                "Admin request without bearer token"
            );
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
