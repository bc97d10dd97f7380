//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the gateway fallback handler
//! - Wire up middleware (request ID, tracing, timeout, concurrency cap)
//! - Run the gateway decision for every request
//! - Forward requests to the upstream application
//! - Record per-request metrics

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{uri::{Authority, Scheme}, HeaderValue, Request, Uri, Version},
    response::Response,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::{limit::GlobalConcurrencyLimitLayer, ServiceBuilder};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::request::{request_host, stamp_forwarded, RequestIdExt, UuidRequestId, X_REQUEST_ID};
use crate::http::response::{render, Action, ForwardPlan};
use crate::observability::metrics;
use crate::routing::{Branch, Gateway, RequestInfo, Stores};
use crate::security::headers::X_TENANT_ID;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
    pub security_headers: bool,
}

/// Errors building the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid upstream address {0}")]
    InvalidUpstream(String),
}

/// HTTP server for the edge gateway.
pub struct HttpServer {
    router: Router,
    gateway: Arc<Gateway>,
}

impl HttpServer {
    /// Create a server with a fresh gateway over `stores`.
    pub fn new(config: &GatewayConfig, stores: Stores) -> Result<Self, ServerError> {
        Self::with_gateway(config, Arc::new(Gateway::new(config, stores)))
    }

    /// Create a server around an existing gateway (shared with admin and maintenance).
    pub fn with_gateway(config: &GatewayConfig, gateway: Arc<Gateway>) -> Result<Self, ServerError> {
        let upstream = Authority::from_str(&config.upstream.address)
            .map_err(|_| ServerError::InvalidUpstream(config.upstream.address.clone()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            gateway: gateway.clone(),
            client,
            upstream,
            security_headers: config.security.enable_headers,
        };

        let router = Self::build_router(config, state);
        Ok(Self { router, gateway })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let timeout = Duration::from_secs(config.upstream.request_timeout_secs);
        Router::new()
            .fallback(gateway_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            host = %request_host(request),
                            path = %request.uri().path(),
                            request_id = %request.request_id(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every request lands here: decide, then respond or forward.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let host = request_host(&request).to_string();
    // One snapshot per request, so a reload cannot split decide from render.
    let routing = state.gateway.routing();
    let branch = Branch::of(&host, &routing);

    let decision = state
        .gateway
        .decide_with(
            &routing,
            &RequestInfo {
                host: &host,
                uri: request.uri(),
                headers: request.headers(),
                peer: Some(peer),
            },
        )
        .await;
    let outcome = decision.outcome();

    tracing::debug!(
        request_id = %request.request_id(),
        branch = branch.as_str(),
        outcome,
        "Request decided"
    );

    let response = match render(decision, &routing, request.uri(), state.security_headers) {
        Action::Respond(response) => response,
        Action::Forward(plan) => forward(&state, request, plan, peer, &host).await,
    };

    metrics::record_request(branch.as_str(), outcome, response.status().as_u16(), start);
    response
}

async fn forward(
    state: &AppState,
    request: Request<Body>,
    plan: ForwardPlan,
    peer: SocketAddr,
    host: &str,
) -> Response {
    let request_id = request.request_id().to_string();
    let (mut parts, body) = request.into_parts();

    let path_and_query = plan
        .path_and_query
        .clone()
        .or_else(|| parts.uri.path_and_query().map(|pq| pq.as_str().to_string()))
        .unwrap_or_else(|| "/".to_string());

    let uri = match Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(state.upstream.clone())
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return plan.upstream_unavailable();
        }
    };
    parts.uri = uri;
    // The upstream pool speaks HTTP/1.1 regardless of the client's protocol.
    parts.version = Version::HTTP_11;

    stamp_forwarded(&mut parts.headers, peer, host);
    if let Some(tenant_id) = &plan.tenant_id {
        if let Ok(value) = HeaderValue::from_str(tenant_id) {
            parts.headers.insert(X_TENANT_ID, value);
        }
    }

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(upstream) => {
            let (parts, body) = upstream.into_parts();
            let mut response = Response::from_parts(parts, Body::new(body));
            plan.finish(&mut response);
            response
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                upstream = %state.upstream,
                error = %e,
                "Upstream error"
            );
            plan.upstream_unavailable()
        }
    }
}
