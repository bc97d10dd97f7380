//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use status_gateway::config::GatewayConfig;
use status_gateway::error::{StoreError, StoreResult};
use status_gateway::lifecycle::Shutdown;
use status_gateway::routing::{Gateway, Stores};
use status_gateway::store::{
    ApiKeyRecord, MemoryStore, Session, TenantRecord, TenantStatus, TenantStore,
};
use status_gateway::HttpServer;

pub const ROOT_DOMAIN: &str = "example.com";
pub const API_KEY: &str = "sk_live_0123456789";
pub const SESSION: &str = "sess-1";

/// Headers the echo upstream reports back.
const ECHOED: [&str; 4] = ["host", "x-forwarded-for", "x-forwarded-host", "x-tenant-id"];

/// Start a mock upstream that answers 200 with a JSON description of the
/// request it received: method, path, and the forwarding headers.
pub async fn start_echo_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let body = describe(&String::from_utf8_lossy(&buf)).to_string();
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

fn describe(head: &str) -> Value {
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split(' ');
    let method = request_line.next().unwrap_or_default();
    let path = request_line.next().unwrap_or_default();

    let mut headers = Map::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            if ECHOED.contains(&name.as_str()) {
                headers.insert(name, Value::String(value.trim().to_string()));
            }
        }
    }
    json!({ "method": method, "path": path, "headers": headers })
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Gateway config pointed at `upstream` for `example.com`.
pub fn test_config(upstream: SocketAddr) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.address = upstream.to_string();
    config.upstream.request_timeout_secs = 5;
    config.routing.root_domain = ROOT_DOMAIN.to_string();
    config.observability.metrics_enabled = false;
    config
}

/// Store with one active tenant, one scoped API key, and one session.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_tenant(TenantRecord {
        id: "abc".into(),
        subdomain: "tenanta".into(),
        status: TenantStatus::Active,
    });
    store.insert_api_key(API_KEY, ApiKeyRecord {
        id: "k1".into(),
        name: "ci".into(),
        enabled: true,
        expires_at: None,
        job_id: Some("job-123".into()),
        last_used_at: None,
    });
    store.insert_session(SESSION, Session {
        user_id: "u1".into(),
        expires_at: None,
    });
    store
}

/// A tenant store that sleeps before answering or fails outright.
pub struct FaultyTenants {
    pub inner: MemoryStore,
    pub delay: Duration,
    pub error: Option<StoreError>,
}

#[async_trait]
impl TenantStore for FaultyTenants {
    async fn find_tenant_by_subdomain(&self, subdomain: &str) -> StoreResult<Option<TenantRecord>> {
        tokio::time::sleep(self.delay).await;
        match &self.error {
            Some(e) => Err(e.clone()),
            None => self.inner.find_tenant_by_subdomain(subdomain).await,
        }
    }
}

/// A running gateway on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub gateway: Arc<Gateway>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_gateway(config: GatewayConfig, stores: Stores) -> TestGateway {
    let gateway = Arc::new(Gateway::new(&config, stores));
    let server = HttpServer::with_gateway(&config, gateway.clone()).unwrap();
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, gateway, shutdown }
}

/// Client that neither follows redirects nor uses a proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .pool_max_idle_per_host(0)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}
