//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use catalog_gateway::config::GatewayConfig;
use catalog_gateway::http::HttpServer;
use catalog_gateway::lifecycle::Shutdown;
use catalog_gateway::security::AuthGate;
use catalog_gateway::store::{InMemoryDocumentStore, InMemoryRevocationStore};

pub const TEST_SECRET: &str = "integration-test-signing-secret";

/// A running gateway on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub gate: Arc<AuthGate>,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn token(&self, subject: &str) -> String {
        self.gate.keys().issue(subject).unwrap()
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Config with a valid secret and the given per-window request budget.
pub fn test_config(max_requests: u32) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.auth.signing_secret = TEST_SECRET.into();
    config.rate_limit.max_requests = max_requests;
    config
}

/// Start the server and return once it is accepting connections.
pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(
        config,
        Arc::new(InMemoryRevocationStore::new()),
        Arc::new(InMemoryDocumentStore::new()),
    );
    let gate = server.auth_gate();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    TestGateway {
        addr,
        gate,
        shutdown,
        client,
    }
}
