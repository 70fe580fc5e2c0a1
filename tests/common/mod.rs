//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use grading_relay::config::RelayConfig;
use grading_relay::grading::ApiClient;
use grading_relay::http::HttpServer;
use grading_relay::lifecycle::Shutdown;

/// Serve `router` as the mock grading backend on an ephemeral port.
pub async fn start_mock_backend(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

/// Relay configuration pointing at `backend`.
pub fn relay_config(backend: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.base_url = format!("http://{backend}");
    config
}

/// Start the relay with `config`. Triggering the returned handle stops it.
pub async fn start_relay(config: RelayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Start a relay in front of `backend` with default settings.
pub async fn start_default_relay(backend: SocketAddr) -> (SocketAddr, Shutdown) {
    start_relay(relay_config(backend)).await
}

/// Grading API client talking through the relay at `relay`.
pub fn relay_client(relay: SocketAddr) -> ApiClient {
    ApiClient::new(&format!("http://{relay}/api/backend"), Some("SESSION=test")).unwrap()
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
