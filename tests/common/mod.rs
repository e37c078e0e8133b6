//! Shared utilities for gateway integration tests.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::IntoResponse,
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use strangler_gateway::config::GatewayConfig;
use strangler_gateway::http::HttpServer;
use strangler_gateway::lifecycle::Shutdown;

/// Start a backend that answers every request with a JSON description of it.
///
/// Response shape: `{ backend, method, uri, headers: { name: [values] }, body }`.
pub async fn start_echo_backend(name: &'static str) -> SocketAddr {
    async fn echo(
        State(name): State<&'static str>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> impl IntoResponse {
        let mut header_map = Map::new();
        for (key, value) in headers.iter() {
            let entry = header_map
                .entry(key.as_str().to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(Value::String(value.to_str().unwrap_or_default().to_string()));
            }
        }

        (
            [("x-backend", name)],
            Json(json!({
                "backend": name,
                "method": method.as_str(),
                "uri": uri.to_string(),
                "headers": header_map,
                "body": String::from_utf8_lossy(&body),
            })),
        )
    }

    let app = Router::new().fallback(echo).with_state(name);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start a backend that writes `response` verbatim after reading the request head.
pub async fn start_raw_backend(response: &'static str) -> SocketAddr {
    start_delayed_raw_backend(response, Duration::ZERO).await
}

/// Like [`start_raw_backend`], but waits `delay` before answering.
pub async fn start_delayed_raw_backend(response: &'static str, delay: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        let _ = answer_raw(socket, response, delay).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

async fn answer_raw(
    mut socket: TcpStream,
    response: &'static str,
    delay: Duration,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    tokio::time::sleep(delay).await;
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Gateway configuration pointing at local backends.
pub fn gateway_config(monolith: SocketAddr, movies: SocketAddr, percent: i64) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config.migration.monolith_url = format!("http://{monolith}").parse().unwrap();
    config.migration.movies_service_url = format!("http://{movies}").parse().unwrap();
    config.migration.gradual_migration = true;
    config.migration.movies_migration_percent = percent;
    config
}

/// A running gateway; dropping it stops the server.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
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

/// Serve `server` on an ephemeral port.
pub async fn start_gateway(server: HttpServer) -> TestGateway {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

/// Client that neither follows redirects nor uses a system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// Replays a fixed draw for every selection.
#[derive(Debug)]
pub struct FixedDraw(pub u32);

impl strangler_gateway::routing::PercentSource for FixedDraw {
    fn draw(&self) -> u32 {
        self.0
    }
}

pub fn fixed_draw(value: u32) -> Arc<dyn strangler_gateway::routing::PercentSource> {
    Arc::new(FixedDraw(value))
}
