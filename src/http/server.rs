//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health and movies handlers
//! - Wire up middleware (request ID, tracing, body limit)
//! - Bind server to listener and shut down gracefully
//! - Dispatch movies requests: select backend, forward, tag response

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Request, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::forward::Forwarder;
use crate::http::request::{request_id, ClientAddr, InboundRequest, MakeRequestUuid, MOVIES_ROUTE_PREFIX};
use crate::observability::metrics;
use crate::routing::{BackendSelector, PercentSource};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub selector: BackendSelector,
    pub forwarder: Forwarder,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server drawing routing decisions from the OS CSPRNG.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let selector = BackendSelector::new(Arc::new(config.migration.clone()));
        Self::build(&config, selector)
    }

    /// Create a new HTTP server with a caller-supplied randomness source.
    pub fn with_percent_source(
        config: GatewayConfig,
        source: Arc<dyn PercentSource>,
    ) -> Result<Self, reqwest::Error> {
        let selector = BackendSelector::with_source(Arc::new(config.migration.clone()), source);
        Self::build(&config, selector)
    }

    fn build(config: &GatewayConfig, selector: BackendSelector) -> Result<Self, reqwest::Error> {
        let state = AppState {
            selector,
            forwarder: Forwarder::new(&config.timeouts)?,
        };
        let router = Self::build_router(config, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let movies_wildcard = format!("{MOVIES_ROUTE_PREFIX}/{{*path}}");
        let movies_slash = format!("{MOVIES_ROUTE_PREFIX}/");

        Router::new()
            .route("/health", get(health_handler))
            .route(MOVIES_ROUTE_PREFIX, any(movies_handler))
            .route(&movies_slash, any(movies_handler))
            .route(&movies_wildcard, any(movies_handler))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for driving the gateway without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Movies handler: pick a backend, forward, tag the response.
async fn movies_handler(
    State(state): State<AppState>,
    ClientAddr(client_addr): ClientAddr,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&headers).to_string();
    let route_suffix = route_suffix(uri.path()).to_string();
    let method_str = method.to_string();

    let backend = state.selector.select();

    tracing::debug!(
        request_id = %request_id,
        backend = backend.label(),
        path = %uri.path(),
        "Backend selected"
    );

    let request = InboundRequest {
        method,
        uri,
        headers,
        body,
        client_addr,
    };

    match state.forwarder.forward(request, &backend, &route_suffix).await {
        Ok(response) => {
            metrics::record_request(&method_str, response.status.as_u16(), backend.label(), start_time);
            response.into_response()
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                backend = backend.label(),
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream_error(backend.label(), e.kind());
            metrics::record_request(&method_str, e.status().as_u16(), backend.label(), start_time);
            e.into_response()
        }
    }
}

/// Part of the raw request path after `/api/movies`, without the joining slash.
fn route_suffix(path: &str) -> &str {
    path.strip_prefix(MOVIES_ROUTE_PREFIX)
        .unwrap_or_default()
        .trim_start_matches('/')
}
