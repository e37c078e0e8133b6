//! Upstream forwarding.
//!
//! # Responsibilities
//! - Own the pooled upstream HTTP client
//! - Enforce connect and overall deadlines on every upstream call
//! - Perform one round trip: InboundRequest → upstream → OutboundResponse
//! - Map upstream failures to 502 / 504
//!
//! # Design Decisions
//! - No retries: one attempt per inbound request
//! - Redirects are relayed, never followed
//! - Environment HTTP proxy settings are ignored
//! - The overall deadline covers reading the upstream body too

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reqwest::{redirect, Client};
use std::time::Duration;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::http::request::{build_target_url, outbound_headers, upstream_path, InboundRequest};
use crate::http::response::{tag_backend, OutboundResponse};
use crate::routing::{BackendChoice, BackendKind};

/// Failure of a single upstream round trip.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Connection refused, DNS failure, reset, or unreadable response.
    #[error("{backend} unavailable: {source}")]
    UpstreamUnavailable {
        backend: BackendKind,
        #[source]
        source: reqwest::Error,
    },

    /// Connect or overall deadline exceeded.
    #[error("{backend} timed out: {source}")]
    UpstreamTimeout {
        backend: BackendKind,
        #[source]
        source: reqwest::Error,
    },

    /// The outbound request could not be constructed.
    #[error("invalid upstream target '{target}': {reason}")]
    InvalidTarget {
        backend: BackendKind,
        target: String,
        reason: String,
    },
}

impl ForwardError {
    fn from_reqwest(backend: BackendKind, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ForwardError::UpstreamTimeout { backend, source }
        } else if source.is_builder() {
            ForwardError::InvalidTarget {
                backend,
                target: source.url().map(ToString::to_string).unwrap_or_default(),
                reason: source.to_string(),
            }
        } else {
            ForwardError::UpstreamUnavailable { backend, source }
        }
    }

    pub fn backend(&self) -> BackendKind {
        match self {
            ForwardError::UpstreamUnavailable { backend, .. }
            | ForwardError::UpstreamTimeout { backend, .. }
            | ForwardError::InvalidTarget { backend, .. } => *backend,
        }
    }

    /// Short name used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::UpstreamUnavailable { .. } => "unavailable",
            ForwardError::UpstreamTimeout { .. } => "timeout",
            ForwardError::InvalidTarget { .. } => "invalid_target",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
            ForwardError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::InvalidTarget { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let message = match &self {
            ForwardError::UpstreamUnavailable { .. } => "Upstream request failed",
            ForwardError::UpstreamTimeout { .. } => "Upstream request timed out",
            ForwardError::InvalidTarget { .. } => "Failed to build upstream request",
        };
        let mut response = (self.status(), message).into_response();
        tag_backend(response.headers_mut(), self.backend());
        response
    }
}

/// Sends inbound requests to the selected backend.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client,
}

impl Forwarder {
    /// Build a forwarder with the configured deadlines.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .redirect(redirect::Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    /// Forward `request` to `backend` under `/api/movies/<route_suffix>`.
    pub async fn forward(
        &self,
        request: InboundRequest,
        backend: &BackendChoice,
        route_suffix: &str,
    ) -> Result<OutboundResponse, ForwardError> {
        let target = build_target_url(&backend.base_url, &upstream_path(route_suffix), request.query());
        let headers = outbound_headers(&request);

        tracing::debug!(
            backend = backend.label(),
            method = %request.method,
            target = %target,
            "Forwarding request"
        );

        let upstream = self
            .client
            .request(request.method, &target)
            .headers(headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| ForwardError::from_reqwest(backend.kind, e))?;

        let status = upstream.status();
        let upstream_headers = upstream.headers().clone();
        let body = upstream
            .bytes()
            .await
            .map_err(|e| ForwardError::from_reqwest(backend.kind, e))?;

        Ok(OutboundResponse::from_upstream(
            status,
            &upstream_headers,
            body,
            backend.kind,
        ))
    }
}
