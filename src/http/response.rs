//! Response handling and transformation.
//!
//! # Responsibilities
//! - Transform the upstream response for the client
//! - Strip connection-scoped headers
//! - Tag every movies response with the backend that served it
//!
//! # Design Decisions
//! - Status and body are relayed verbatim
//! - Repeated headers (e.g. Set-Cookie) keep every value
//! - X-Target-Service is the one visible signal of the migration state

use axum::body::{Body, Bytes};
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    StatusCode,
};
use axum::response::{IntoResponse, Response};

use crate::routing::BackendKind;

pub const X_TARGET_SERVICE: HeaderName = HeaderName::from_static("x-target-service");

/// Upstream headers that are never relayed to the client.
pub const HOP_BY_HOP: [HeaderName; 4] = [
    header::CONTENT_ENCODING,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
];

pub fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(name)
}

/// Response sent back to the client for a proxied request.
#[derive(Debug, Clone)]
pub struct OutboundResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OutboundResponse {
    /// Build the client response from an upstream reply.
    pub fn from_upstream(
        status: StatusCode,
        upstream_headers: &HeaderMap,
        body: Bytes,
        backend: BackendKind,
    ) -> Self {
        let mut headers = HeaderMap::with_capacity(upstream_headers.len() + 1);
        for (name, value) in upstream_headers.iter() {
            if is_hop_by_hop(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        tag_backend(&mut headers, backend);

        Self { status, headers, body }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for OutboundResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Set `X-Target-Service` to the backend label.
pub fn tag_backend(headers: &mut HeaderMap, backend: BackendKind) {
    headers.insert(X_TARGET_SERVICE, HeaderValue::from_static(backend.label()));
}
