//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Capture the inbound request as an owned `InboundRequest`
//! - Build the upstream target URL from backend base, route suffix and query
//! - Transcribe headers for the outbound request (drop Host/Content-Length,
//!   add X-Forwarded-*)
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing and forwarded upstream
//! - Path and query are taken raw from the URI; nothing is decoded or reordered
//! - Headers are appended, never inserted, so duplicates survive

use axum::body::Bytes;
use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    request::Parts,
    uri::Authority,
    Method, Request, Uri,
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Fixed upstream prefix for the movies API.
pub const MOVIES_ROUTE_PREFIX: &str = "/api/movies";

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Request ID of an inbound request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Address of the immediate peer, when the server recorded one.
#[derive(Debug, Clone, Copy)]
pub struct ClientAddr(pub Option<IpAddr>);

impl<S: Send + Sync> FromRequestParts<S> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip()),
        ))
    }
}

/// An inbound request, fully buffered and owned by the handler.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub client_addr: Option<IpAddr>,
}

impl InboundRequest {
    /// Raw query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.uri.query().filter(|q| !q.is_empty())
    }

    /// Host name the client addressed, without port.
    pub fn host(&self) -> Option<&str> {
        let authority = self
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.authority().map(Authority::as_str))?;
        let host = host_without_port(authority);
        (!host.is_empty()).then_some(host)
    }

    /// Scheme the client used, `http` when the URI does not say.
    pub fn scheme(&self) -> &str {
        self.uri.scheme_str().unwrap_or("http")
    }
}

fn host_without_port(authority: &str) -> &str {
    // Bracketed IPv6 literal: keep the brackets, drop the port.
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    match authority.rsplit_once(':') {
        Some((host, port)) if port.bytes().all(|b| b.is_ascii_digit()) => host,
        _ => authority,
    }
}

/// Upstream path for a route suffix: `/api/movies/<suffix>` without trailing slashes.
pub fn upstream_path(route_suffix: &str) -> String {
    let suffix = route_suffix.trim_start_matches('/');
    let path = format!("{MOVIES_ROUTE_PREFIX}/{suffix}");
    path.trim_end_matches('/').to_string()
}

/// Join a backend base URL, an upstream path and an optional raw query.
///
/// Exactly one `/` separates base and path; any path prefix on the base is kept.
pub fn build_target_url(base: &Url, upstream_path: &str, query: Option<&str>) -> String {
    let mut target = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        upstream_path.trim_start_matches('/')
    );
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Headers for the outbound request.
///
/// Everything is copied except `Host` and `Content-Length`, which the
/// outbound client recomputes. `X-Forwarded-Host` and `X-Forwarded-Proto`
/// describe the inbound request; the client address is appended to any
/// existing `X-Forwarded-For` chain.
pub fn outbound_headers(request: &InboundRequest) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(request.headers.len() + 3);
    for (name, value) in request.headers.iter() {
        if name == header::HOST || name == header::CONTENT_LENGTH || name == X_FORWARDED_FOR {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let Some(value) = request.host().and_then(|h| HeaderValue::from_str(h).ok()) {
        headers.insert(X_FORWARDED_HOST, value);
    }
    if let Ok(value) = HeaderValue::from_str(request.scheme()) {
        headers.insert(X_FORWARDED_PROTO, value);
    }
    if let Some(value) = forwarded_for(&request.headers, request.client_addr) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    headers
}

/// `X-Forwarded-For` value: prior chain (all header lines joined) plus the client.
///
/// Prior lines are copied as raw bytes so obs-text hops are kept.
fn forwarded_for(inbound: &HeaderMap, client: Option<IpAddr>) -> Option<HeaderValue> {
    let mut chain: Vec<u8> = Vec::new();
    let hops = inbound
        .get_all(X_FORWARDED_FOR)
        .iter()
        .map(|v| v.as_bytes().trim_ascii())
        .filter(|v| !v.is_empty());
    for hop in hops {
        if !chain.is_empty() {
            chain.extend_from_slice(b", ");
        }
        chain.extend_from_slice(hop);
    }

    if let Some(client) = client {
        if !chain.is_empty() {
            chain.extend_from_slice(b", ");
        }
        chain.extend_from_slice(client.to_string().as_bytes());
    }

    if chain.is_empty() {
        None
    } else {
        HeaderValue::from_bytes(&chain).ok()
    }
}
