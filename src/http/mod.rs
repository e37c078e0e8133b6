//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, body limit)
//!     → request.rs (capture inbound request, build target URL and headers)
//!     → [routing::selector picks monolith or movies]
//!     → forward.rs (upstream round trip with deadlines)
//!     → response.rs (strip hop-by-hop headers, add X-Target-Service)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder};
pub use request::{InboundRequest, X_REQUEST_ID};
pub use response::{OutboundResponse, X_TARGET_SERVICE};
pub use server::HttpServer;
