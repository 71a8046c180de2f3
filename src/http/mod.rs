//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware/broken_links.rs (observes the final status)
//!     → middleware/redirect_fallback.rs (rewrites upstream 404s)
//!     → server.rs proxy handler → upstream application
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::{absolute_uri, X_REQUEST_ID};
pub use server::HttpServer;
