//! Request inspection helpers.
//!
//! # Responsibilities
//! - Reconstruct the absolute URI a client requested
//! - Expose the request ID assigned at the edge of the service
//!
//! # Design Decisions
//! - `X-Forwarded-Proto` wins over the URI scheme, since TLS usually ends
//!   at a load balancer in front of this service
//! - The `Host` header is used when the request target is origin-form

use axum::http::{header, HeaderName, Request};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Header set by TLS-terminating proxies.
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// `scheme://host[:port]/path` for `req`, or `None` without a host.
pub fn absolute_uri<B>(req: &Request<B>) -> Option<String> {
    let uri = req.uri();

    let host = match uri.authority() {
        Some(authority) => authority.as_str(),
        None => req.headers().get(header::HOST)?.to_str().ok()?,
    };
    if host.is_empty() {
        return None;
    }

    // Chained proxies append to the header; the first entry is the client's.
    let scheme = req
        .headers()
        .get(X_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|proto| !proto.is_empty())
        .or_else(|| uri.scheme_str())
        .unwrap_or("http")
        .to_ascii_lowercase();

    Some(format!("{}://{}{}", scheme, host.to_ascii_lowercase(), uri.path()))
}

/// The request ID, or `"unknown"` when none was assigned.
pub fn request_id<B>(req: &Request<B>) -> &str {
    req.headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
}
