//! Redirect fallback service library.
//!
//! Compiles CSV redirect rules into an immutable lookup table, validates
//! them for status-code mistakes, duplicates and redirect loops, and
//! answers requests that an upstream application could not serve (404)
//! with the matching redirect or `410 Gone`.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod redirects;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use redirects::{compile, CompileOptions, RuleTable};
