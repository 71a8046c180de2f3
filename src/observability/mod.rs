//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (compiler warnings, redirects served, broken links)
//!     → logging.rs (subscriber: filter + pretty/JSON formatter)
//!
//! Consumers:
//!     → stderr, for the process supervisor or log aggregation
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every request span

pub mod logging;
