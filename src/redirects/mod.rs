//! Redirect rule subsystem.
//!
//! # Data Flow
//! ```text
//! redirects/*.csv
//!     → source.rs (scan directory, parse records)
//!     → compiler.rs (normalize, validate, detect loops)
//!     → RuleTable (immutable, shared via Arc)
//!
//! Per request that would otherwise 404:
//!     absolute URI → RuleTable::resolve → RedirectResponse
//!     bare path    ↗ (fallback)
//! ```
//!
//! # Design Decisions
//! - Rules are compiled once at startup; there is no partial update path
//! - Strict mode aborts on errors; validate-only mode reports everything
//! - Lookup is two hash probes, no I/O

pub mod compiler;
pub mod diagnostic;
pub mod rule;
pub mod source;
pub mod table;

use std::path::Path;

pub use compiler::{compile, Compilation, CompileError, CompileOptions};
pub use diagnostic::{Diagnostic, Severity};
pub use rule::{RawRedirect, Redirect, RuleUrl};
pub use source::SourceError;
pub use table::{RedirectResponse, RuleTable};

/// Lint a rules directory: read every file and compile in validate-only mode.
pub fn validate_directory(dir: &Path, append_slash: bool) -> Result<Compilation, SourceError> {
    let records = source::read_directory(dir)?;
    let options = CompileOptions::validate_only().with_append_slash(append_slash);
    // Validate-only compilation never fails.
    Ok(compile(records, &options).unwrap_or_else(|CompileError::Invalid { errors }| Compilation {
        table: RuleTable::default(),
        diagnostics: errors,
    }))
}
