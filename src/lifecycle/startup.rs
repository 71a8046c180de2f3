//! Startup orchestration.
//!
//! # Responsibilities
//! - Load redirect rule files from the configured directory
//! - Compile them with the configured strictness
//! - Hand back the immutable rule table the server shares
//!
//! # Design Decisions
//! - Fail fast: a broken rule table must never serve traffic
//! - In non-strict mode errors are logged and startup continues; rules with
//!   an invalid status never enter the table

use std::sync::Arc;

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::redirects::{self, CompileError, CompileOptions, RuleTable, SourceError};

/// Error type for startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Read and compile the redirect rules named by `config`.
pub fn prepare(config: &ProxyConfig) -> Result<Arc<RuleTable>, StartupError> {
    let settings = &config.redirects;
    let records = redirects::source::read_directory(&settings.directory)?;

    let options = CompileOptions {
        strict: settings.strict,
        append_slash: settings.append_slash,
    };
    let compilation = redirects::compile(records, &options)?;

    if !options.strict {
        for diagnostic in &compilation.diagnostics {
            if diagnostic.is_error() {
                tracing::error!(
                    file = %diagnostic.origin_file.display(),
                    line = diagnostic.origin_line,
                    "{}",
                    diagnostic.message
                );
            } else {
                tracing::warn!(
                    file = %diagnostic.origin_file.display(),
                    line = diagnostic.origin_line,
                    "{}",
                    diagnostic.message
                );
            }
        }
    }

    tracing::info!(
        directory = %settings.directory.display(),
        rules = compilation.table.len(),
        warnings = compilation.warnings().count(),
        errors = compilation.errors().count(),
        "Redirect rules compiled"
    );

    Ok(Arc::new(compilation.table))
}
