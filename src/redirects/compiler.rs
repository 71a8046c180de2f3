//! Rule compilation and static analysis.
//!
//! # Responsibilities
//! - Normalize raw records into [`Redirect`] rules
//! - Reject status codes that are neither 3xx nor 410
//! - Warn on duplicate sources (last declaration wins)
//! - Detect self-redirects, redirect chains and cycles
//! - Flag domain-dependent loops that cannot be proven statically
//!
//! # Design Decisions
//! - The whole batch is analyzed before any abort decision, so an operator
//!   sees every problem in one pass
//! - Strict compilation fails with every error listed, not just the first
//! - Validate-only compilation never fails; it returns all diagnostics
//! - A rule whose target is itself a live source is an error even when the
//!   chain terminates: every hop costs the client a round-trip
//! - Cross-domain rules are never reported; no single server realizes them
//! - A re-declaration with an invalid status still replaces the earlier
//!   rule, leaving the source undeclared in the table

use std::collections::HashSet;

use thiserror::Error;

use crate::redirects::diagnostic::{Diagnostic, Severity};
use crate::redirects::rule::{is_valid_status, RawRedirect, Redirect, RuleUrl};
use crate::redirects::table::RuleTable;

/// Compilation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Fail on any error diagnostic.
    pub strict: bool,
    /// The serving layer appends a trailing slash and retries unmatched
    /// paths; analyze slash-appended targets too.
    pub append_slash: bool,
}

impl CompileOptions {
    /// Options for building the table a server will use.
    pub fn strict() -> Self {
        Self {
            strict: true,
            append_slash: false,
        }
    }

    /// Options for linting: collect everything, never fail.
    pub fn validate_only() -> Self {
        Self {
            strict: false,
            append_slash: false,
        }
    }

    pub fn with_append_slash(mut self, append_slash: bool) -> Self {
        self.append_slash = append_slash;
        self
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::strict()
    }
}

/// The result of a successful compilation.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub table: RuleTable,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }
}

/// Error type for strict compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid redirect configuration: {}", join_messages(.errors))]
    Invalid { errors: Vec<Diagnostic> },
}

fn join_messages(errors: &[Diagnostic]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of following one rule's target.
#[derive(Debug, PartialEq, Eq)]
enum Loop {
    /// The target is, or leads straight back into, the rule table.
    Definite,
    /// Only loops if the application is served on `host`.
    Possible(String),
}

/// Compile raw records into a rule table.
pub fn compile<I>(records: I, options: &CompileOptions) -> Result<Compilation, CompileError>
where
    I: IntoIterator<Item = RawRedirect>,
{
    let mut table = RuleTable::default();
    let mut diagnostics = Vec::new();
    let mut declared = HashSet::new();

    for raw in records {
        let redirect = Redirect::from_raw(raw);
        if redirect.source().is_empty() {
            continue;
        }

        if !declared.insert(redirect.key()) {
            diagnostics.push(Diagnostic::warning(&redirect, "Duplicate declaration of url"));
        }

        // The latest declaration wins even when it is invalid.
        if !is_valid_status(redirect.status_code()) {
            diagnostics.push(Diagnostic::error(
                &redirect,
                format!("Non 3xx/410 status code({})", redirect.status_code()),
            ));
            table.remove(redirect.source());
            continue;
        }

        table.insert(redirect);
    }

    for redirect in table.iter() {
        check_loops(&table, redirect, options, &mut diagnostics);
    }

    if options.strict {
        for diagnostic in diagnostics.iter().filter(|d| !d.is_error()) {
            tracing::warn!(
                file = %diagnostic.origin_file.display(),
                line = diagnostic.origin_line,
                "{}",
                diagnostic.message
            );
        }

        let errors: Vec<Diagnostic> = diagnostics.iter().filter(|d| d.is_error()).cloned().collect();
        if !errors.is_empty() {
            return Err(CompileError::Invalid { errors });
        }
    }

    Ok(Compilation { table, diagnostics })
}

fn check_loops(
    table: &RuleTable,
    redirect: &Redirect,
    options: &CompileOptions,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let (Some(target), Some(target_url)) = (redirect.target(), redirect.target_url()) else {
        return;
    };
    let source_url = redirect.source_url();

    match follow(table, source_url, target_url) {
        Some(Loop::Definite) => {
            diagnostics.push(Diagnostic::error(
                redirect,
                format!("Circular redirect: {} => {}", redirect.source(), target),
            ));
        }
        Some(Loop::Possible(host)) => {
            diagnostics.push(Diagnostic::warning(
                redirect,
                format!("Possible circular redirect if hosting on domain {}", host),
            ));
        }
        None if options.append_slash && !target_url.path.ends_with('/') => {
            let slashed = target_url.with_trailing_slash();
            if follow(table, source_url, &slashed).is_some() {
                diagnostics.push(Diagnostic::warning(
                    redirect,
                    format!(
                        "Possible circular redirect if a trailing slash is appended: {} => {}",
                        redirect.source(),
                        slashed
                    ),
                ));
            }
        }
        None => {}
    }
}

/// Follow `target` as a client would from `source` and report whether the
/// request lands back in the rule table.
fn follow(table: &RuleTable, source: &RuleUrl, target: &RuleUrl) -> Option<Loop> {
    let resolved = source.join(target);
    if resolved == *source || is_live(table, &resolved.to_string()) {
        return Some(Loop::Definite);
    }

    match (&source.host, &target.host) {
        // Bare-path fallback in the resolver catches the resolved path too.
        (_, None) => is_live(table, &resolved.path).then_some(Loop::Definite),
        (Some(source_host), Some(target_host)) if source_host == target_host => {
            is_live(table, &target.path).then_some(Loop::Definite)
        }
        (None, Some(target_host)) => {
            let lands_on_rule = target.path == source.path || is_live(table, &target.path);
            lands_on_rule.then(|| Loop::Possible(target_host.clone()))
        }
        _ => None,
    }
}

/// A declared source that actually redirects somewhere.
fn is_live(table: &RuleTable, source: &str) -> bool {
    table.get(source).is_some_and(|redirect| !redirect.is_gone())
}
