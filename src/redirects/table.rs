//! Compiled rule table and request resolution.
//!
//! # Responsibilities
//! - Store compiled rules keyed by canonical source
//! - Resolve a request (absolute URI, then bare path) to a response
//!
//! # Design Decisions
//! - Immutable after compilation; shared across requests via `Arc`
//! - Insertion order is preserved so diagnostics and iteration are stable
//! - A re-declared source keeps its first position but takes the new rule
//! - Domain-qualified rules win over path-only rules for the same path

use std::collections::HashMap;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::redirects::rule::{Redirect, RuleUrl};

/// Lookup table from rule source to rule.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Redirect>,
    index: HashMap<String, usize>,
}

impl RuleTable {
    /// Insert a rule, replacing any rule with the same source.
    ///
    /// Returns the replaced rule, if any.
    pub(crate) fn insert(&mut self, redirect: Redirect) -> Option<Redirect> {
        let key = redirect.key();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.rules[slot], redirect)),
            None => {
                self.index.insert(key, self.rules.len());
                self.rules.push(redirect);
                None
            }
        }
    }

    /// Remove the rule for `source`, keeping the order of the others.
    pub(crate) fn remove(&mut self, source: &str) -> Option<Redirect> {
        let slot = self.index.remove(&canonical_key(source))?;
        for index in self.index.values_mut() {
            if *index > slot {
                *index -= 1;
            }
        }
        Some(self.rules.remove(slot))
    }

    /// Look up a rule by source (path or absolute URL).
    pub fn get(&self, source: &str) -> Option<&Redirect> {
        let key = canonical_key(source);
        self.index.get(&key).map(|&slot| &self.rules[slot])
    }

    pub fn contains(&self, source: &str) -> bool {
        self.get(source).is_some()
    }

    /// Rules in declaration order (first declaration position wins).
    pub fn iter(&self) -> impl Iterator<Item = &Redirect> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Find the response for a request that would otherwise 404.
    ///
    /// `absolute_uri` is tried first so that a rule scoped to one domain
    /// takes precedence over a path-only rule for the same path.
    pub fn resolve(&self, request_path: &str, absolute_uri: &str) -> Option<RedirectResponse> {
        let redirect = self
            .lookup_absolute(absolute_uri)
            .or_else(|| self.get(request_path))?;
        RedirectResponse::for_rule(redirect)
    }

    fn lookup_absolute(&self, absolute_uri: &str) -> Option<&Redirect> {
        let url = RuleUrl::parse(absolute_uri);
        if !url.has_host() {
            return None;
        }
        self.index.get(&url.to_string()).map(|&slot| &self.rules[slot])
    }
}

fn canonical_key(source: &str) -> String {
    RuleUrl::parse(source.trim()).to_string()
}

/// The response synthesized for a matched rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectResponse {
    pub status: StatusCode,
    /// Absent for `410 Gone`.
    pub location: Option<String>,
}

impl RedirectResponse {
    fn for_rule(redirect: &Redirect) -> Option<Self> {
        let status = StatusCode::from_u16(redirect.status_code()).ok()?;
        let location = if redirect.is_gone() {
            None
        } else {
            redirect.target().map(str::to_owned)
        };
        Some(Self { status, location })
    }
}

impl IntoResponse for RedirectResponse {
    fn into_response(self) -> Response {
        let Some(location) = self.location else {
            return self.status.into_response();
        };

        match HeaderValue::from_str(&location) {
            Ok(value) => (self.status, [(header::LOCATION, value)]).into_response(),
            Err(e) => {
                tracing::error!(location = %location, error = %e, "Redirect target is not a valid header value");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
