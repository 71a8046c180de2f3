//! Compiler diagnostics.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::redirects::rule::Redirect;

/// How bad a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but not provably wrong. Never blocks startup.
    Warning,
    /// Provably broken. Aborts a strict compilation.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// A single finding about one rule, attributed to where it was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub origin_file: PathBuf,
    pub origin_line: usize,
}

impl Diagnostic {
    pub fn warning(redirect: &Redirect, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, redirect, message)
    }

    pub fn error(redirect: &Redirect, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, redirect, message)
    }

    fn new(severity: Severity, redirect: &Redirect, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            origin_file: redirect.origin_file().to_path_buf(),
            origin_line: redirect.origin_line(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.origin_file.display(),
            self.origin_line,
            self.severity,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirects::rule::RawRedirect;

    #[test]
    fn test_display() {
        let redirect = Redirect::from_raw(
            RawRedirect::new("/a/", Some("/b/"), Some(200)).at("redirects/site.csv", 7),
        );
        let diagnostic = Diagnostic::error(&redirect, "Non 3xx/410 status code(200)");
        assert_eq!(
            diagnostic.to_string(),
            "redirects/site.csv:7: error: Non 3xx/410 status code(200)"
        );
        assert!(diagnostic.is_error());
    }

    #[test]
    fn test_serializes_lowercase_severity() {
        let redirect = Redirect::from_raw(RawRedirect::new("/a/", Some("/b/"), None).at("x.csv", 1));
        let diagnostic = Diagnostic::warning(&redirect, "Duplicate declaration of url");
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["origin_line"], 1);
        assert_eq!(json["message"], "Duplicate declaration of url");
    }
}
