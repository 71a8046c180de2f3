//! Redirect rule data model.
//!
//! # Responsibilities
//! - Hold raw records exactly as read from rule files
//! - Normalize records into immutable [`Redirect`] values
//! - Split sources and targets into scheme/host/path for cycle analysis
//!
//! # Design Decisions
//! - An empty target always means `410 Gone`, whatever status was declared
//! - A present target without a status defaults to `301 Moved Permanently`
//! - Absolute URLs are canonicalized (lowercase host, default port dropped)
//!   and rooted paths percent-encoded, so that table keys and request URIs
//!   compare byte-for-byte
//! - Query strings and fragments never take part in matching

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// Status used when a rule has a target but no declared status.
pub const DEFAULT_STATUS: u16 = 301;

/// Status forced onto every rule without a target.
pub const GONE_STATUS: u16 = 410;

/// Base used to resolve path-only references against each other.
const PATH_ANCHOR: &str = "http://path.invalid/";

/// Returns true for statuses a rule may carry: any 3xx, or 410.
pub fn is_valid_status(code: u16) -> bool {
    (300..=399).contains(&code) || code == GONE_STATUS
}

/// One rule as read from a rule file, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRedirect {
    pub source: String,
    pub target: Option<String>,
    pub status_code: Option<u16>,
    pub origin_file: PathBuf,
    pub origin_line: usize,
}

impl RawRedirect {
    /// Convenience constructor used by tests and programmatic callers.
    pub fn new(source: impl Into<String>, target: Option<&str>, status_code: Option<u16>) -> Self {
        Self {
            source: source.into(),
            target: target.map(str::to_owned),
            status_code,
            origin_file: PathBuf::new(),
            origin_line: 0,
        }
    }

    /// Attach provenance to a record.
    pub fn at(mut self, file: impl Into<PathBuf>, line: usize) -> Self {
        self.origin_file = file.into();
        self.origin_line = line;
        self
    }
}

/// A normalized redirect rule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    source: String,
    target: Option<String>,
    status_code: u16,
    origin_file: PathBuf,
    origin_line: usize,
    source_url: RuleUrl,
    target_url: Option<RuleUrl>,
}

impl Redirect {
    /// Trim, parse and resolve the status code of a raw record.
    pub fn from_raw(raw: RawRedirect) -> Self {
        let source = raw.source.trim().to_owned();
        let target = raw
            .target
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);

        let status_code = match target {
            None => GONE_STATUS,
            Some(_) => raw.status_code.unwrap_or(DEFAULT_STATUS),
        };

        let source_url = RuleUrl::parse(&source);
        let target_url = target.as_deref().map(RuleUrl::parse);

        Self {
            source,
            target,
            status_code,
            origin_file: raw.origin_file,
            origin_line: raw.origin_line,
            source_url,
            target_url,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn origin_file(&self) -> &Path {
        &self.origin_file
    }

    pub fn origin_line(&self) -> usize {
        self.origin_line
    }

    pub fn source_url(&self) -> &RuleUrl {
        &self.source_url
    }

    pub fn target_url(&self) -> Option<&RuleUrl> {
        self.target_url.as_ref()
    }

    /// Canonical lookup key for this rule's source.
    pub fn key(&self) -> String {
        self.source_url.to_string()
    }

    /// True for `410 Gone` rules.
    pub fn is_gone(&self) -> bool {
        self.status_code == GONE_STATUS
    }
}

/// A rule source or target split into its URL parts.
///
/// `scheme` and `host` are both present for absolute URLs and both absent
/// for path-only references. `host` carries the port when it is not the
/// scheme's default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleUrl {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub path: String,
}

impl RuleUrl {
    /// Parse a rule string. Anything that is not an absolute URL with a
    /// host is treated as a path.
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if url.has_host() => Self::from_url(&url),
            _ => Self::path_only(raw),
        }
    }

    /// Rooted paths are percent-encoded, dot-segment normalized and
    /// stripped of query and fragment, matching what arrives in a request
    /// line. Relative references are kept verbatim for [`RuleUrl::join`].
    fn path_only(path: &str) -> Self {
        let path = if path.starts_with('/') && !path.starts_with("//") {
            Url::parse(PATH_ANCHOR)
                .and_then(|anchor| anchor.join(path))
                .map(|url| url.path().to_owned())
                .unwrap_or_else(|_| path.to_owned())
        } else {
            path.to_owned()
        };
        Self {
            scheme: None,
            host: None,
            path,
        }
    }

    fn from_url(url: &Url) -> Self {
        let host = url.host_str().map(|host| match url.port() {
            Some(port) => format!("{}:{}", host.to_ascii_lowercase(), port),
            None => host.to_ascii_lowercase(),
        });
        Self {
            scheme: Some(url.scheme().to_owned()),
            host,
            path: url.path().to_owned(),
        }
    }

    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    /// Resolve `reference` against `self`, the way a client follows a
    /// `Location` header received from `self`.
    pub fn join(&self, reference: &RuleUrl) -> RuleUrl {
        if reference.has_host() {
            return reference.clone();
        }

        if self.has_host() {
            return Url::parse(&self.to_string())
                .and_then(|base| base.join(&reference.path))
                .map(|url| Self::from_url(&url))
                .unwrap_or_else(|_| reference.clone());
        }

        let path = Url::parse(PATH_ANCHOR)
            .and_then(|anchor| anchor.join(&self.path))
            .and_then(|base| base.join(&reference.path))
            .map(|url| url.path().to_owned())
            .unwrap_or_else(|_| reference.path.clone());
        Self::path_only(&path)
    }

    /// The same URL with a `/` appended to its path.
    pub fn with_trailing_slash(&self) -> RuleUrl {
        let mut slashed = self.clone();
        slashed.path.push('/');
        slashed
    }
}

impl fmt::Display for RuleUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.scheme, &self.host) {
            (Some(scheme), Some(host)) => write!(f, "{}://{}{}", scheme, host, self.path),
            _ => f.write_str(&self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_target_is_gone() {
        let redirect = Redirect::from_raw(RawRedirect::new("/old/", None, Some(301)));
        assert_eq!(redirect.status_code(), 410);
        assert!(redirect.is_gone());
        assert_eq!(redirect.target(), None);

        let blank = Redirect::from_raw(RawRedirect::new("/old/", Some("   "), Some(302)));
        assert_eq!(blank.status_code(), 410);
        assert_eq!(blank.target(), None);
    }

    #[test]
    fn test_default_status() {
        let redirect = Redirect::from_raw(RawRedirect::new(" /foo/ ", Some(" /bar/ "), None));
        assert_eq!(redirect.source(), "/foo/");
        assert_eq!(redirect.target(), Some("/bar/"));
        assert_eq!(redirect.status_code(), 301);

        let declared = Redirect::from_raw(RawRedirect::new("/foo/", Some("/bar/"), Some(307)));
        assert_eq!(declared.status_code(), 307);
    }

    #[test]
    fn test_status_range() {
        assert!(is_valid_status(300));
        assert!(is_valid_status(308));
        assert!(is_valid_status(399));
        assert!(is_valid_status(410));
        assert!(!is_valid_status(200));
        assert!(!is_valid_status(404));
        assert!(!is_valid_status(400));
    }

    #[test]
    fn test_parse_absolute_and_path() {
        let url = RuleUrl::parse("http://WWW.Example.com/asdf/");
        assert_eq!(url.scheme.as_deref(), Some("http"));
        assert_eq!(url.host.as_deref(), Some("www.example.com"));
        assert_eq!(url.path, "/asdf/");
        assert_eq!(url.to_string(), "http://www.example.com/asdf/");

        let with_port = RuleUrl::parse("http://localhost:8080/x/");
        assert_eq!(with_port.host.as_deref(), Some("localhost:8080"));

        let default_port = RuleUrl::parse("https://example.com:443/x/");
        assert_eq!(default_port.to_string(), "https://example.com/x/");

        let path = RuleUrl::parse("/foo/bar/");
        assert!(!path.has_host());
        assert_eq!(path.to_string(), "/foo/bar/");
    }

    #[test]
    fn test_join() {
        let domain = RuleUrl::parse("http://www.example.com/bar/");
        let joined = domain.join(&RuleUrl::parse("/foo/"));
        assert_eq!(joined.to_string(), "http://www.example.com/foo/");

        let relative = domain.join(&RuleUrl::parse("baz/"));
        assert_eq!(relative.to_string(), "http://www.example.com/bar/baz/");

        let path = RuleUrl::parse("/a/b/");
        assert_eq!(path.join(&RuleUrl::parse("../c/")).to_string(), "/a/c/");
        assert_eq!(path.join(&RuleUrl::parse("/z/")).to_string(), "/z/");

        let other = RuleUrl::parse("http://other.com/x/");
        assert_eq!(path.join(&other), other);
    }

    #[test]
    fn test_paths_are_percent_encoded() {
        assert_eq!(RuleUrl::parse("/a b/").path, "/a%20b/");
        assert_eq!(RuleUrl::parse("/café/").path, "/caf%C3%A9/");
        assert_eq!(RuleUrl::parse("/caf%C3%A9/").path, "/caf%C3%A9/");
        assert_eq!(RuleUrl::parse("/a/./b/../c/").path, "/a/c/");

        let absolute = RuleUrl::parse("http://example.com/über/");
        assert_eq!(absolute.path, "/%C3%BCber/");
    }

    #[test]
    fn test_query_is_not_part_of_the_path() {
        assert_eq!(RuleUrl::parse("/x/?a=1").path, "/x/");
        assert_eq!(RuleUrl::parse("/x/#top").path, "/x/");
        assert_eq!(RuleUrl::parse("http://example.com/x/?a=1").to_string(), "http://example.com/x/");
    }

    #[test]
    fn test_relative_and_protocol_relative_kept_verbatim() {
        assert_eq!(RuleUrl::parse("baz/").path, "baz/");
        assert_eq!(RuleUrl::parse("//cdn.example.com/x/").path, "//cdn.example.com/x/");
    }

    #[test]
    fn test_trailing_slash_variant() {
        let url = RuleUrl::parse("/foo");
        assert_eq!(url.with_trailing_slash().path, "/foo/");
    }
}
