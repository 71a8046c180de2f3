//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// A relative `redirects.directory` is resolved against the directory that
/// contains the config file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse_config(&content)?;

    if config.redirects.directory.is_relative() {
        if let Some(base) = path.parent() {
            config.redirects.directory = base.join(&config.redirects.directory);
        }
    }

    Ok(config)
}

/// Load `path` if given, otherwise validated defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = ProxyConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogFormat;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [upstream]
            address = "127.0.0.1:3000"

            [timeouts]
            request_secs = 5

            [redirects]
            directory = "/srv/site/redirects"
            append_slash = false
            strict = false

            [observability]
            log_level = "debug"
            log_format = "json"
            log_broken_links = false
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.upstream.address.as_deref(), Some("127.0.0.1:3000"));
        assert_eq!(config.timeouts.request_secs, 5);
        assert_eq!(config.redirects.directory, PathBuf::from("/srv/site/redirects"));
        assert!(!config.redirects.append_slash);
        assert!(!config.redirects.strict);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert!(!config.observability.log_broken_links);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.upstream.address, None);
        assert!(config.redirects.strict);
        assert!(config.redirects.append_slash);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_log_format_is_a_parse_error() {
        let err = parse_config("[observability]\nlog_format = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors_surface() {
        let err = parse_config("[timeouts]\nrequest_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("request_secs"));
    }

    #[test]
    fn test_relative_directory_resolves_against_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redirect-fallback.toml");
        fs::write(&path, "[redirects]\ndirectory = \"rules\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.redirects.directory, dir.path().join("rules"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
