//! Rule file discovery and parsing.
//!
//! # Responsibilities
//! - Find every `*.csv` file under the configured rules directory
//! - Parse headerless `source,target,status_code` records
//! - Attach file/line provenance to every record
//!
//! # Design Decisions
//! - Files are visited in sorted order so that "last declaration wins"
//!   is reproducible across machines
//! - Trailing fields may be omitted; a missing target means `410 Gone`
//! - Rows with an empty source are skipped rather than rejected

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::redirects::rule::RawRedirect;

/// Extension of rule files, compared case-insensitively.
pub const RULE_FILE_EXTENSION: &str = "csv";

/// Error type for reading rule files.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("redirects directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("failed to scan redirects directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}:{line}: status code `{value}` is not a number", path.display())]
    InvalidStatus {
        path: PathBuf,
        line: usize,
        value: String,
    },
}

/// Read every rule file under `dir`.
pub fn read_directory(dir: &Path) -> Result<Vec<RawRedirect>, SourceError> {
    if !dir.is_dir() {
        return Err(SourceError::MissingDirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() && is_rule_file(entry.path()) {
            files.push(entry.into_path());
        }
    }

    let mut records = Vec::new();
    for file in &files {
        let before = records.len();
        records.extend(read_file(file)?);
        tracing::debug!(file = %file.display(), rules = records.len() - before, "Loaded redirect file");
    }

    Ok(records)
}

/// Read one rule file.
pub fn read_file(path: &Path) -> Result<Vec<RawRedirect>, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    read_records(file, path)
}

/// Parse rule records from any reader. `origin` is recorded as provenance.
pub fn read_records<R: Read>(reader: R, origin: &Path) -> Result<Vec<RawRedirect>, SourceError> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for result in csv.records() {
        let record = result.map_err(|source| SourceError::Csv {
            path: origin.to_path_buf(),
            source,
        })?;
        let line = record.position().map_or(0, |p| p.line() as usize);

        let source = record.get(0).unwrap_or_default();
        if source.trim().is_empty() {
            continue;
        }

        let target = record.get(1).filter(|t| !t.trim().is_empty());
        let status_code = match record.get(2).map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(value.parse::<u16>().map_err(|_| SourceError::InvalidStatus {
                path: origin.to_path_buf(),
                line,
                value: value.to_owned(),
            })?),
            None => None,
        };

        records.push(RawRedirect::new(source, target, status_code).at(origin, line));
    }

    Ok(records)
}

fn is_rule_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(RULE_FILE_EXTENSION))
}
