//! CLI command implementations.
//!
//! Each submodule owns the arguments of one command group and runs it
//! against a [`Context`]: an API client backed by the on-disk storage file.

pub mod auth;
pub mod brand;
pub mod env;
pub mod events;
pub mod integrations;
pub mod keys;
pub mod logs;
pub mod media;
pub mod templates;
pub mod users;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use xyno_client::{ApiClient, ApiError, ClientConfig, FileStorage, StorageError};
use xyno_core::Environment;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// The API rejected the call or could not be reached.
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),

    /// The storage file could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// A local file could not be read.
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Terminal input failed.
    #[error("Input error: {0}")]
    Input(#[from] std::io::Error),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),

    /// No storage path given and no home directory to default to.
    #[error("Cannot locate a home directory; pass --storage or set XYNO_STORAGE")]
    NoHome,

    /// A remote check ran and reported failure.
    #[error("{0}")]
    CheckFailed(String),

    /// Arguments that parse but make no sense together.
    #[error("{0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Whether the stored session is gone and the user must sign in again.
    #[must_use]
    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::Api(ApiError::SessionExpired))
    }
}

/// `~/.config/xyno/storage.json`.
///
/// # Errors
///
/// Returns [`CliError::NoHome`] if `HOME` is not set.
pub fn default_storage_path() -> Result<PathBuf, CliError> {
    let home = std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .ok_or(CliError::NoHome)?;
    Ok(PathBuf::from(home).join(".config/xyno/storage.json"))
}

/// Everything a command needs.
pub struct Context {
    pub client: ApiClient,
    /// Print raw JSON instead of human readable output.
    pub json: bool,
}

impl Context {
    /// Open the storage file and build a client on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage file is unreadable or the API URL is
    /// invalid.
    pub fn open(api_url: &str, storage_path: PathBuf, json: bool) -> Result<Self, CliError> {
        debug!(path = %storage_path.display(), "Opening storage");
        let storage = FileStorage::open(storage_path)?;
        let client = ApiClient::builder(ClientConfig::with_base_url(api_url))
            .storage(Arc::new(storage))
            .build()?;
        Ok(Self { client, json })
    }

    /// Promotion copies sandbox records into production, so it is refused
    /// locally while production is selected.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::InvalidArgument`] outside sandbox.
    pub fn require_sandbox(&self) -> Result<(), CliError> {
        if self.client.environment().current().is_sandbox() {
            Ok(())
        } else {
            Err(CliError::InvalidArgument(
                "Promotion is only available from sandbox. Run `xyno env set sandbox` first."
                    .to_string(),
            ))
        }
    }

    /// Print `value` as JSON when `--json` is set, otherwise run `human`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be serialized.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

// =============================================================================
// Output helpers
// =============================================================================

/// Print rows as left-aligned columns under a header line.
pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = table_line(headers, &widths);
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&table_line(&cells, &widths));
    }
    out
}

fn table_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    format!("{}\n", padded.join("  ").trim_end())
}

/// `yes`/`no` column value.
#[must_use]
pub const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// Environment column value.
#[must_use]
pub fn env_label(environment: Option<Environment>) -> &'static str {
    environment.map_or("-", Environment::as_str)
}

/// Parse repeated `key=value` arguments.
///
/// # Errors
///
/// Returns [`CliError::InvalidArgument`] for a pair without `=` or with a
/// blank key.
pub fn parse_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>, CliError> {
    pairs
        .iter()
        .map(|pair| {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                CliError::InvalidArgument(format!("Expected key=value, got \"{pair}\""))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::InvalidArgument(format!(
                    "Missing key in \"{pair}\""
                )));
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Read a local file for upload.
///
/// # Errors
///
/// Returns [`CliError::ReadFile`] if the file cannot be read.
pub fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|source| CliError::ReadFile {
        path: path.to_path_buf(),
        source,
    })
}

/// File name component of `path`, for upload metadata.
#[must_use]
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let pairs = parse_pairs(&["name=Ada".to_string(), "url=https://x.test/?a=b".to_string()])
            .unwrap();
        assert_eq!(pairs["name"], "Ada");
        assert_eq!(pairs["url"], "https://x.test/?a=b");
    }

    #[test]
    fn test_parse_pairs_rejects_missing_separator() {
        let err = parse_pairs(&["name".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "Expected key=value, got \"name\"");
        assert!(parse_pairs(&[" =x".to_string()]).is_err());
    }

    #[test]
    fn test_render_table_aligns_columns() {
        let out = render_table(
            &["ID", "NAME"],
            &[
                vec!["1".to_string(), "Welcome".to_string()],
                vec!["12".to_string(), "Receipt".to_string()],
            ],
        );
        assert_eq!(out, "ID  NAME\n1   Welcome\n12  Receipt\n");
    }

    #[test]
    fn test_session_expired_detection() {
        assert!(CliError::Api(ApiError::SessionExpired).is_session_expired());
        assert!(
            !CliError::Api(ApiError::Status {
                status: 401,
                body: String::new()
            })
            .is_session_expired()
        );
    }

    #[test]
    fn test_api_error_displays_user_message() {
        let err = CliError::Api(ApiError::Status {
            status: 400,
            body: r#"{"detail": "Template is not in sandbox"}"#.to_string(),
        });
        assert_eq!(err.to_string(), "Template is not in sandbox");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name(Path::new("/tmp/mail/welcome.html")), "welcome.html");
    }
}
