//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressStore` operations that report failures
/// (import). Load, save and clear log and swallow theirs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("progress document is invalid: {0}")]
    InvalidDocument(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while fetching the test report.
///
/// The display text is what the learner sees in the results panel.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportSourceError {
    #[error("Test results not found - run the test command first")]
    NotFound,
    #[error("Test results could not be read: {0}")]
    Unreadable(String),
    #[error("Test results are malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors emitted by the run-trigger client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunTriggerError {
    #[error("test runner responded with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
