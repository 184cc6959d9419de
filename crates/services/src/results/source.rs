use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use course_core::model::TestReportDocument;
use reqwest::{Client, StatusCode};

use crate::error::ReportSourceError;

/// Where the test runner's report document is read from.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch and parse the current report.
    ///
    /// # Errors
    ///
    /// Returns `ReportSourceError` if the report is missing, unreadable or
    /// not a well-formed report.
    async fn fetch_report(&self) -> Result<TestReportDocument, ReportSourceError>;
}

/// Reads the report from the file the runner writes.
#[derive(Clone, Debug)]
pub struct FileReportSource {
    path: PathBuf,
}

impl FileReportSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReportSource for FileReportSource {
    async fn fetch_report(&self) -> Result<TestReportDocument, ReportSourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => ReportSourceError::NotFound,
                _ => ReportSourceError::Unreadable(err.to_string()),
            })?;
        Ok(TestReportDocument::from_json(&raw)?)
    }
}

/// Fetches the report from the dev server that publishes it.
#[derive(Clone)]
pub struct HttpReportSource {
    client: Client,
    url: String,
}

impl HttpReportSource {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), url)
    }

    #[must_use]
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReportSource for HttpReportSource {
    async fn fetch_report(&self) -> Result<TestReportDocument, ReportSourceError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| ReportSourceError::Unreadable(err.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(ReportSourceError::NotFound),
            status => {
                return Err(ReportSourceError::Unreadable(format!(
                    "report request returned {status}"
                )));
            }
        }

        let raw = response
            .text()
            .await
            .map_err(|err| ReportSourceError::Unreadable(err.to_string()))?;
        Ok(TestReportDocument::from_json(&raw)?)
    }
}
