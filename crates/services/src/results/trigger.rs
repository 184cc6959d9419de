use std::time::Duration;

use async_trait::async_trait;
use course_core::model::{RunRequest, RunStatus};
use reqwest::{Client, StatusCode};
use tracing::warn;

use crate::error::RunTriggerError;

/// Answer of the runner to a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartResponse {
    Accepted,
    /// A run is already in progress on the runner.
    Conflict,
}

/// Client side of the run-trigger service.
#[async_trait]
pub trait RunTriggerClient: Send + Sync {
    /// Ask the runner to start a test run.
    ///
    /// # Errors
    ///
    /// Returns `RunTriggerError` if the runner is unreachable or answers with
    /// anything other than accept/conflict.
    async fn start_run(&self, request: &RunRequest) -> Result<StartResponse, RunTriggerError>;

    /// Whether the runner is still executing a run.
    ///
    /// # Errors
    ///
    /// Returns `RunTriggerError` if the runner is unreachable.
    async fn run_status(&self) -> Result<RunStatus, RunTriggerError>;
}

/// Upper bound on a single request to the runner.
pub const RUNNER_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpRunTriggerClient {
    client: Client,
    base_url: String,
}

impl HttpRunTriggerClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(RUNNER_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "falling back to a runner client without timeout");
                Client::new()
            });
        Self::with_client(client, base_url)
    }

    #[must_use]
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RunTriggerClient for HttpRunTriggerClient {
    async fn start_run(&self, request: &RunRequest) -> Result<StartResponse, RunTriggerError> {
        let response = self
            .client
            .post(self.endpoint("run-tests"))
            .json(request)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(StartResponse::Accepted),
            StatusCode::CONFLICT => Ok(StartResponse::Conflict),
            status => Err(RunTriggerError::HttpStatus(status)),
        }
    }

    async fn run_status(&self) -> Result<RunStatus, RunTriggerError> {
        let response = self
            .client
            .get(self.endpoint("test-status"))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RunTriggerError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}
