use serde::{Deserialize, Serialize};

/// Report written by the external test runner after each run.
///
/// Read-only on this side: it is fetched from scratch on every poll and
/// never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReportDocument {
    pub num_total_tests: u32,
    pub num_passed_tests: u32,
    pub num_failed_tests: u32,
    #[serde(default)]
    pub num_pending_tests: u32,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub start_time: i64,
    #[serde(default)]
    pub test_results: Vec<SuiteReport>,
}

/// Results of one test file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    /// Path of the file the suite came from.
    pub name: String,
    #[serde(default)]
    pub assertion_results: Vec<AssertionResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionResult {
    #[serde(default)]
    pub ancestor_titles: Vec<String>,
    pub full_name: String,
    pub status: AssertionStatus,
    /// Milliseconds; runners omit it for tests that never ran.
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub failure_messages: Vec<String>,
}

impl AssertionResult {
    /// The failure message shown to the learner (the first one reported).
    #[must_use]
    pub fn first_failure(&self) -> Option<&str> {
        self.failure_messages.first().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssertionStatus {
    Passed,
    Failed,
    Skipped,
    Pending,
    Todo,
    Disabled,
    #[serde(other)]
    Unknown,
}

impl TestReportDocument {
    /// Parse a report from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the text is not a well-formed report.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
