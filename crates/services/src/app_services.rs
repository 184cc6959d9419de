use std::sync::Arc;

use course_core::filter::SuiteMap;
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress_store::ProgressStore;
use crate::results::{
    FileReportSource, HttpReportSource, HttpRunTriggerClient, ReportSource, ResultSync,
    RunTriggerClient, SyncConfig,
};

/// Where reports come from and where the runner listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicesConfig {
    /// A file path, or an `http(s)://` URL serving the report.
    pub report_location: String,
    pub runner_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            report_location: "public/test-results.json".into(),
            runner_url: "http://localhost:3001".into(),
        }
    }
}

impl ServicesConfig {
    /// Defaults overridden by `COURSE_REPORT_PATH` and `COURSE_RUNNER_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(report) = non_empty_var("COURSE_REPORT_PATH") {
            config.report_location = report;
        }
        if let Some(runner) = non_empty_var("COURSE_RUNNER_URL") {
            config.runner_url = runner;
        }
        config
    }

    fn report_source(&self) -> Arc<dyn ReportSource> {
        let location = self.report_location.as_str();
        if location.starts_with("http://") || location.starts_with("https://") {
            Arc::new(HttpReportSource::new(location))
        } else {
            Arc::new(FileReportSource::new(location))
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressStore>,
    suite_map: SuiteMap,
    reports: Arc<dyn ReportSource>,
    trigger: Arc<dyn RunTriggerClient>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: &ServicesConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, config))
    }

    /// Build services over process-local storage; progress is lost on exit.
    #[must_use]
    pub fn new_in_memory(clock: Clock, config: &ServicesConfig) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, config)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: &ServicesConfig) -> Self {
        Self {
            progress: Arc::new(ProgressStore::new(clock, Arc::clone(&storage.documents))),
            suite_map: SuiteMap::default(),
            reports: config.report_source(),
            trigger: Arc::new(HttpRunTriggerClient::new(config.runner_url.clone())),
        }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn suite_map(&self) -> &SuiteMap {
        &self.suite_map
    }

    #[must_use]
    pub fn report_source(&self) -> Arc<dyn ReportSource> {
        Arc::clone(&self.reports)
    }

    #[must_use]
    pub fn run_trigger(&self) -> Arc<dyn RunTriggerClient> {
        Arc::clone(&self.trigger)
    }

    /// A fresh, unmounted coordinator for one results view.
    #[must_use]
    pub fn result_sync(&self, config: SyncConfig) -> ResultSync {
        ResultSync::new(
            Arc::clone(&self.reports),
            Arc::clone(&self.trigger),
            self.suite_map.clone(),
            config,
        )
    }
}
