use std::collections::BTreeSet;
use std::sync::Arc;

use course_core::filter::SuiteMap;
use course_core::model::{ExerciseId, NormalizedSuite, NormalizedTest, ReportStats, TestStatus};
use course_core::sanitize_failure_message;
use services::{RunPhase, SyncSnapshot};

use crate::vm::time_fmt::format_epoch_millis;

/// Suites the learner has expanded, keyed by suite file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExpandedSuites {
    files: Arc<BTreeSet<String>>,
}

impl ExpandedSuites {
    #[must_use]
    pub fn contains(&self, file: &str) -> bool {
        self.files.contains(file)
    }

    /// A new set with `file` flipped.
    #[must_use]
    pub fn toggled(&self, file: &str) -> Self {
        let mut files = (*self.files).clone();
        if !files.remove(file) {
            files.insert(file.to_string());
        }
        Self {
            files: Arc::new(files),
        }
    }
}

/// `src/__tests__/03-Session1-Lists.test.tsx` -> `03-Session1-Lists`.
#[must_use]
pub fn display_file_name(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    name.strip_suffix(".test.tsx").unwrap_or(name).to_string()
}

#[derive(Clone, Debug, PartialEq)]
pub struct TestRowVm {
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: f64,
    pub error: Option<String>,
}

impl From<&NormalizedTest> for TestRowVm {
    fn from(test: &NormalizedTest) -> Self {
        Self {
            name: test.name.clone(),
            status: test.status,
            duration_ms: test.duration_ms,
            error: test.error.as_deref().map(sanitize_failure_message),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SuiteVm {
    /// Raw suite file; the key for expand/collapse.
    pub key: String,
    pub file_name: String,
    pub expanded: bool,
    pub pass_count: usize,
    pub fail_count: usize,
    pub skip_count: usize,
    pub tests: Vec<TestRowVm>,
}

impl SuiteVm {
    fn new(suite: &NormalizedSuite, expanded: &ExpandedSuites) -> Self {
        Self {
            key: suite.file.clone(),
            file_name: display_file_name(&suite.file),
            expanded: expanded.contains(&suite.file),
            pass_count: suite.pass_count,
            fail_count: suite.fail_count,
            skip_count: suite.skip_count,
            tests: suite.tests.iter().map(TestRowVm::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultsVm {
    pub loading: bool,
    pub error: Option<String>,
    pub suites: Vec<SuiteVm>,
    pub stats: ReportStats,
    pub progress_percent: u8,
    pub last_updated: Option<String>,
    pub running: bool,
    pub can_run: bool,
    pub notice: Option<&'static str>,
}

impl ResultsVm {
    #[must_use]
    pub fn has_results(&self) -> bool {
        !self.suites.is_empty()
    }

    /// One-line summary, e.g. `3/5 passed (60%), 2 failed, 0 skipped`.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "{}/{} passed ({}%), {} failed, {} skipped",
            self.stats.total_pass,
            self.stats.total_tests,
            self.progress_percent,
            self.stats.total_fail,
            self.stats.total_skip
        )
    }
}

/// Build the results view for the currently selected exercise.
#[must_use]
pub fn map_results(
    snapshot: &SyncSnapshot,
    selected: Option<&ExerciseId>,
    suite_map: &SuiteMap,
    expanded: &ExpandedSuites,
) -> ResultsVm {
    let visible = snapshot.suites_for(selected, suite_map);
    let stats = ReportStats::from_suites(&visible);

    ResultsVm {
        loading: snapshot.loading,
        error: snapshot.error.clone(),
        suites: visible
            .iter()
            .map(|suite| SuiteVm::new(suite, expanded))
            .collect(),
        progress_percent: stats.progress_percent(),
        stats,
        last_updated: snapshot
            .report
            .as_ref()
            .and_then(|report| format_epoch_millis(report.start_time)),
        running: snapshot.run_phase != RunPhase::NotRunning,
        can_run: snapshot.can_start_run(),
        notice: snapshot.notice.map(|notice| notice.message()),
    }
}
