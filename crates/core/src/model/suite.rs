use serde::Serialize;

use crate::model::report::{AssertionStatus, SuiteReport, TestReportDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
}

impl From<&AssertionStatus> for TestStatus {
    fn from(status: &AssertionStatus) -> Self {
        match status {
            AssertionStatus::Passed => Self::Pass,
            AssertionStatus::Skipped
            | AssertionStatus::Pending
            | AssertionStatus::Todo
            | AssertionStatus::Disabled => Self::Skip,
            AssertionStatus::Failed | AssertionStatus::Unknown => Self::Fail,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTest {
    pub name: String,
    pub status: TestStatus,
    pub duration_ms: f64,
    pub error: Option<String>,
}

/// Display-ready results of one test file. Derived, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSuite {
    pub file: String,
    pub tests: Vec<NormalizedTest>,
    pub pass_count: usize,
    pub fail_count: usize,
    pub skip_count: usize,
}

impl NormalizedSuite {
    /// Builds a suite and derives its tallies from `tests`.
    #[must_use]
    pub fn new(file: impl Into<String>, tests: Vec<NormalizedTest>) -> Self {
        let count = |status: TestStatus| tests.iter().filter(|t| t.status == status).count();
        Self {
            file: file.into(),
            pass_count: count(TestStatus::Pass),
            fail_count: count(TestStatus::Fail),
            skip_count: count(TestStatus::Skip),
            tests,
        }
    }

    /// Same file, different test list, tallies recomputed.
    #[must_use]
    pub fn with_tests(&self, tests: Vec<NormalizedTest>) -> Self {
        Self::new(self.file.clone(), tests)
    }
}

impl From<&SuiteReport> for NormalizedSuite {
    fn from(report: &SuiteReport) -> Self {
        let tests = report
            .assertion_results
            .iter()
            .map(|assertion| NormalizedTest {
                name: assertion.full_name.clone(),
                status: TestStatus::from(&assertion.status),
                duration_ms: assertion.duration.unwrap_or(0.0),
                error: assertion.first_failure().map(str::to_owned),
            })
            .collect();
        Self::new(report.name.clone(), tests)
    }
}

/// Normalize every suite of a report, preserving order.
#[must_use]
pub fn normalize_report(report: &TestReportDocument) -> Vec<NormalizedSuite> {
    report.test_results.iter().map(NormalizedSuite::from).collect()
}

/// Aggregate counts over a list of suites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportStats {
    pub total_tests: usize,
    pub total_pass: usize,
    pub total_fail: usize,
    pub total_skip: usize,
}

impl ReportStats {
    #[must_use]
    pub fn from_suites(suites: &[NormalizedSuite]) -> Self {
        suites.iter().fold(Self::default(), |acc, suite| Self {
            total_tests: acc.total_tests + suite.tests.len(),
            total_pass: acc.total_pass + suite.pass_count,
            total_fail: acc.total_fail + suite.fail_count,
            total_skip: acc.total_skip + suite.skip_count,
        })
    }

    /// Whole-number pass percentage, 0 when there are no tests.
    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        if self.total_tests == 0 {
            return 0;
        }
        let percent = (self.total_pass as f64 / self.total_tests as f64 * 100.0).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            percent.clamp(0.0, 100.0) as u8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::report::AssertionResult;

    fn assertion(name: &str, status: AssertionStatus, failure: Option<&str>) -> AssertionResult {
        AssertionResult {
            ancestor_titles: Vec::new(),
            full_name: name.to_string(),
            status,
            duration: Some(3.0),
            failure_messages: failure.map(|m| vec![m.to_string()]).unwrap_or_default(),
        }
    }

    #[test]
    fn normalizes_statuses_and_tallies() {
        let report = SuiteReport {
            name: "a.test.tsx".into(),
            assertion_results: vec![
                assertion("one", AssertionStatus::Passed, None),
                assertion("two", AssertionStatus::Failed, Some("nope")),
                assertion("three", AssertionStatus::Skipped, None),
                assertion("four", AssertionStatus::Todo, None),
                assertion("five", AssertionStatus::Unknown, None),
            ],
        };

        let suite = NormalizedSuite::from(&report);
        let statuses: Vec<TestStatus> = suite.tests.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                TestStatus::Pass,
                TestStatus::Fail,
                TestStatus::Skip,
                TestStatus::Skip,
                TestStatus::Fail
            ]
        );
        assert_eq!(
            (suite.pass_count, suite.fail_count, suite.skip_count),
            (1, 2, 2)
        );
        assert_eq!(suite.tests[1].error.as_deref(), Some("nope"));
        assert_eq!(suite.tests[0].error, None);
    }

    #[test]
    fn stats_sum_suites_and_round_percentage() {
        let pass = NormalizedTest {
            name: "p".into(),
            status: TestStatus::Pass,
            duration_ms: 1.0,
            error: None,
        };
        let fail = NormalizedTest {
            status: TestStatus::Fail,
            ..pass.clone()
        };
        let suites = vec![
            NormalizedSuite::new("a", vec![pass.clone(), pass.clone()]),
            NormalizedSuite::new("b", vec![fail]),
        ];

        let stats = ReportStats::from_suites(&suites);
        assert_eq!(stats.total_tests, 3);
        assert_eq!(stats.total_pass, 2);
        assert_eq!(stats.total_fail, 1);
        assert_eq!(stats.progress_percent(), 67);
    }

    #[test]
    fn empty_stats_report_zero_percent() {
        assert_eq!(ReportStats::default().progress_percent(), 0);
    }
}
