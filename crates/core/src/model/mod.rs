mod completion;
mod ids;
mod report;
mod run;
mod suite;

pub use completion::{CompletedSet, CompletionRecord, toggle};
pub use ids::{ExerciseId, ExerciseIdError};
pub use report::{AssertionResult, AssertionStatus, SuiteReport, TestReportDocument};
pub use run::{RunAccepted, RunRejected, RunRequest, RunStatus};
pub use suite::{NormalizedSuite, NormalizedTest, ReportStats, TestStatus, normalize_report};
