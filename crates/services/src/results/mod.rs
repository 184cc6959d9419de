//! Fetching, tracking and triggering test results.

pub mod source;
pub mod sync;
pub mod trigger;

pub use source::{FileReportSource, HttpReportSource, ReportSource};
pub use sync::{
    ResultSync, RunEnd, RunNotice, RunPhase, RunStart, SyncConfig, SyncSnapshot,
};
pub use trigger::{HttpRunTriggerClient, RunTriggerClient, StartResponse};
