#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod progress_store;
pub mod results;

pub use course_core::Clock;

pub use app_services::{AppServices, ServicesConfig};
pub use error::{AppServicesError, ProgressError, ReportSourceError, RunTriggerError};
pub use progress_store::{PROGRESS_KEY, ProgressStore};
pub use results::{
    ResultSync, RunEnd, RunNotice, RunPhase, RunStart, SyncConfig, SyncSnapshot,
};
