#![forbid(unsafe_code)]

pub mod filter;
pub mod model;
pub mod sanitize;
pub mod time;

pub use filter::{ExerciseFilterKey, SuiteMap, filter_for_exercise};
pub use sanitize::sanitize_failure_message;
pub use time::Clock;
