mod results_vm;
mod time_fmt;
mod tracker_vm;

pub use results_vm::{
    ExpandedSuites, ResultsVm, SuiteVm, TestRowVm, display_file_name, map_results,
};
pub use time_fmt::{format_datetime, format_epoch_millis};
pub use tracker_vm::{ExerciseRowVm, TrackerVm, map_tracker};
