use course_core::model::ExerciseId;
use services::{ResultSync, RunStart, SyncSnapshot};
use tokio::sync::watch;

use crate::vm::{ExpandedSuites, ResultsVm, map_results};

/// Test results for the selected exercise.
///
/// Owns its `ResultSync`; dropping the panel stops all polling.
pub struct ResultsPanel {
    sync: ResultSync,
    selected: Option<ExerciseId>,
    expanded: ExpandedSuites,
}

impl ResultsPanel {
    #[must_use]
    pub fn new(sync: ResultSync) -> Self {
        Self {
            sync,
            selected: None,
            expanded: ExpandedSuites::default(),
        }
    }

    /// Start polling. Must be called from within a tokio runtime.
    pub fn mount(&self) {
        self.sync.mount();
    }

    pub fn teardown(&self) {
        self.sync.teardown();
    }

    #[must_use]
    pub fn selected(&self) -> Option<&ExerciseId> {
        self.selected.as_ref()
    }

    pub fn select(&mut self, exercise: Option<ExerciseId>) {
        self.selected = exercise;
    }

    pub fn toggle_suite(&mut self, key: &str) {
        self.expanded = self.expanded.toggled(key);
    }

    /// Run the selected exercise, or everything when none is selected.
    /// `None` if the selected exercise has no known suite.
    pub async fn run_selected(&self) -> Option<RunStart> {
        match &self.selected {
            Some(exercise) => self.sync.run_for_exercise(exercise).await,
            None => Some(self.sync.run_all().await),
        }
    }

    pub async fn run_all(&self) -> RunStart {
        self.sync.run_all().await
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncSnapshot> {
        self.sync.subscribe()
    }

    #[must_use]
    pub fn vm(&self) -> ResultsVm {
        self.vm_for(&self.sync.snapshot())
    }

    #[must_use]
    pub fn vm_for(&self, snapshot: &SyncSnapshot) -> ResultsVm {
        map_results(
            snapshot,
            self.selected.as_ref(),
            self.sync.suite_map(),
            &self.expanded,
        )
    }
}
