use std::sync::Arc;

use course_core::model::{CompletedSet, ExerciseId};
use services::{ProgressError, ProgressStore};

use crate::vm::{TrackerVm, map_tracker};

/// Completion checkboxes. Every change to the set is persisted.
pub struct TrackerPanel {
    store: Arc<ProgressStore>,
    completed: CompletedSet,
    mounted: bool,
}

impl TrackerPanel {
    #[must_use]
    pub fn new(store: Arc<ProgressStore>) -> Self {
        Self {
            store,
            completed: CompletedSet::new(),
            mounted: false,
        }
    }

    /// Load the persisted set. Later calls are no-ops.
    pub async fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.completed = self.store.load().await;
        self.mounted = true;
    }

    #[must_use]
    pub fn completed(&self) -> &CompletedSet {
        &self.completed
    }

    #[must_use]
    pub fn is_complete(&self, id: &ExerciseId) -> bool {
        self.completed.contains(id)
    }

    /// Flip `id` and persist. Returns whether it is now complete.
    pub async fn toggle(&mut self, id: &ExerciseId) -> bool {
        self.replace(ProgressStore::toggle(&self.completed, id)).await;
        self.completed.contains(id)
    }

    /// Forget all progress.
    pub async fn reset(&mut self) {
        self.store.clear().await;
        self.replace(CompletedSet::new()).await;
    }

    /// # Errors
    ///
    /// Returns `ProgressError` if `raw` is not a progress export or cannot be
    /// stored; the current set is kept in that case.
    pub async fn import(&mut self, raw: &str) -> Result<usize, ProgressError> {
        self.completed = self.store.import_document(raw).await?;
        Ok(self.completed.len())
    }

    #[must_use]
    pub fn vm(&self, exercises: &[ExerciseId]) -> TrackerVm {
        map_tracker(exercises, &self.completed)
    }

    async fn replace(&mut self, next: CompletedSet) {
        self.store.save(&next).await;
        self.completed = next;
    }
}
