use std::sync::Arc;

use course_core::Clock;
use course_core::model::{CompletedSet, CompletionRecord, ExerciseId};
use storage::repository::DocumentRepository;
use tracing::{debug, warn};

use crate::error::ProgressError;

/// Key of the persisted progress document.
pub const PROGRESS_KEY: &str = "course-progress";

/// Durable record of completed exercises.
///
/// Load, save and clear never fail: a broken or unwritable progress
/// document degrades the app to session-only tracking, with the in-memory
/// set staying the source of truth for the session.
#[derive(Clone)]
pub struct ProgressStore {
    clock: Clock,
    repo: Arc<dyn DocumentRepository>,
    key: String,
}

impl ProgressStore {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn DocumentRepository>) -> Self {
        Self::with_key(clock, repo, PROGRESS_KEY)
    }

    #[must_use]
    pub fn with_key(clock: Clock, repo: Arc<dyn DocumentRepository>, key: impl Into<String>) -> Self {
        Self {
            clock,
            repo,
            key: key.into(),
        }
    }

    /// Read the completion set. Missing or corrupt documents yield an empty set.
    pub async fn load(&self) -> CompletedSet {
        let raw = match self.repo.get_document(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return CompletedSet::new(),
            Err(err) => {
                warn!(error = %err, key = %self.key, "failed to load progress");
                return CompletedSet::new();
            }
        };

        match CompletionRecord::from_json(&raw) {
            Ok(record) => record.into_set(),
            Err(err) => {
                warn!(error = %err, key = %self.key, "discarding unreadable progress document");
                CompletedSet::new()
            }
        }
    }

    /// Persist `ids` with a fresh timestamp in one write. Failures are logged.
    pub async fn save(&self, ids: &CompletedSet) {
        let record = CompletionRecord::new(ids, self.clock.now());
        let raw = match record.to_json() {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "failed to serialize progress");
                return;
            }
        };
        if let Err(err) = self.repo.put_document(&self.key, &raw).await {
            warn!(error = %err, key = %self.key, "failed to save progress");
            return;
        }
        debug!(completed = ids.len(), "progress saved");
    }

    /// Remove the persisted document. Clearing an empty store is a no-op.
    pub async fn clear(&self) {
        if let Err(err) = self.repo.delete_document(&self.key).await {
            warn!(error = %err, key = %self.key, "failed to clear progress");
        }
    }

    /// Returns a new set with `id` flipped; `ids` is left untouched.
    #[must_use]
    pub fn toggle(ids: &CompletedSet, id: &ExerciseId) -> CompletedSet {
        course_core::model::toggle(ids, id)
    }

    /// The raw persisted document, for saving to a file.
    pub async fn export_document(&self) -> Option<String> {
        match self.repo.get_document(&self.key).await {
            Ok(Some(raw)) => Some(raw),
            Ok(None) => {
                debug!(key = %self.key, "no progress to export");
                None
            }
            Err(err) => {
                warn!(error = %err, key = %self.key, "failed to export progress");
                None
            }
        }
    }

    /// File name for an export taken now, e.g. `course-progress-2024-03-01.json`.
    #[must_use]
    pub fn export_file_name(&self) -> String {
        format!("{}-{}.json", self.key, self.clock.now().format("%Y-%m-%d"))
    }

    /// Replace the stored progress with an exported document.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidDocument` if `raw` is not a progress
    /// document, or `ProgressError::Storage` if it cannot be written.
    pub async fn import_document(&self, raw: &str) -> Result<CompletedSet, ProgressError> {
        let record = CompletionRecord::from_json(raw)?;
        let normalized = record.to_json()?;
        self.repo.put_document(&self.key, &normalized).await?;
        Ok(record.into_set())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use course_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, StorageError};

    fn store() -> (ProgressStore, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        (ProgressStore::new(fixed_clock(), Arc::new(repo.clone())), repo)
    }

    fn ids(raw: &[&str]) -> CompletedSet {
        raw.iter().map(|id| ExerciseId::new(*id)).collect()
    }

    struct BrokenRepository;

    #[async_trait]
    impl DocumentRepository for BrokenRepository {
        async fn get_document(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Connection("disk gone".into()))
        }

        async fn put_document(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk gone".into()))
        }

        async fn delete_document(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk gone".into()))
        }
    }

    #[tokio::test]
    async fn missing_document_loads_empty() {
        let (store, _) = store();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (store, _) = store();
        let saved = ids(&["jsx-1", "lists-3", "retired-9"]);
        store.save(&saved).await;
        assert_eq!(store.load().await, saved);
    }

    #[tokio::test]
    async fn save_writes_insertion_order_and_timestamp() {
        let (store, repo) = store();
        store.save(&ids(&["state-2", "jsx-1"])).await;
        let raw = repo.get_document(PROGRESS_KEY).await.unwrap().unwrap();
        assert_eq!(
            raw,
            r#"{"completedExerciseIds":["state-2","jsx-1"],"lastUpdated":"2023-11-14T22:13:20Z"}"#
        );
    }

    #[tokio::test]
    async fn corrupt_document_loads_empty() {
        let (store, repo) = store();
        repo.put_document(PROGRESS_KEY, "{not json").await.unwrap();
        assert!(store.load().await.is_empty());

        repo.put_document(PROGRESS_KEY, r#"{"completedExerciseIds": 5}"#)
            .await
            .unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let (store, _) = store();
        store.save(&ids(&["jsx-1"])).await;

        store.clear().await;
        let once = store.load().await;
        store.clear().await;
        let twice = store.load().await;

        assert!(once.is_empty());
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn storage_failures_are_swallowed() {
        let store = ProgressStore::new(fixed_clock(), Arc::new(BrokenRepository));
        store.save(&ids(&["jsx-1"])).await;
        store.clear().await;
        assert!(store.load().await.is_empty());
        assert_eq!(store.export_document().await, None);
    }

    #[tokio::test]
    async fn export_returns_stored_document() {
        let (store, _) = store();
        assert_eq!(store.export_document().await, None);
        store.save(&ids(&["refs-1"])).await;
        let exported = store.export_document().await.unwrap();
        assert!(exported.contains("refs-1"));
        assert_eq!(store.export_file_name(), "course-progress-2023-11-14.json");
    }

    #[tokio::test]
    async fn import_replaces_progress() {
        let (store, _) = store();
        store.save(&ids(&["jsx-1"])).await;

        let imported = store
            .import_document(r#"{"completedExercises":["props-2","props-3"],"lastUpdated":"2024-01-01T00:00:00Z"}"#)
            .await
            .unwrap();

        assert_eq!(imported, ids(&["props-2", "props-3"]));
        assert_eq!(store.load().await, imported);
    }

    #[tokio::test]
    async fn import_rejects_invalid_documents_and_keeps_progress() {
        let (store, _) = store();
        store.save(&ids(&["jsx-1"])).await;

        let result = store.import_document("[]").await;
        assert!(matches!(result, Err(ProgressError::InvalidDocument(_))));
        assert_eq!(store.load().await, ids(&["jsx-1"]));
    }

    #[test]
    fn toggle_does_not_mutate_input() {
        let start = ids(&["jsx-1"]);
        let next = ProgressStore::toggle(&start, &ExerciseId::new("jsx-1"));
        assert!(next.is_empty());
        assert_eq!(start, ids(&["jsx-1"]));
    }
}
