use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Key-value store of whole text documents, one document per key.
///
/// Writes replace the full value in a single call; there is no partial
/// update.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Fetch the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_document(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be stored.
    async fn put_document(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the document under `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_document(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    documents: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn get_document(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put_document(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete_document(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub documents: Arc<dyn DocumentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let documents: Arc<dyn DocumentRepository> = Arc::new(InMemoryRepository::new());
        Self { documents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get_document("k").await.unwrap(), None);

        repo.put_document("k", "one").await.unwrap();
        repo.put_document("k", "two").await.unwrap();
        assert_eq!(repo.get_document("k").await.unwrap().as_deref(), Some("two"));

        repo.delete_document("k").await.unwrap();
        assert_eq!(repo.get_document("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_missing_key_succeeds() {
        let repo = InMemoryRepository::new();
        repo.delete_document("never-written").await.unwrap();
        repo.delete_document("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_documents() {
        let repo = InMemoryRepository::new();
        let storage = Storage {
            documents: Arc::new(repo.clone()),
        };
        storage.documents.put_document("k", "v").await.unwrap();
        assert_eq!(repo.get_document("k").await.unwrap().as_deref(), Some("v"));
    }
}
