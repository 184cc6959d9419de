use storage::repository::{DocumentRepository, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_roundtrip_replaces_documents() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_documents?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get_document("progress").await.unwrap(), None);

    repo.put_document("progress", r#"{"completedExerciseIds":[]}"#)
        .await
        .unwrap();
    repo.put_document("progress", r#"{"completedExerciseIds":["jsx-1"]}"#)
        .await
        .unwrap();

    let stored = repo.get_document("progress").await.expect("fetch");
    assert_eq!(
        stored.as_deref(),
        Some(r#"{"completedExerciseIds":["jsx-1"]}"#)
    );
}

#[tokio::test]
async fn sqlite_delete_is_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_delete?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.put_document("progress", "{}").await.unwrap();
    repo.delete_document("progress").await.unwrap();
    repo.delete_document("progress").await.unwrap();
    assert_eq!(repo.get_document("progress").await.unwrap(), None);
}

#[tokio::test]
async fn migrations_can_run_twice() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_builder_wires_document_repository() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage.documents.put_document("k", "v").await.unwrap();
    assert_eq!(
        storage.documents.get_document("k").await.unwrap().as_deref(),
        Some("v")
    );
}
