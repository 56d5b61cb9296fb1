//! Schema initialization tests for the SurrealDB registry tables.

use registry_state::{
    connect_in_memory, ImportSummary, ObjectKind, RegistryBackend, RegistryObject,
    RegistrySnapshot, SurrealRegistryBackend,
};

#[tokio::test]
async fn test_fresh_schema_answers_empty() {
    let backend = SurrealRegistryBackend::in_memory().await.unwrap();

    assert!(backend.fetch_by_id("ss1").await.unwrap().is_none());
    assert!(backend.fetch_by_business_key("1.1").await.unwrap().is_none());
    let ids = ["ss1".to_string()].into_iter().collect();
    assert!(backend
        .fetch_associations_inclusive(&ids)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unique_index_rejects_duplicate_association() {
    use registry_state::{Association, AssociationType};

    let backend = SurrealRegistryBackend::in_memory().await.unwrap();
    let assoc = Association::new("a1", AssociationType::HasMember, "ss1", "d1");
    backend.insert_association(&assoc).await.unwrap();

    assert!(backend.insert_association(&assoc).await.is_err());
}

#[tokio::test]
async fn test_connection_can_be_wrapped() {
    let db = connect_in_memory().await.unwrap();
    let backend = SurrealRegistryBackend::from_connection(db);

    backend
        .insert_object(&RegistryObject::new("f1", ObjectKind::Folder).with_unique_id("2.1"))
        .await
        .unwrap();

    let folder = backend.fetch_by_id("f1").await.unwrap().unwrap();
    assert_eq!(folder.unique_id(), Some("2.1"));
}

#[tokio::test]
async fn test_import_reports_counts() {
    let backend = SurrealRegistryBackend::in_memory().await.unwrap();
    let snapshot = RegistrySnapshot {
        objects: vec![
            RegistryObject::new("ss1", ObjectKind::SubmissionSet),
            RegistryObject::new("d1", ObjectKind::DocumentEntry),
        ],
        associations: vec![],
    };

    let summary = backend.import_snapshot(&snapshot).await.unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            objects: 2,
            associations: 0
        }
    );
}
