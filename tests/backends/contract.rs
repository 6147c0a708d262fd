//! Operations every backend must honor identically.

use crate::common::*;
use tally::prelude::*;

// ============================================================================
// Read / Write
// ============================================================================

#[tokio::test]
async fn write_then_read_returns_content() {
    init_tracing();
    for fixture in TestBackend::all() {
        let path = fixture.path(&["conversations", "c1", "meta.json"]);
        fixture.backend.write(&path, "{\"id\":\"c1\"}").await.unwrap();
        assert_eq!(
            fixture.backend.read(&path).await.unwrap(),
            "{\"id\":\"c1\"}",
            "{}",
            fixture.name
        );
    }
}

#[tokio::test]
async fn write_overwrites_previous_content() {
    for fixture in TestBackend::all() {
        let path = fixture.path(&["doc.json"]);
        fixture.backend.write(&path, "first").await.unwrap();
        fixture.backend.write(&path, "second").await.unwrap();
        assert_eq!(fixture.backend.read(&path).await.unwrap(), "second", "{}", fixture.name);
    }
}

#[tokio::test]
async fn appends_are_read_in_order() {
    for fixture in TestBackend::all() {
        let path = fixture.path(&["conversations", "c1", "conversation.jsonl"]);
        fixture.backend.append(&path, "a").await.unwrap();
        fixture.backend.append(&path, "b").await.unwrap();

        let text = fixture.backend.read(&path).await.unwrap();
        let a = text.find('a').expect("a present");
        let b = text.find('b').expect("b present");
        assert!(a < b, "{}: {:?}", fixture.name, text);
    }
}

// ============================================================================
// Stat / List
// ============================================================================

#[tokio::test]
async fn stat_of_unwritten_path_is_none() {
    for fixture in TestBackend::all() {
        let path = fixture.path(&["never", "written.json"]);
        assert!(fixture.backend.stat(&path).await.unwrap().is_none(), "{}", fixture.name);
    }
}

#[tokio::test]
async fn stat_distinguishes_files_and_directories() {
    for fixture in TestBackend::all() {
        let file = fixture.path(&["conversations", "c1", "meta.json"]);
        fixture.backend.write(&file, "{}").await.unwrap();

        let dir = fixture.path(&["conversations", "c1"]);
        let file_stat = fixture.backend.stat(&file).await.unwrap().unwrap();
        let dir_stat = fixture.backend.stat(&dir).await.unwrap().unwrap();
        assert!(!file_stat.is_directory, "{}", fixture.name);
        assert!(dir_stat.is_directory, "{}", fixture.name);
    }
}

#[tokio::test]
async fn list_returns_files_and_subdirectories() {
    for fixture in TestBackend::all() {
        let b = &fixture.backend;
        b.write(&fixture.path(&["conversations", "c1", "meta.json"]), "{}")
            .await
            .unwrap();
        b.write(&fixture.path(&["conversations", "c2", "meta.json"]), "{}")
            .await
            .unwrap();
        b.write(&fixture.path(&["conversations", "notes.txt"]), "x")
            .await
            .unwrap();

        let entries = b.list(&fixture.path(&["conversations"])).await.unwrap();
        let summary: Vec<(String, bool)> = entries
            .iter()
            .map(|e| (e.id.clone(), e.is_directory))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("c1".to_string(), true),
                ("c2".to_string(), true),
                ("notes.txt".to_string(), false),
            ],
            "{}",
            fixture.name
        );
    }
}

#[tokio::test]
async fn list_of_missing_directory_is_empty() {
    for fixture in TestBackend::all() {
        let entries = fixture.backend.list(&fixture.path(&["nothing"])).await.unwrap();
        assert!(entries.is_empty(), "{}", fixture.name);
    }
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn delete_is_recursive() {
    for fixture in TestBackend::all() {
        let b = &fixture.backend;
        b.write(&fixture.path(&["conversations", "c1", "meta.json"]), "{}")
            .await
            .unwrap();
        b.write(
            &fixture.path(&["conversations", "c1", "runs", "tally", "r.json"]),
            "{}",
        )
        .await
        .unwrap();
        b.write(&fixture.path(&["conversations", "c2", "meta.json"]), "{}")
            .await
            .unwrap();

        b.delete(&fixture.path(&["conversations", "c1"])).await.unwrap();

        assert!(b
            .stat(&fixture.path(&["conversations", "c1"]))
            .await
            .unwrap()
            .is_none());
        assert!(b
            .stat(&fixture.path(&["conversations", "c2", "meta.json"]))
            .await
            .unwrap()
            .is_some());
    }
}

#[tokio::test]
async fn delete_of_missing_path_is_ok() {
    for fixture in TestBackend::all() {
        fixture
            .backend
            .delete(&fixture.path(&["missing"]))
            .await
            .unwrap();
    }
}
