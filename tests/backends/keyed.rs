//! Flat key store behavior.

use std::sync::Arc;
use tally::prelude::*;
use tally_storage::{LogStoreBackend, MemoryLogClient, MemoryStreamClient, StreamBackend};

// ============================================================================
// Log store
// ============================================================================

#[tokio::test]
async fn log_store_reads_missing_stream_as_empty() {
    let backend = LogStoreBackend::in_memory();
    assert_eq!(backend.read("evals/none.json").await.unwrap(), "");
}

#[tokio::test]
async fn log_store_write_replaces_stream() {
    let client = Arc::new(MemoryLogClient::new());
    let backend = LogStoreBackend::new(client.clone());
    backend.write("evals/a.json", "one").await.unwrap();
    backend.append("evals/a.json", "two").await.unwrap();
    backend.write("evals/a.json", "three").await.unwrap();

    assert_eq!(backend.read("evals/a.json").await.unwrap(), "three");
    assert_eq!(client.stream_count(), 1);
    assert!(backend.supports_append());
}

// ============================================================================
// Streams
// ============================================================================

#[tokio::test]
async fn stream_backend_fails_after_close() {
    let backend = StreamBackend::in_memory();
    backend.write("evals/a.json", "x").await.unwrap();
    backend.close().await.unwrap();

    let err = backend.read("evals/a.json").await.unwrap_err();
    assert!(err.to_string().contains("closed"), "{}", err);
}

#[tokio::test]
async fn stream_backend_scopes_keys_by_prefix() {
    let client = Arc::new(MemoryStreamClient::new());
    let ours = StreamBackend::new(client.clone()).with_key_prefix("tally:");
    let theirs = StreamBackend::new(client.clone()).with_key_prefix("other:");

    ours.write("evals/a.json", "mine").await.unwrap();
    theirs.write("evals/b.json", "theirs").await.unwrap();

    let entries = ours.list("evals").await.unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a.json"]);
}
