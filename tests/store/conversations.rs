//! Conversation lifecycle through the store.

use crate::common::*;
use tally::prelude::*;

// ============================================================================
// Create / Save / Load
// ============================================================================

#[tokio::test]
async fn recreating_conversation_rewrites_stamp() {
    init_tracing();
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let first = store.create_conversation("c1").await.unwrap();
        let before = first.meta().await.unwrap().expect("meta written");

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let again = store.create_conversation("c1").await.unwrap();
        let after = again.meta().await.unwrap().expect("meta rewritten");

        assert!(after.updated_at > before.updated_at, "{}", fixture.name);
        assert_eq!(after.created_at, before.created_at, "{}", fixture.name);
        assert!(store.conversation_exists("c1").await.unwrap());
    }
}

#[tokio::test]
async fn conversation_round_trips() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();
        conv.save(&sample_conversation("c1")).await.unwrap();

        let loaded = store.conversation("c1").unwrap().load().await.unwrap();
        assert_eq!(loaded, sample_conversation("c1"), "{}", fixture.name);
    }
}

#[tokio::test]
async fn appended_steps_are_loaded() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();
        let mut conversation = sample_conversation("c1");
        conv.save(&conversation).await.unwrap();

        let index = conversation
            .push_step(Message::user("Thanks!"), vec![])
            .unwrap();
        let step = conversation.step(index).unwrap().clone();
        conv.append_step(&step).await.unwrap();

        let loaded = conv.load().await.unwrap();
        assert_eq!(loaded.len(), 3, "{}", fixture.name);
        assert_eq!(loaded, conversation, "{}", fixture.name);
    }
}

#[tokio::test]
async fn load_of_missing_conversation_is_not_found() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let err = store.conversation("ghost").unwrap().load().await.unwrap_err();
        assert!(err.is_not_found(), "{}: {}", fixture.name, err);
    }
}

// ============================================================================
// Optional documents
// ============================================================================

#[tokio::test]
async fn missing_optional_documents_are_none() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();
        assert!(conv.load_trajectory_meta().await.unwrap().is_none());
        assert!(conv.load_step_traces().await.unwrap().is_none());
    }
}

#[tokio::test]
async fn trajectory_documents_round_trip() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();
        conv.save_trajectory_meta(&sample_trajectory_meta()).await.unwrap();

        let loaded = conv.load_trajectory_meta().await.unwrap();
        assert_eq!(loaded, Some(sample_trajectory_meta()), "{}", fixture.name);
    }
}

// ============================================================================
// List / Delete
// ============================================================================

#[tokio::test]
async fn list_conversations_is_sorted() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        store.create_conversation("zeta").await.unwrap();
        store.create_conversation("alpha").await.unwrap();
        let generated = store.new_conversation().await.unwrap();

        let ids = store.list_conversations().await.unwrap();
        let mut expected = vec![
            "alpha".to_string(),
            "zeta".to_string(),
            generated.id().to_string(),
        ];
        expected.sort();
        assert_eq!(ids, expected, "{}", fixture.name);
    }
}

#[tokio::test]
async fn delete_conversation_removes_everything() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();
        conv.save(&sample_conversation("c1")).await.unwrap();
        let run = conv.create_run(RunKind::Trajectory, None).await.unwrap();
        run.save_trajectory_meta(&sample_trajectory_meta()).await.unwrap();

        store.delete_conversation("c1").await.unwrap();
        assert!(!store.conversation_exists("c1").await.unwrap(), "{}", fixture.name);
        assert!(store.list_conversations().await.unwrap().is_empty());
    }
}
