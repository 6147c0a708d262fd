//! Runs of both kinds under one conversation.

use crate::common::*;
use tally::prelude::*;

fn run_id(millis: i64) -> RunId {
    RunId::new(format!("run-{}-abc1234", millis)).unwrap()
}

// ============================================================================
// Kinds
// ============================================================================

#[tokio::test]
async fn reopened_run_keeps_its_kind() {
    init_tracing();
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();

        let id = run_id(1_748_779_200_000);
        let run = conv
            .create_run(RunKind::Trajectory, Some(id.clone()))
            .await
            .unwrap();
        run.save_trajectory_meta(&sample_trajectory_meta()).await.unwrap();

        let reopened = conv.open_run(&id).await.unwrap();
        assert_eq!(reopened.kind(), RunKind::Trajectory, "{}", fixture.name);
        assert_eq!(
            reopened.load().await.unwrap(),
            RunPayload::TrajectoryMeta(sample_trajectory_meta())
        );
    }
}

#[tokio::test]
async fn artifact_run_round_trips() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();
        let run = conv.create_run(RunKind::Tally, None).await.unwrap();
        let artifact = RunArtifact::new(run.id().clone(), at(10), 2);
        run.save_artifact(&artifact).await.unwrap();

        let reopened = conv.open_run(run.id()).await.unwrap();
        assert_eq!(reopened.kind(), RunKind::Tally);
        assert_eq!(reopened.load_artifact().await.unwrap(), artifact, "{}", fixture.name);
    }
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn list_runs_merges_kinds_by_creation_time() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();

        let newest = run_id(3_000);
        let oldest = run_id(1_000);
        let middle = run_id(2_000);

        let run = conv.create_run(RunKind::Tally, Some(newest.clone())).await.unwrap();
        run.save_artifact(&RunArtifact::new(newest.clone(), at(3), 1))
            .await
            .unwrap();
        let run = conv
            .create_run(RunKind::Trajectory, Some(oldest.clone()))
            .await
            .unwrap();
        run.save_trajectory_meta(&sample_trajectory_meta()).await.unwrap();
        let run = conv.create_run(RunKind::Tally, Some(middle.clone())).await.unwrap();
        run.save_artifact(&RunArtifact::new(middle.clone(), at(2), 1))
            .await
            .unwrap();

        let runs = conv.list_runs().await.unwrap();
        let listed: Vec<(String, RunKind)> = runs
            .iter()
            .map(|r| (r.id().to_string(), r.kind()))
            .collect();
        assert_eq!(
            listed,
            vec![
                (oldest.to_string(), RunKind::Trajectory),
                (middle.to_string(), RunKind::Tally),
                (newest.to_string(), RunKind::Tally),
            ],
            "{}",
            fixture.name
        );
    }
}

#[tokio::test]
async fn created_but_unsaved_run_is_not_listed() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();
        let run = conv.create_run(RunKind::Tally, None).await.unwrap();

        assert!(!run.exists().await.unwrap());
        assert!(conv.list_runs().await.unwrap().is_empty(), "{}", fixture.name);
    }
}

#[tokio::test]
async fn delete_run_removes_only_that_run() {
    for fixture in TestBackend::all() {
        let store = fixture.store();
        let conv = store.create_conversation("c1").await.unwrap();
        let keep = run_id(1_000);
        let drop = run_id(2_000);
        for id in [&keep, &drop] {
            let run = conv.create_run(RunKind::Tally, Some(id.clone())).await.unwrap();
            run.save_artifact(&RunArtifact::new(id.clone(), at(1), 1))
                .await
                .unwrap();
        }

        conv.delete_run(&drop).await.unwrap();
        let ids: Vec<String> = conv
            .list_runs()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec![keep.to_string()], "{}", fixture.name);
    }
}
