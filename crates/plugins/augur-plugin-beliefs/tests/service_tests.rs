//! End-to-end tests for the belief service over the local stores
//!
//! These drive full experiment and mission lifecycles through the async
//! service and check what downstream readers see in the snapshot.

use augur_core::config::DEFAULT_HISTORY_WINDOW;
use augur_core::types::{HypothesisStatus, Observation, StateStore, QUEUE_LIMIT};
use augur_core::AugurError;
use augur_plugin_beliefs::*;
use augur_storage_local::{CachedStateStore, FileStateStore, MemoryStateStore};
use std::sync::Arc;

const AGENT: &str = "agent-7";

fn memory_service() -> BeliefService {
    BeliefService::new(Arc::new(MemoryStateStore::new()))
}

fn solved() -> Resolution {
    Resolution {
        result: Some("Solved it cleanly".to_string()),
        score: Some(0.9),
        elapsed_seconds: Some(42.0),
        ..Default::default()
    }
}

/// A puzzle experiment moves the analytical trait and resolves the hypothesis
#[tokio::test]
async fn test_experiment_lifecycle_updates_profile() {
    let service = memory_service();
    let riddle = Experiment::new("riddle-1", "Logic riddle").with_type("puzzle");

    let seeded = service.initialize_experiment(AGENT, &riddle).await.unwrap();
    assert_eq!(seeded.id, "experiment:riddle-1");
    assert_eq!(seeded.status, HypothesisStatus::Active);

    service
        .record_experiment_progress(
            AGENT,
            &riddle,
            &ProgressUpdate {
                result: Some("making progress".to_string()),
                score: Some(0.7),
                elapsed_seconds: Some(20.0),
            },
        )
        .await
        .unwrap();

    let resolved = service
        .resolve_experiment(AGENT, &riddle, &solved())
        .await
        .unwrap();
    assert_eq!(resolved.status, HypothesisStatus::Resolved);
    assert!(resolved.success_probability.unwrap() > 0.5);

    let snapshot = service.snapshot(AGENT).await.unwrap();
    assert_eq!(snapshot.summary.resolved, 1);
    assert_eq!(snapshot.global_traits.len(), GLOBAL_TRAITS.len());

    let analytical = &snapshot.global_traits["analytical"];
    assert!(analytical.estimate.unwrap() > 0.5);
    assert!(analytical.sample_size > 0.0);

    // Untouched traits stay at their prior
    let empathy = &snapshot.global_traits["empathy"];
    assert_eq!(empathy.sample_size, 0.0);
    assert!(snapshot.recent_history.len() <= DEFAULT_HISTORY_WINDOW);
}

/// Abandoned experiments retire instead of resolving
#[tokio::test]
async fn test_abandoned_experiment_is_retired() {
    let service = memory_service();
    let chat = Experiment::new("chat-3", "Support conversation").with_type("social");

    service.initialize_experiment(AGENT, &chat).await.unwrap();
    let summary = service
        .resolve_experiment(
            AGENT,
            &chat,
            &Resolution {
                result: Some("Abandoned halfway".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(summary.status, HypothesisStatus::Retired);
    let snapshot = service.snapshot(AGENT).await.unwrap();
    assert_eq!(snapshot.summary.retired, 1);
    assert!(snapshot.global_traits["empathy"].estimate.unwrap() < 0.5);
}

/// Repeated mission failures queue a clarity proposal that can be adopted
#[tokio::test]
async fn test_mission_failures_trigger_clarity_proposal() {
    let service = memory_service();

    for i in 0..3 {
        let mission = Mission::new(format!("m-{}", i), "Logistics Run", "Deliver the crate")
            .with_objective("follow the route protocol");
        service.initialize_mission(AGENT, &mission).await.unwrap();
        service
            .resolve_mission(
                AGENT,
                &mission,
                &Resolution {
                    result: Some("failed to arrive".to_string()),
                    success: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let snapshot = service.snapshot(AGENT).await.unwrap();
    let mission = snapshot
        .summary
        .hypotheses
        .iter()
        .find(|h| h.id == "mission:type:logistics_run")
        .unwrap();
    assert!(mission.success_probability.unwrap() < 0.35);

    let clarity = snapshot
        .autonomous_queue
        .iter()
        .find(|p| p.id == "autonomous:mission_clarity")
        .expect("clarity proposal queued");
    assert!(snapshot.autonomous_queue.len() <= QUEUE_LIMIT);
    for pair in snapshot.autonomous_queue.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let adopted = service.adopt_proposal(AGENT, &clarity.id).await.unwrap();
    assert_eq!(adopted.id, "autonomous:mission_clarity");
    assert_eq!(adopted.status, HypothesisStatus::Active);

    let snapshot = service.snapshot(AGENT).await.unwrap();
    assert!(snapshot
        .autonomous_queue
        .iter()
        .all(|p| p.id != "autonomous:mission_clarity"));
}

/// External signals set on the service feed the cadence rule
#[tokio::test]
async fn test_context_overrides_add_cadence_proposal() {
    let service = memory_service();
    service.set_context(
        AGENT,
        AutonomousContext {
            average_latency_seconds: Some(240.0),
            ..Default::default()
        },
    );

    let added = service.refresh_proposals(AGENT).await.unwrap();
    assert!(added > 0);

    let snapshot = service.snapshot(AGENT).await.unwrap();
    assert!(snapshot
        .autonomous_queue
        .iter()
        .any(|p| p.id == "autonomous:cadence_pacing"));
}

/// Unknown ids surface as NotFound
#[tokio::test]
async fn test_unknown_targets_are_not_found() {
    let service = memory_service();

    let err = service
        .observe(AGENT, "experiment:missing", "success", &Observation::value(true))
        .await
        .unwrap_err();
    assert!(matches!(err, AugurError::NotFound(_)));

    let err = service
        .close_hypothesis(AGENT, "experiment:missing", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AugurError::NotFound(_)));

    let err = service.adopt_proposal(AGENT, "autonomous:nope").await.unwrap_err();
    assert!(matches!(err, AugurError::NotFound(_)));

    assert!(service.snapshot("  ").await.is_err());
}

/// Concurrent writers on one agent never lose an update
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_observations_are_serialized() {
    let service = Arc::new(memory_service());
    let routine = Experiment::new("routine", "Routine check").with_type("routine");
    service.initialize_experiment(AGENT, &routine).await.unwrap();

    let before = service
        .with_state(AGENT, |state, _| {
            state.hypothesis("experiment:routine").map(|h| h.evidence_count)
        })
        .await
        .unwrap()
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .observe(
                    AGENT,
                    "experiment:routine",
                    "success",
                    &Observation::value(i % 2 == 0),
                )
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().parsed);
    }

    let after = service
        .with_state(AGENT, |state, _| {
            state.hypothesis("experiment:routine").map(|h| h.evidence_count)
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after - before, 20);

    let snapshot = service.snapshot(AGENT).await.unwrap();
    let success = &snapshot
        .summary
        .hypotheses
        .iter()
        .find(|h| h.id == "experiment:routine")
        .unwrap()
        .variables["success"];
    assert_eq!(success.sample_size, 20.0);
}

/// State written through the cached file store survives a new service
#[tokio::test]
async fn test_state_persists_across_services() {
    let dir = tempfile::tempdir().unwrap();
    let riddle = Experiment::new("riddle-1", "Logic riddle").with_type("puzzle");

    {
        let store = CachedStateStore::new(FileStateStore::new(dir.path()).unwrap());
        let service = BeliefService::new(Arc::new(store));
        service.initialize_experiment(AGENT, &riddle).await.unwrap();
        service
            .resolve_experiment(AGENT, &riddle, &solved())
            .await
            .unwrap();
        service.flush().await.unwrap();
    }

    let files = FileStateStore::new(dir.path()).unwrap();
    assert!(files.load(AGENT).await.unwrap().is_some());

    let service = BeliefService::new(Arc::new(files));
    let snapshot = service.snapshot(AGENT).await.unwrap();
    assert_eq!(snapshot.summary.resolved, 1);
    assert!(snapshot.global_traits["analytical"].estimate.unwrap() > 0.5);
}
