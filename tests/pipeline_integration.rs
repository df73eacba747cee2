//! End-to-end exercise of the job fabric dispatching through the
//! stage dispatcher, without a running worker process.

use pitchsense_core::jobs::{Dispatch, Execute, JobFabric, JobKind};
use pitchsense_core::orchestration::{execute_stage, StagePorts};

#[test]
fn ingestion_job_runs_to_completion() {
    let fabric = JobFabric::new();
    let payload = serde_json::json!({
        "source": "a",
        "match_id": "m1",
        "rows": [
            {
                "event_id": "e1",
                "event_type": "Pass",
                "timestamp": 1.0,
                "x": 60.0,
                "y": 40.0,
                "player_id": "p1",
                "team_id": "home",
                "end_x": 70.0,
                "end_y": 42.0
            },
            {
                "event_id": "e2",
                "event_type": "Shot",
                "timestamp": 2.0,
                "x": 100.0,
                "y": 40.0,
                "player_id": "p1",
                "team_id": "home"
            }
        ],
    });

    let outcome = fabric.dispatch(JobKind::Ingestion, "m1", "corr-1", Some(payload.clone())).unwrap();
    assert!(!outcome.already_existed);

    let ports = StagePorts::default();
    let record = fabric
        .run_with_retries(&outcome.job_id, |_token| {
            execute_stage(JobKind::Ingestion, &payload, &ports).map(|o| o.result)
        })
        .unwrap();

    assert_eq!(record.state, pitchsense_core::jobs::JobState::Completed);
    assert_eq!(record.result.as_ref().unwrap()["event_count"], 2);

    // Re-dispatching the same (kind, idempotency_key) returns the same
    // completed job rather than re-running the work.
    let redispatched = fabric.dispatch(JobKind::Ingestion, "m1", "corr-2", Some(payload)).unwrap();
    assert_eq!(redispatched.job_id, outcome.job_id);
    assert!(redispatched.already_existed);
}

#[test]
fn cancelling_a_pending_job_prevents_it_from_ever_running() {
    let fabric = JobFabric::new();
    let outcome = fabric.dispatch(JobKind::VideoProcessing, "vid-1", "corr-1", None).unwrap();
    let cancelled = fabric.cancel(&outcome.job_id).unwrap();
    assert_eq!(cancelled.api_state(), pitchsense_core::jobs::ApiJobState::Cancelled);

    // The fabric's compare-and-set rejects resuming a terminal job.
    let ports = StagePorts::default();
    let result = fabric.run_with_retries(&outcome.job_id, |_token| {
        execute_stage(JobKind::VideoProcessing, &serde_json::json!({}), &ports).map(|o| o.result)
    });
    assert!(result.is_err());
}
