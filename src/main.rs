//! pitchsensed: the job-fabric worker process.
//!
//! Loads configuration, starts tracing, wires up the in-process job
//! fabric, artifact store and event bus, and runs a worker loop per
//! named dispatch queue until interrupted.

use std::sync::Arc;
use std::time::Duration;

use pitchsense_core::config::{init_tracing, Config};
use pitchsense_core::error::PitchSenseError;
use pitchsense_core::jobs::{CancellationToken, Dispatch, Execute, JobFabric, JobKind, QUEUE_DEFAULT, QUEUE_GPU};
use pitchsense_core::orchestration::{self, StagePorts};
use pitchsense_core::store::{ArtifactStore, DomainEvent, EventBus, InMemoryArtifactStore, InMemoryEventBus};
use tracing::{info, warn};

/// How long a worker sleeps after finding its queue empty before
/// polling again.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config);

    info!(
        artifact_store_path = %config.artifact_store_path,
        broker_url = %config.broker_url,
        "pitchsensed starting"
    );

    let fabric = Arc::new(JobFabric::new());
    let artifact_store = Arc::new(InMemoryArtifactStore::new());
    let event_bus = Arc::new(InMemoryEventBus::default());

    let default_worker = tokio::spawn(worker_loop(QUEUE_DEFAULT, fabric.clone(), artifact_store.clone(), event_bus.clone()));
    let gpu_worker = tokio::spawn(worker_loop(QUEUE_GPU, fabric.clone(), artifact_store.clone(), event_bus.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
        res = default_worker => {
            if let Err(e) = res {
                warn!(error = %e, "default queue worker exited unexpectedly");
            }
        }
        res = gpu_worker => {
            if let Err(e) = res {
                warn!(error = %e, "gpu queue worker exited unexpectedly");
            }
        }
    }

    Ok(())
}

/// Polls one named queue, runs each dequeued job through the fabric's
/// retry/backoff loop, and dispatches any jobs the stage chains.
async fn worker_loop(
    queue_name: &'static str,
    fabric: Arc<JobFabric>,
    artifact_store: Arc<InMemoryArtifactStore>,
    event_bus: Arc<InMemoryEventBus>,
) {
    loop {
        let Some(queued) = fabric.queues().try_dequeue(queue_name) else {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            continue;
        };

        let job_id = queued.job_id.clone();
        let kind = queued.kind;
        let fabric_for_blocking = fabric.clone();
        let artifact_store_for_blocking = artifact_store.clone();

        let outcome =
            tokio::task::spawn_blocking(move || run_job(&fabric_for_blocking, &artifact_store_for_blocking, &job_id, kind)).await;

        match outcome {
            Ok(Ok(chained)) => {
                for job in chained {
                    let dispatched = fabric.dispatch_chained(job.kind, &job.idempotency_key, &job.idempotency_key, job.payload);
                    if dispatched.is_none() {
                        warn!(queue = queue_name, kind = ?job.kind, "chained dispatch dropped");
                    }
                }
                publish_completion(&event_bus, kind);
            }
            Ok(Err(e)) => {
                warn!(queue = queue_name, error = %e, "job run failed to reach a terminal state");
            }
            Err(join_err) => {
                warn!(queue = queue_name, error = %join_err, "worker task panicked");
            }
        }
    }
}

/// Runs a single job to completion (including internal retries) and
/// returns any chained jobs the stage produced on success.
fn run_job(
    fabric: &JobFabric,
    artifact_store: &InMemoryArtifactStore,
    job_id: &str,
    kind: JobKind,
) -> pitchsense_core::error::Result<Vec<orchestration::ChainedJob>> {
    let record = fabric.status(job_id)?;
    let payload = record.payload.clone().unwrap_or(serde_json::Value::Null);
    let mut chained_out = Vec::new();

    let updated = fabric.run_with_retries(job_id, |token: &CancellationToken| {
        if token.is_cancelled() {
            return Err(PitchSenseError::Cancelled);
        }
        let ports = StagePorts {
            artifact_store: Some(artifact_store as &dyn ArtifactStore),
            ..StagePorts::default()
        };
        let outcome = orchestration::execute_stage(kind, &payload, &ports)?;
        chained_out = outcome.chained;
        Ok(outcome.result)
    })?;

    info!(job_id, kind = ?kind, state = ?updated.state, "job run finished");
    Ok(chained_out)
}

/// Announces stage-level completion for subscribers (e.g. a UI push)
/// that don't need this job's own record lookup. Match/team
/// correlation lives on the job record itself; this event only
/// carries pipeline shape.
fn publish_completion(event_bus: &InMemoryEventBus, kind: JobKind) {
    let event = match kind {
        JobKind::Ingestion => DomainEvent::IngestionCompleted { match_id: String::new() },
        JobKind::VideoProcessing => DomainEvent::VideoProcessingCompleted { match_id: String::new(), mode: String::new() },
        JobKind::Metrics => DomainEvent::MetricsComputed { match_id: String::new() },
        JobKind::PhaseClassification => DomainEvent::PhaseSequenceBuilt { match_id: String::new(), team_id: String::new() },
        JobKind::PatternDetection => DomainEvent::PatternsDetected { match_id: String::new(), team_id: String::new() },
        JobKind::Report => DomainEvent::ReportComposed { report_id: String::new(), match_id: String::new() },
        JobKind::Calibration | JobKind::Analysis => return,
    };
    event_bus.publish(event);
}
