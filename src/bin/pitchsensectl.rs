//! pitchsensectl: a thin clap CLI over an in-process `JobFabric`, for
//! local operation and smoke-testing without a running `pitchsensed`
//! process. Mirrors the job API's request/response shape and its exit
//! code contract.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use pitchsense_core::error::PitchSenseError;
use pitchsense_core::jobs::{Dispatch, Execute, JobFabric, JobKind};
use pitchsense_core::orchestration::{self, StagePorts};
use pitchsense_core::store::{ArtifactStore, InMemoryArtifactStore};

#[derive(Parser)]
#[command(name = "pitchsensectl", about = "Operate the pitchsense job fabric from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliJobKind {
    Ingestion,
    VideoProcessing,
    Calibration,
    Metrics,
    PhaseClassification,
    PatternDetection,
    Analysis,
    Report,
}

impl From<CliJobKind> for JobKind {
    fn from(kind: CliJobKind) -> Self {
        match kind {
            CliJobKind::Ingestion => JobKind::Ingestion,
            CliJobKind::VideoProcessing => JobKind::VideoProcessing,
            CliJobKind::Calibration => JobKind::Calibration,
            CliJobKind::Metrics => JobKind::Metrics,
            CliJobKind::PhaseClassification => JobKind::PhaseClassification,
            CliJobKind::PatternDetection => JobKind::PatternDetection,
            CliJobKind::Analysis => JobKind::Analysis,
            CliJobKind::Report => JobKind::Report,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Dispatch a job and run it to completion in-process.
    Enqueue {
        #[arg(value_enum)]
        kind: CliJobKind,
        /// Idempotency key (e.g. a match id).
        key: String,
        /// JSON payload, or '-' to read it from stdin.
        #[arg(default_value = "{}")]
        payload: String,
    },
    /// Print a previously dispatched job's record as JSON.
    Status { job_id: String },
    /// Cancel a pending or running job.
    Cancel { job_id: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // A single-process fabric: `status`/`cancel` against a job id from
    // a prior invocation only make sense against a long-lived
    // `pitchsensed`, not this CLI's own ephemeral fabric. This binary
    // is for `enqueue`'s synchronous run-to-completion use, primarily;
    // `status`/`cancel` are provided for API-shape parity and local
    // scripting against a fabric built up within one invocation.
    let fabric = JobFabric::new();
    let artifact_store = InMemoryArtifactStore::new();

    match run(&cli.command, &fabric, &artifact_store) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

fn run(command: &Command, fabric: &JobFabric, artifact_store: &InMemoryArtifactStore) -> pitchsense_core::error::Result<ExitCode> {
    match command {
        Command::Enqueue { kind, key, payload } => {
            let payload_str = if payload == "-" {
                use std::io::Read;
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| PitchSenseError::BadInput(format!("failed to read stdin payload: {e}")))?;
                buf
            } else {
                payload.clone()
            };
            let payload_json: serde_json::Value = serde_json::from_str(&payload_str)
                .map_err(|e| PitchSenseError::BadInput(format!("invalid JSON payload: {e}")))?;

            let job_kind: JobKind = (*kind).into();
            let outcome = fabric.dispatch(job_kind, key, key, Some(payload_json.clone()))?;

            let ports = StagePorts {
                artifact_store: Some(artifact_store as &dyn ArtifactStore),
                ..StagePorts::default()
            };
            let record = fabric.run_with_retries(&outcome.job_id, |token| {
                if token.is_cancelled() {
                    return Err(PitchSenseError::Cancelled);
                }
                orchestration::execute_stage(job_kind, &payload_json, &ports).map(|o| o.result)
            })?;

            println!("{}", serde_json::to_string_pretty(&record).unwrap());
            Ok(if record.is_terminal() && record.error.is_none() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Status { job_id } => {
            let record = fabric.status(job_id)?;
            println!("{}", serde_json::to_string_pretty(&record).unwrap());
            Ok(ExitCode::SUCCESS)
        }
        Command::Cancel { job_id } => {
            let record = fabric.cancel(job_id)?;
            println!("{}", serde_json::to_string_pretty(&record).unwrap());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code_for(err: &PitchSenseError) -> ExitCode {
    match err {
        PitchSenseError::BadInput(_) => ExitCode::from(2),
        PitchSenseError::NotFound(_) => ExitCode::from(3),
        _ => ExitCode::FAILURE,
    }
}
