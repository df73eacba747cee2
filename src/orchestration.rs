//! Stage dispatch: maps a job's `JobKind` and JSON payload onto the
//! concrete engine call that does the work, and reports which
//! follow-on job (if any) it wants chained. Shared by the
//! `pitchsensed` worker loop and `pitchsensectl`'s in-process runner
//! so neither binary re-wires the engines on its own.
//!
//! Grounded on `original_source/.../use_cases/*.py` (each use case
//! collapses here onto one `JobKind`, routed through the shared job
//! fabric instead of a bespoke workflow per use case).

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::adapters::feed::{FeedEventRow, FeedParser, SourceAFeedParser, SourceBFeedParser};
use crate::adapters::ports::{ChartRenderer, LlmAnalysisAdapter, RagIndexPort};
use crate::domain::phase::PhaseFeatures;
use crate::domain::trajectory::{FramePosition, PlayerTrajectory, TrajectoryPoint};
use crate::engines::inferencer::{self, InferencerConfig};
use crate::engines::phase_classifier::PhaseClassifierAdapter;
use crate::engines::physical;
use crate::engines::possession_extractor;
use crate::engines::stabilizer::{self, StabilizerConfig};
use crate::error::{PitchSenseError, Result};
use crate::jobs::record::JobKind;
use crate::report_composer::{self, ChartSpec, ComposeRequest};
use crate::store::artifact::{report_key, tracking_key, ArtifactStore};
use crate::store::table::Table;

/// A job kind that should run next, produced best-effort by the stage
/// that just finished. The caller (the worker loop) decides whether
/// and how to dispatch it; a chaining failure must never fail the
/// stage that proposed it.
#[derive(Debug, Clone)]
pub struct ChainedJob {
    pub kind: JobKind,
    pub idempotency_key: String,
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    pub result: Value,
    pub chained: Vec<ChainedJob>,
}

/// Ports a stage may call through. Most are optional: a stage that
/// needs one and finds it missing either degrades gracefully (report
/// composition without a chart renderer) or fails outright (analysis
/// without an adapter) — see each stage function for which.
#[derive(Default)]
pub struct StagePorts<'a> {
    pub chart_renderer: Option<&'a dyn ChartRenderer>,
    pub analysis_adapter: Option<&'a dyn LlmAnalysisAdapter>,
    /// Best-effort match indexing, called after a successful ingest.
    /// A missing port or a failed call never fails the ingestion job.
    pub rag_index: Option<&'a dyn RagIndexPort>,
    /// Backing store for the stabilized trajectory table and composed
    /// reports. A missing store just skips persistence (e.g. in unit
    /// tests exercising a stage's computation in isolation).
    pub artifact_store: Option<&'a dyn ArtifactStore>,
}

fn bad_input(err: impl std::fmt::Display) -> PitchSenseError {
    PitchSenseError::BadInput(err.to_string())
}

fn parse_payload<T: for<'de> Deserialize<'de>>(payload: &Value) -> Result<T> {
    serde_json::from_value(payload.clone()).map_err(bad_input)
}

/// Runs one job's work. Called from inside `Execute::run_with_retries`'s
/// closure, so any `Err` returned here drives the fabric's retry and
/// backoff policy exactly as it would for a transient I/O failure.
pub fn execute_stage(kind: JobKind, payload: &Value, ports: &StagePorts) -> Result<StageOutcome> {
    match kind {
        JobKind::Ingestion => ingest(payload, ports),
        JobKind::VideoProcessing => process_video(payload, ports),
        JobKind::Calibration => calibrate(payload),
        JobKind::Metrics => compute_metrics(payload),
        JobKind::PhaseClassification => classify_phases(payload),
        JobKind::PatternDetection => detect_patterns(payload),
        JobKind::Analysis => analyze(payload, ports),
        JobKind::Report => compose_report(payload, ports),
    }
}

#[derive(Deserialize)]
struct IngestionPayload {
    source: String,
    match_id: String,
    #[serde(default)]
    rows: Vec<FeedEventRow>,
}

fn ingest(payload: &Value, ports: &StagePorts) -> Result<StageOutcome> {
    let req: IngestionPayload = parse_payload(payload)?;
    let parsed = match req.source.as_str() {
        "a" => SourceAFeedParser::default().parse(&req.match_id, &req.rows),
        "b" => SourceBFeedParser.parse(&req.match_id, &req.rows),
        other => return Err(PitchSenseError::BadInput(format!("unknown feed source '{other}'"))),
    };
    let m = parsed.map_err(bad_input)?;

    let result = serde_json::json!({
        "match_id": m.match_id,
        "home_team_id": m.home_team_id,
        "away_team_id": m.away_team_id,
        "event_count": m.events.len(),
    });

    // Best-effort RAG index of the newly ingested match. A missing
    // port or a failed call must never fail the ingestion job itself.
    if let Some(rag_index) = ports.rag_index {
        if let Err(e) = rag_index.index_match(&m.match_id) {
            warn!(match_id = %m.match_id, error = %e, "rag index failed, ingestion still succeeds");
        }
    }

    Ok(StageOutcome { result, chained: Vec::new() })
}

#[derive(Deserialize)]
struct VideoProcessingPayload {
    match_id: String,
    fps: f64,
    points: Vec<TrajectoryPoint>,
    #[serde(default)]
    mode: String,
}

fn process_video(payload: &Value, ports: &StagePorts) -> Result<StageOutcome> {
    let req: VideoProcessingPayload = parse_payload(payload)?;
    let config = StabilizerConfig::default();
    let stabilized = stabilizer::stabilize(req.points, req.fps, &config)?;
    let inferred = inferencer::infer_events(&stabilized.points, &InferencerConfig::default(), None);

    if let Some(store) = ports.artifact_store {
        let table = Table::from_trajectory_points(&stabilized.points);
        store.put_table(&tracking_key(&req.match_id), &table)?;
    }

    let result = serde_json::json!({
        "match_id": req.match_id,
        "stabilized_point_count": stabilized.points.len(),
        "flagged_speed_violations": stabilized.flagged.len(),
        "inferred_event_count": inferred.len(),
    });

    // A full-match pass feeds straight into the metrics stage; a short
    // clip (e.g. a single highlight) is left for the caller to chain
    // explicitly once they decide which match it belongs to.
    let mut chained = Vec::new();
    if req.mode == "full_match" {
        chained.push(ChainedJob {
            kind: JobKind::Metrics,
            idempotency_key: req.match_id.clone(),
            payload: Some(serde_json::json!({ "match_id": req.match_id })),
        });
    }

    Ok(StageOutcome { result, chained })
}

#[derive(Deserialize)]
struct CalibrationPayload {
    keypoints: Vec<crate::geometry::Keypoint>,
}

fn calibrate(payload: &Value) -> Result<StageOutcome> {
    let req: CalibrationPayload = parse_payload(payload)?;
    let homography = crate::geometry::HomographyMatrix::fit(&req.keypoints)?;
    Ok(StageOutcome {
        result: serde_json::json!({ "matrix": homography.matrix }),
        chained: Vec::new(),
    })
}

#[derive(Deserialize)]
struct MetricsPayload {
    match_id: String,
    #[serde(default = "default_fps")]
    fps: f64,
    #[serde(default)]
    players: Vec<PlayerFrames>,
}

#[derive(Deserialize)]
struct PlayerFrames {
    player_id: String,
    frames: Vec<FramePosition>,
}

fn default_fps() -> f64 {
    25.0
}

fn compute_metrics(payload: &Value) -> Result<StageOutcome> {
    let req: MetricsPayload = parse_payload(payload)?;

    let mut per_player = Vec::with_capacity(req.players.len());
    for p in req.players {
        let trajectory = PlayerTrajectory::new(p.player_id.clone(), p.frames, req.fps)?;
        let metrics = physical::compute_metrics(&trajectory);
        let sprints = physical::detect_sprints(&trajectory);
        per_player.push(serde_json::json!({
            "player_id": p.player_id,
            "total_distance_km": metrics.total_distance_km,
            "max_speed_kmh": metrics.max_speed_kmh,
            "sprint_count": metrics.sprint_count,
            "avg_speed_kmh": metrics.avg_speed_kmh,
            "sprints": sprints.len(),
        }));
    }

    let result = serde_json::json!({
        "match_id": req.match_id,
        "players": per_player,
    });

    Ok(StageOutcome { result, chained: Vec::new() })
}

#[derive(Deserialize)]
struct PhaseClassificationPayload {
    match_id: String,
    frames: Vec<TrackingFrame>,
}

#[derive(Deserialize)]
struct TrackingFrame {
    home_positions: Vec<(f64, f64)>,
    away_positions: Vec<(f64, f64)>,
    ball_position: (f64, f64),
    #[serde(default)]
    ball_velocity: (f64, f64),
}

fn classify_phases(payload: &Value) -> Result<StageOutcome> {
    let req: PhaseClassificationPayload = parse_payload(payload)?;
    let classifier = PhaseClassifierAdapter::new();
    if !classifier.is_trained() {
        return Err(PitchSenseError::ModelNotTrained);
    }

    let phases: Vec<_> = req
        .frames
        .iter()
        .map(|f| {
            let features = PhaseFeatures::from_tracking_frame(
                &f.home_positions,
                &f.away_positions,
                f.ball_position,
                f.ball_velocity,
            );
            let (phase, confidence) = classifier.classify_with_confidence(&features);
            serde_json::json!({ "phase": phase, "confidence": confidence })
        })
        .collect();

    Ok(StageOutcome {
        result: serde_json::json!({ "match_id": req.match_id, "phases": phases }),
        chained: Vec::new(),
    })
}

#[derive(Deserialize)]
struct PatternDetectionPayload {
    match_id: String,
    team_id: String,
    #[serde(default = "default_fps")]
    fps: f64,
    events: Vec<crate::domain::event::Event>,
}

fn detect_patterns(payload: &Value) -> Result<StageOutcome> {
    let req: PatternDetectionPayload = parse_payload(payload)?;
    let mut events = req.events;
    events.sort_by(|a, b| a.timestamp.partial_cmp(&b.timestamp).unwrap_or(std::cmp::Ordering::Equal));

    let sequences = possession_extractor::extract_sequences(&req.match_id, &events, req.fps, |e| {
        (e.timestamp * req.fps) as i64
    });

    if sequences.len() < 2 {
        return Ok(StageOutcome {
            result: serde_json::json!({ "match_id": req.match_id, "team_id": req.team_id, "patterns": [] }),
            chained: Vec::new(),
        });
    }

    let mut adapter = crate::engines::pattern_adapter::PatternAdapter::new();
    let n_clusters = sequences.len().min(4).max(1);
    adapter.fit(&sequences, n_clusters, req.fps, &crate::xt_grid::XT_GRID);
    let patterns = adapter.get_patterns(&sequences, &req.match_id, &req.team_id, req.fps, &crate::xt_grid::XT_GRID);

    Ok(StageOutcome {
        result: serde_json::json!({
            "match_id": req.match_id,
            "team_id": req.team_id,
            "sequence_count": sequences.len(),
            "patterns": patterns,
        }),
        chained: Vec::new(),
    })
}

fn analyze(payload: &Value, ports: &StagePorts) -> Result<StageOutcome> {
    #[derive(Deserialize)]
    struct AnalysisPayload {
        match_id: String,
        query: String,
    }
    let req: AnalysisPayload = parse_payload(payload)?;
    let adapter = ports
        .analysis_adapter
        .ok_or_else(|| PitchSenseError::UpstreamUnavailable("no LlmAnalysisAdapter configured".to_string()))?;
    let result = adapter.analyze(&req.match_id, &req.query)?;
    Ok(StageOutcome {
        result: serde_json::json!({
            "content": result.content,
            "tokens_used": result.tokens_used,
            "duration_seconds": result.duration_seconds,
        }),
        chained: Vec::new(),
    })
}

#[derive(Deserialize)]
struct ReportPayload {
    report_id: String,
    match_id: String,
    team_id: String,
    title: String,
    #[serde(default)]
    summary_text: Option<String>,
    #[serde(default)]
    key_metrics: Option<Value>,
    #[serde(default)]
    charts: Vec<ChartSpec>,
    #[serde(default)]
    include_ai_analysis: bool,
    #[serde(default)]
    ai_query: Option<String>,
}

fn compose_report(payload: &Value, ports: &StagePorts) -> Result<StageOutcome> {
    let req: ReportPayload = parse_payload(payload)?;
    let mut compose_req = ComposeRequest::new(req.report_id, req.match_id, req.team_id, req.title);
    if let Some(summary) = req.summary_text {
        compose_req.summary_text = summary;
    }
    compose_req.key_metrics = req.key_metrics;
    compose_req.charts = req.charts;
    compose_req.include_ai_analysis = req.include_ai_analysis;
    if let Some(query) = req.ai_query {
        compose_req.ai_query = query;
    }

    let report = report_composer::compose(compose_req, ports.chart_renderer, ports.analysis_adapter)?;
    let result = report.to_json();

    if let Some(store) = ports.artifact_store {
        let bytes = serde_json::to_vec(&result).map_err(|e| PitchSenseError::internal(e.to_string(), report.report_id.clone()))?;
        store.put_object(&report_key(&report.report_id), bytes, "application/json")?;
    }

    Ok(StageOutcome { result, chained: Vec::new() })
}
