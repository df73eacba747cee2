//! Contract-only ports for collaborators explicitly out of scope:
//! the object detector, multi-object tracker, chart rasterizer and
//! LLM multi-agent orchestration. No implementation lives in this
//! crate; these traits exist so the job fabric can depend on an
//! interface and accept whatever concrete adapter the deployment
//! wires in.
//!
//! Grounded on `original_source/.../domain/ports/{object_detector,
//! object_tracker,keypoint_detector}.py` and
//! `infrastructure/reports/chart_generator.py` — each a Python ABC
//! with zero inbound dependencies from the domain layer, carried here
//! as a `Send + Sync` trait.

use crate::error::Result;
use crate::geometry::{BoundingBox, Keypoint};

/// Detects objects (players, ball, referees) in a single decoded video
/// frame. The frame representation is left to the implementation —
/// this crate never decodes video.
pub trait ObjectDetector: Send + Sync {
    fn detect(&self, frame: &[u8], width: u32, height: u32) -> Result<Vec<BoundingBox>>;
    fn load_model(&mut self, model_path: &str) -> Result<()>;
}

/// Associates per-frame detections into persistent track ids across a
/// video.
pub trait MultiObjectTracker: Send + Sync {
    fn update(&mut self, detections: &[BoundingBox], frame_id: i64) -> Result<Vec<crate::domain::trajectory::TrajectoryPoint>>;
    fn reset(&mut self);
}

/// Detects pitch-landmark keypoints in a frame, for homography fitting.
pub trait KeypointDetector: Send + Sync {
    fn detect(&self, frame: &[u8], width: u32, height: u32) -> Result<Vec<Keypoint>>;
}

/// Rasterizes a chart-type `ReportSection`'s content into an embeddable
/// image. Out of scope to implement; the report composer calls through
/// this port and leaves the bytes opaque.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, chart_spec: &serde_json::Value) -> Result<Vec<u8>>;
}

/// LLM multi-agent tactical-analysis orchestration. Out of scope to
/// implement: the report composer calls through this port for the
/// "AI Tactical Analysis" section and treats its output as opaque text
/// plus token/duration accounting.
pub trait LlmAnalysisAdapter: Send + Sync {
    fn analyze(&self, match_id: &str, query: &str) -> Result<crate::domain::job::AnalysisResult>;
}

/// Vector embedding / RAG retrieval store. Out of scope to implement
/// here; the ingestion stage calls through this port directly,
/// best-effort, once a match's events are parsed. A missing port or a
/// failed call must never fail ingestion itself.
pub trait RagIndexPort: Send + Sync {
    fn index_match(&self, match_id: &str) -> Result<()>;
}
