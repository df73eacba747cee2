//! Domain model: the entities and value objects every engine reads and
//! writes. Grounded on `original_source/.../domain/{entities,value_objects}`.

pub mod event;
pub mod job;
pub mod pattern;
pub mod phase;
pub mod possession;
pub mod report;
pub mod tactical_match;
pub mod trajectory;

pub use event::{Event, EventKind, Match};
pub use job::{AnalysisJob, AnalysisResult, JobStatus};
pub use pattern::{RunningStat, TacticalPattern};
pub use phase::{FramePhase, GamePhase, PhaseFeatures, PhaseSequence, PhaseTransition};
pub use possession::{PossessionSequence, SequenceFeatures};
pub use report::{ContentType, ReportSection, TacticalReport};
pub use tactical_match::{
    PpdaResult, PressureMetrics, TacticalMatch, TeamRole, XtChainResult, XtEvent,
};
pub use trajectory::{
    FramePosition, MatchFrame, ObjectKind, PhysicalMetrics, PlayerFrameEntry, PlayerTrajectory,
    Sprint, TeamSide, TrajectoryPoint,
};
