//! Tracking primitives: `TrajectoryPoint`, `PlayerTrajectory` and the
//! per-frame `MatchFrame` snapshot consumed by the pitch-control engine.
//!
//! Grounded on `original_source/.../entities/player_trajectory.py`. The
//! Python original computes and lazily caches velocities/metrics inside
//! the entity itself; per the explicit-memoization redesign the cache
//! fields here are plain `Option`s written by the stabilizer/physical
//! engines, not lazily recomputed behind a property getter.

use serde::{Deserialize, Serialize};

use crate::error::{PitchSenseError, Result};

/// What kind of tracked object a `TrajectoryPoint` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Player,
    Ball,
    Referee,
    Goalkeeper,
}

/// A single raw (or stabilized) detection, one track id per tracked
/// object. Immutable after the stabilizer produces it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub frame_id: i64,
    pub track_id: i64,
    pub x: f64,
    pub y: f64,
    pub object_kind: ObjectKind,
    pub team: Option<TeamSide>,
    pub confidence: Option<f64>,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Home,
    Away,
}

/// One frame's (x, y, timestamp) sample for a single track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramePosition {
    pub frame_id: i64,
    pub x: f64,
    pub y: f64,
    pub timestamp: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PhysicalMetrics {
    pub total_distance_km: f64,
    pub max_speed_kmh: f64,
    pub sprint_count: usize,
    pub avg_speed_kmh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprint {
    pub start_frame: i64,
    pub end_frame: i64,
    pub max_speed_kmh: f64,
    pub distance_m: f64,
}

/// Ordered-by-frame sequence of positions for one track id, with
/// explicit, invalidation-on-demand caches for the expensive derived
/// values engines compute from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerTrajectory {
    pub player_id: String,
    pub frames: Vec<FramePosition>,
    pub fps: f64,
    pub sprint_threshold_kmh: f64,

    cached_velocities_ms: Option<Vec<f64>>,
    cached_metrics: Option<PhysicalMetrics>,
}

impl PlayerTrajectory {
    /// Builds a trajectory from frame positions, sorting by `frame_id`.
    /// Rejects duplicate frame ids with `BadInput`, matching the
    /// stabilizer's input contract.
    pub fn new(player_id: impl Into<String>, mut frames: Vec<FramePosition>, fps: f64) -> Result<Self> {
        frames.sort_by_key(|f| f.frame_id);
        for pair in frames.windows(2) {
            if pair[0].frame_id == pair[1].frame_id {
                return Err(PitchSenseError::BadInput(format!(
                    "duplicate frame_id {} in trajectory",
                    pair[0].frame_id
                )));
            }
        }
        Ok(Self {
            player_id: player_id.into(),
            frames,
            fps,
            sprint_threshold_kmh: 25.0,
            cached_velocities_ms: None,
            cached_metrics: None,
        })
    }

    pub fn with_sprint_threshold(mut self, kmh: f64) -> Self {
        self.sprint_threshold_kmh = kmh;
        self
    }

    pub fn velocities_ms(&self) -> Option<&[f64]> {
        self.cached_velocities_ms.as_deref()
    }

    pub fn metrics(&self) -> Option<&PhysicalMetrics> {
        self.cached_metrics.as_ref()
    }

    /// Written by the physical-metrics engine once it has smoothed
    /// per-frame speeds. Length must equal `frames.len()`.
    pub fn set_velocities(&mut self, velocities_ms: Vec<f64>) {
        debug_assert_eq!(velocities_ms.len(), self.frames.len());
        self.cached_velocities_ms = Some(velocities_ms);
        self.cached_metrics = None;
    }

    pub fn set_metrics(&mut self, metrics: PhysicalMetrics) {
        self.cached_metrics = Some(metrics);
    }

    /// Clears both caches, e.g. after an outlier-clipping pass mutates
    /// frame positions in place.
    pub fn invalidate_caches(&mut self) {
        self.cached_velocities_ms = None;
        self.cached_metrics = None;
    }

    /// Replaces a single frame's position (used by the stabilizer's
    /// clip-mode outlier handling) and invalidates derived caches.
    pub fn replace_frame(&mut self, index: usize, x: f64, y: f64) {
        if let Some(frame) = self.frames.get_mut(index) {
            frame.x = x;
            frame.y = y;
        }
        self.invalidate_caches();
    }
}

/// A single player's position within a `MatchFrame` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerFrameEntry {
    pub player_id_hash: i64,
    pub team: TeamSide,
    pub x: f64,
    pub y: f64,
    pub velocity: Option<(f64, f64)>,
}

/// Snapshot of all tracked positions at one frame, consumed by the
/// pitch-control engine. Positions are expected inside an expanded
/// pitch rectangle; the stabilizer is responsible for flagging (not
/// silently clipping) anything beyond tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchFrame {
    pub frame_id: i64,
    pub players: Vec<PlayerFrameEntry>,
    pub ball: (f64, f64),
    pub pitch_length: f64,
    pub pitch_width: f64,
    pub grid_width: usize,
    pub grid_height: usize,
}

impl MatchFrame {
    pub fn home_players(&self) -> impl Iterator<Item = &PlayerFrameEntry> {
        self.players.iter().filter(|p| p.team == TeamSide::Home)
    }

    pub fn away_players(&self) -> impl Iterator<Item = &PlayerFrameEntry> {
        self.players.iter().filter(|p| p.team == TeamSide::Away)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_frame_ids() {
        let frames = vec![
            FramePosition { frame_id: 1, x: 0.0, y: 0.0, timestamp: 0.0 },
            FramePosition { frame_id: 1, x: 1.0, y: 1.0, timestamp: 0.04 },
        ];
        assert!(PlayerTrajectory::new("p1", frames, 25.0).is_err());
    }

    #[test]
    fn sorts_frames_by_frame_id() {
        let frames = vec![
            FramePosition { frame_id: 3, x: 0.0, y: 0.0, timestamp: 0.12 },
            FramePosition { frame_id: 1, x: 0.0, y: 0.0, timestamp: 0.04 },
            FramePosition { frame_id: 2, x: 0.0, y: 0.0, timestamp: 0.08 },
        ];
        let traj = PlayerTrajectory::new("p1", frames, 25.0).unwrap();
        let ids: Vec<i64> = traj.frames.iter().map(|f| f.frame_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn set_velocities_invalidates_stale_metrics_on_replace() {
        let frames = vec![
            FramePosition { frame_id: 1, x: 0.0, y: 0.0, timestamp: 0.0 },
            FramePosition { frame_id: 2, x: 1.0, y: 0.0, timestamp: 0.04 },
        ];
        let mut traj = PlayerTrajectory::new("p1", frames, 25.0).unwrap();
        traj.set_velocities(vec![1.0, 1.0]);
        traj.set_metrics(PhysicalMetrics { total_distance_km: 0.001, max_speed_kmh: 3.6, sprint_count: 0, avg_speed_kmh: 3.6 });
        assert!(traj.metrics().is_some());
        traj.replace_frame(1, 5.0, 0.0);
        assert!(traj.metrics().is_none());
        assert!(traj.velocities_ms().is_none());
    }
}
