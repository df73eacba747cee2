//! `PossessionSequence` and its 15-dim `SequenceFeatures` vector.
//!
//! Grounded on `original_source/.../entities/possession_sequence.py`
//! and `value_objects/sequence_features.py`. The original caches
//! `_features` lazily inside the entity; here `extract_features` is a
//! pure function taking the xT grid explicitly (no hidden import), and
//! the caller decides whether to memoize the result.

use serde::{Deserialize, Serialize};

use crate::domain::event::{Event, EventKind};
use crate::xt_grid::ExpectedThreatGrid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PossessionSequence {
    pub sequence_id: String,
    pub match_id: String,
    pub team_id: String,
    pub start_frame: i64,
    pub end_frame: i64,
    pub events: Vec<Event>,
    pub pattern_id: Option<String>,
    pub cluster_label: Option<i32>,
}

impl PossessionSequence {
    pub fn new(
        sequence_id: impl Into<String>,
        match_id: impl Into<String>,
        team_id: impl Into<String>,
        start_frame: i64,
        end_frame: i64,
        events: Vec<Event>,
    ) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            match_id: match_id.into(),
            team_id: team_id.into(),
            start_frame,
            end_frame,
            events,
            pattern_id: None,
            cluster_label: None,
        }
    }

    pub fn duration_seconds(&self, fps: f64) -> f64 {
        (self.end_frame - self.start_frame) as f64 / fps
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    fn event_counts(&self) -> (usize, usize, usize, usize) {
        let mut pass = 0;
        let mut carry = 0;
        let mut dribble = 0;
        let mut shot = 0;
        for e in &self.events {
            match e.event_type {
                EventKind::Pass => pass += 1,
                EventKind::Carry => carry += 1,
                EventKind::Dribble => dribble += 1,
                EventKind::Shot => shot += 1,
                _ => {}
            }
        }
        (pass, carry, dribble, shot)
    }

    pub fn ended_in_shot(&self) -> bool {
        self.events.last().map(|e| e.event_type == EventKind::Shot).unwrap_or(false)
    }

    pub fn ended_in_goal(&self) -> bool {
        self.events.iter().rev().any(|e| e.event_type == EventKind::Goal)
    }

    /// 4x3 pitch zone (0..11) of the sequence's first/last event.
    fn start_zone(&self) -> usize {
        self.events
            .first()
            .map(|e| e.coordinates.zone_4x3(crate::geometry::PITCH_LENGTH_M, crate::geometry::PITCH_WIDTH_M))
            .unwrap_or(0)
    }

    fn end_zone(&self) -> usize {
        self.events
            .last()
            .map(|e| e.coordinates.zone_4x3(crate::geometry::PITCH_LENGTH_M, crate::geometry::PITCH_WIDTH_M))
            .unwrap_or(0)
    }

    /// Builds the clustering feature vector. `fps` drives duration;
    /// `xt_grid` is passed explicitly rather than looked up globally.
    pub fn extract_features(&self, fps: f64, xt_grid: &ExpectedThreatGrid) -> SequenceFeatures {
        let (pass_count, carry_count, dribble_count, shot_count) = self.event_counts();
        let start_zone = self.start_zone();
        let end_zone = self.end_zone();

        let xt_start = self
            .events
            .first()
            .map(|e| xt_grid.threat_at_location(e.coordinates.x, e.coordinates.y))
            .unwrap_or(0.01);
        let xt_end = self
            .events
            .last()
            .map(|e| xt_grid.threat_at_location(e.coordinates.x, e.coordinates.y))
            .unwrap_or(0.01);

        let ended_in_shot = self.ended_in_shot();
        let ended_in_goal = self.ended_in_goal();

        SequenceFeatures {
            start_zone: start_zone as i32,
            end_zone: end_zone as i32,
            zone_progression: end_zone as i32 - start_zone as i32,
            duration_seconds: self.duration_seconds(fps),
            event_count: self.event_count(),
            pass_count,
            carry_count,
            dribble_count,
            shot_attempted: shot_count > 0,
            xt_start,
            xt_end,
            xt_progression: xt_end - xt_start,
            ended_in_shot,
            ended_in_goal,
            possession_lost: !ended_in_shot && !ended_in_goal,
        }
    }
}

/// 15-dim feature vector clustering consumes. Field order is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SequenceFeatures {
    pub start_zone: i32,
    pub end_zone: i32,
    pub zone_progression: i32,
    pub duration_seconds: f64,
    pub event_count: usize,
    pub pass_count: usize,
    pub carry_count: usize,
    pub dribble_count: usize,
    pub shot_attempted: bool,
    pub xt_start: f64,
    pub xt_end: f64,
    pub xt_progression: f64,
    pub ended_in_shot: bool,
    pub ended_in_goal: bool,
    pub possession_lost: bool,
}

pub const NUM_SEQUENCE_FEATURES: usize = 15;

impl SequenceFeatures {
    pub fn to_vector(&self) -> [f64; NUM_SEQUENCE_FEATURES] {
        [
            self.start_zone as f64,
            self.end_zone as f64,
            self.zone_progression as f64,
            self.duration_seconds,
            self.event_count as f64,
            self.pass_count as f64,
            self.carry_count as f64,
            self.dribble_count as f64,
            if self.shot_attempted { 1.0 } else { 0.0 },
            self.xt_start,
            self.xt_end,
            self.xt_progression,
            if self.ended_in_shot { 1.0 } else { 0.0 },
            if self.ended_in_goal { 1.0 } else { 0.0 },
            if self.possession_lost { 1.0 } else { 0.0 },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Coordinates;
    use crate::xt_grid::XT_GRID;

    fn event(kind: EventKind, x: f64, y: f64) -> Event {
        Event::new("e", kind, 0.0, Coordinates::new(x, y), "p1")
    }

    #[test]
    fn ended_in_shot_and_goal_detection() {
        let seq = PossessionSequence::new(
            "s1",
            "m1",
            "home",
            0,
            50,
            vec![event(EventKind::Pass, 30.0, 34.0), event(EventKind::Shot, 95.0, 34.0)],
        );
        assert!(seq.ended_in_shot());
        assert!(!seq.ended_in_goal());
    }

    #[test]
    fn extract_features_has_expected_dimension() {
        let xt = &*XT_GRID;
        let seq = PossessionSequence::new(
            "s1",
            "m1",
            "home",
            0,
            50,
            vec![event(EventKind::Pass, 30.0, 34.0), event(EventKind::Shot, 95.0, 34.0)],
        );
        let features = seq.extract_features(25.0, xt);
        assert_eq!(features.to_vector().len(), NUM_SEQUENCE_FEATURES);
        assert!(features.xt_progression > 0.0);
    }
}
