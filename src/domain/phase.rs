//! `PhaseFeatures`, `GamePhase` and the `PhaseSequence` that ties per-frame
//! classifications together.
//!
//! Grounded on `original_source/.../value_objects/{game_phase,
//! phase_features}.py` and `entities/phase_sequence.py`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PitchSenseError, Result};

pub const NUM_PHASE_FEATURES: usize = 15;

/// 15-dim per-frame feature vector for phase classification. Field
/// order is fixed and must match `feature_names()`/`to_vector()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseFeatures {
    pub home_centroid_x: f64,
    pub home_centroid_y: f64,
    pub away_centroid_x: f64,
    pub away_centroid_y: f64,
    pub home_spread_x: f64,
    pub home_spread_y: f64,
    pub away_spread_x: f64,
    pub away_spread_y: f64,
    pub ball_x: f64,
    pub ball_y: f64,
    pub ball_velocity_x: f64,
    pub ball_velocity_y: f64,
    pub home_defensive_line: f64,
    pub away_defensive_line: f64,
    pub home_possession_prob: f64,
}

impl PhaseFeatures {
    pub fn to_vector(&self) -> [f64; NUM_PHASE_FEATURES] {
        [
            self.home_centroid_x,
            self.home_centroid_y,
            self.away_centroid_x,
            self.away_centroid_y,
            self.home_spread_x,
            self.home_spread_y,
            self.away_spread_x,
            self.away_spread_y,
            self.ball_x,
            self.ball_y,
            self.ball_velocity_x,
            self.ball_velocity_y,
            self.home_defensive_line,
            self.away_defensive_line,
            self.home_possession_prob,
        ]
    }

    pub fn feature_names() -> [&'static str; NUM_PHASE_FEATURES] {
        [
            "home_centroid_x",
            "home_centroid_y",
            "away_centroid_x",
            "away_centroid_y",
            "home_spread_x",
            "home_spread_y",
            "away_spread_x",
            "away_spread_y",
            "ball_x",
            "ball_y",
            "ball_velocity_x",
            "ball_velocity_y",
            "home_defensive_line",
            "away_defensive_line",
            "home_possession_prob",
        ]
    }

    /// Extracts features from raw per-team position lists. Empty team
    /// position lists fall back to pitch-center / 100m distance
    /// defaults, matching the original feature extractor.
    pub fn from_tracking_frame(
        home_positions: &[(f64, f64)],
        away_positions: &[(f64, f64)],
        ball_position: (f64, f64),
        ball_velocity: (f64, f64),
    ) -> Self {
        let (home_cx, home_cy, home_sx, home_sy) = centroid_and_spread(home_positions, (52.5, 34.0));
        let (away_cx, away_cy, away_sx, away_sy) = centroid_and_spread(away_positions, (52.5, 34.0));

        let home_def_line = defensive_line(home_positions, true, 15.0);
        let away_def_line = defensive_line(away_positions, false, 90.0);

        let home_ball_dist = min_distance_to(home_positions, ball_position).unwrap_or(100.0);
        let away_ball_dist = min_distance_to(away_positions, ball_position).unwrap_or(100.0);
        let dist_diff = away_ball_dist - home_ball_dist;
        let home_possession_prob = 1.0 / (1.0 + (-dist_diff / 2.0).exp());

        Self {
            home_centroid_x: home_cx,
            home_centroid_y: home_cy,
            away_centroid_x: away_cx,
            away_centroid_y: away_cy,
            home_spread_x: home_sx,
            home_spread_y: home_sy,
            away_spread_x: away_sx,
            away_spread_y: away_sy,
            ball_x: ball_position.0,
            ball_y: ball_position.1,
            ball_velocity_x: ball_velocity.0,
            ball_velocity_y: ball_velocity.1,
            home_defensive_line: home_def_line,
            away_defensive_line: away_def_line,
            home_possession_prob,
        }
    }
}

fn centroid_and_spread(positions: &[(f64, f64)], default: (f64, f64)) -> (f64, f64, f64, f64) {
    use statrs::statistics::Statistics;

    if positions.is_empty() {
        return (default.0, default.1, 0.0, 0.0);
    }
    let xs: Vec<f64> = positions.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = positions.iter().map(|p| p.1).collect();
    let mean_x = xs.as_slice().mean();
    let mean_y = ys.as_slice().mean();
    if positions.len() < 2 {
        return (mean_x, mean_y, 0.0, 0.0);
    }
    // `std_dev` is the sample standard deviation (divides by n - 1).
    (mean_x, mean_y, xs.as_slice().std_dev(), ys.as_slice().std_dev())
}

fn defensive_line(positions: &[(f64, f64)], home: bool, default: f64) -> f64 {
    if positions.is_empty() {
        return default;
    }
    let mut xs: Vec<f64> = positions.iter().map(|p| p.0).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    if !home {
        xs.reverse();
    }
    let take = xs.len().min(4);
    xs[..take].iter().sum::<f64>() / take as f64
}

fn min_distance_to(positions: &[(f64, f64)], target: (f64, f64)) -> Option<f64> {
    positions
        .iter()
        .map(|p| ((p.0 - target.0).powi(2) + (p.1 - target.1).powi(2)).sqrt())
        .fold(None, |acc, d| Some(acc.map_or(d, |m: f64| m.min(d))))
}

/// Closed set of tactical phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    OrganizedAttack,
    OrganizedDefense,
    TransitionAtkDef,
    TransitionDefAtk,
    Unknown,
}

pub const ALL_GAME_PHASES: [GamePhase; 5] = [
    GamePhase::OrganizedAttack,
    GamePhase::OrganizedDefense,
    GamePhase::TransitionAtkDef,
    GamePhase::TransitionDefAtk,
    GamePhase::Unknown,
];

impl GamePhase {
    pub fn is_attacking(self) -> bool {
        matches!(self, GamePhase::OrganizedAttack | GamePhase::TransitionDefAtk)
    }

    pub fn is_defensive(self) -> bool {
        matches!(self, GamePhase::OrganizedDefense | GamePhase::TransitionAtkDef)
    }

    pub fn is_transition(self) -> bool {
        matches!(self, GamePhase::TransitionAtkDef | GamePhase::TransitionDefAtk)
    }

    pub fn is_organized(self) -> bool {
        matches!(self, GamePhase::OrganizedAttack | GamePhase::OrganizedDefense)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FramePhase {
    pub frame_id: i64,
    pub phase: GamePhase,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub frame_id: i64,
    pub from_phase: GamePhase,
    pub to_phase: GamePhase,
    pub timestamp: f64,
}

/// A match's (team-relative) phase timeline, kept sorted by frame id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSequence {
    pub match_id: String,
    pub team_id: String,
    pub fps: f64,
    pub frame_phases: Vec<FramePhase>,
}

impl PhaseSequence {
    pub fn new(match_id: impl Into<String>, team_id: impl Into<String>, fps: f64) -> Self {
        Self {
            match_id: match_id.into(),
            team_id: team_id.into(),
            fps,
            frame_phases: Vec::new(),
        }
    }

    /// Appends a classification and re-sorts by `frame_id`, honoring
    /// the out-of-order-insert invariant from the data model.
    pub fn add_frame_phase(&mut self, frame_id: i64, phase: GamePhase, confidence: f64) {
        self.frame_phases.push(FramePhase { frame_id, phase, confidence });
        self.frame_phases.sort_by_key(|fp| fp.frame_id);
    }

    pub fn phase_at_frame(&self, frame_id: i64) -> GamePhase {
        self.frame_phases
            .iter()
            .find(|fp| fp.frame_id == frame_id)
            .map(|fp| fp.phase)
            .unwrap_or(GamePhase::Unknown)
    }

    pub fn phases_in_range(&self, start_frame: i64, end_frame: i64) -> Vec<FramePhase> {
        self.frame_phases
            .iter()
            .copied()
            .filter(|fp| fp.frame_id >= start_frame && fp.frame_id <= end_frame)
            .collect()
    }

    pub fn transitions(&self) -> Vec<PhaseTransition> {
        if self.frame_phases.len() < 2 {
            return Vec::new();
        }
        let mut transitions = Vec::new();
        let mut prev_phase = self.frame_phases[0].phase;
        for fp in &self.frame_phases[1..] {
            if fp.phase != prev_phase && fp.phase != GamePhase::Unknown {
                transitions.push(PhaseTransition {
                    frame_id: fp.frame_id,
                    from_phase: prev_phase,
                    to_phase: fp.phase,
                    timestamp: fp.frame_id as f64 / self.fps,
                });
                prev_phase = fp.phase;
            }
        }
        transitions
    }

    /// Total seconds spent in each phase: successive frame-id deltas
    /// divided by fps, plus `1/fps` for the final frame.
    pub fn durations(&self) -> HashMap<GamePhase, f64> {
        let mut durations: HashMap<GamePhase, f64> =
            ALL_GAME_PHASES.iter().map(|p| (*p, 0.0)).collect();

        if self.frame_phases.is_empty() {
            return durations;
        }

        for pair in self.frame_phases.windows(2) {
            let delta = (pair[1].frame_id - pair[0].frame_id) as f64 / self.fps;
            *durations.get_mut(&pair[0].phase).unwrap() += delta;
        }
        let last = self.frame_phases.last().unwrap();
        *durations.get_mut(&last.phase).unwrap() += 1.0 / self.fps;

        durations
    }

    pub fn percentages(&self) -> HashMap<GamePhase, f64> {
        let durations = self.durations();
        let total: f64 = durations.values().sum();
        if total == 0.0 {
            return ALL_GAME_PHASES.iter().map(|p| (*p, 0.0)).collect();
        }
        durations.into_iter().map(|(k, v)| (k, v / total * 100.0)).collect()
    }

    pub fn dominant_phase(&self) -> GamePhase {
        let durations = self.durations();
        let best = durations
            .iter()
            .filter(|(phase, _)| **phase != GamePhase::Unknown)
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap());
        match best {
            Some((phase, duration)) if *duration > 0.0 => *phase,
            _ => GamePhase::Unknown,
        }
    }

    pub fn transition_count(&self) -> usize {
        self.transitions().len()
    }

    pub fn len(&self) -> usize {
        self.frame_phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_phases.is_empty()
    }

    /// Validates the strictly-increasing-frame-id invariant explicitly,
    /// for callers that bypass `add_frame_phase` (e.g. bulk load).
    pub fn validate_ordering(&self) -> Result<()> {
        for pair in self.frame_phases.windows(2) {
            if pair[0].frame_id >= pair[1].frame_id {
                return Err(PitchSenseError::internal(
                    format!("non-monotonic frame ids {} >= {}", pair[0].frame_id, pair[1].frame_id),
                    "phase-sequence-validate",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_percentages_sum_to_100() {
        let mut seq = PhaseSequence::new("m1", "home", 25.0);
        for f in 0..100 {
            seq.add_frame_phase(f, GamePhase::OrganizedAttack, 1.0);
        }
        for f in 100..150 {
            seq.add_frame_phase(f, GamePhase::TransitionAtkDef, 1.0);
        }
        for f in 150..250 {
            seq.add_frame_phase(f, GamePhase::OrganizedDefense, 1.0);
        }
        let pct = seq.percentages();
        let total: f64 = pct.values().sum();
        assert!((total - 100.0).abs() < 1e-3);
        assert!((pct[&GamePhase::OrganizedAttack] - 40.0).abs() < 1.0);
        assert!((pct[&GamePhase::TransitionAtkDef] - 20.0).abs() < 1.0);
        assert!((pct[&GamePhase::OrganizedDefense] - 40.0).abs() < 1.0);
    }

    #[test]
    fn transitions_ignore_unknown() {
        let mut seq = PhaseSequence::new("m1", "home", 25.0);
        seq.add_frame_phase(0, GamePhase::OrganizedAttack, 1.0);
        seq.add_frame_phase(1, GamePhase::Unknown, 0.0);
        seq.add_frame_phase(2, GamePhase::OrganizedDefense, 1.0);
        let transitions = seq.transitions();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].to_phase, GamePhase::OrganizedDefense);
    }

    #[test]
    fn out_of_order_insert_triggers_resort() {
        let mut seq = PhaseSequence::new("m1", "home", 25.0);
        seq.add_frame_phase(5, GamePhase::OrganizedAttack, 1.0);
        seq.add_frame_phase(1, GamePhase::OrganizedDefense, 1.0);
        let ids: Vec<i64> = seq.frame_phases.iter().map(|fp| fp.frame_id).collect();
        assert_eq!(ids, vec![1, 5]);
    }
}
