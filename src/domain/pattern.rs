//! `TacticalPattern` and the `RunningStat` value type it's built from.
//!
//! Grounded on `original_source/.../entities/tactical_pattern.py`. The
//! three running averages (duration, event count, xT progression) are
//! each a `RunningStat` rather than three duplicated
//! `(avg*(n-1)+x)/n` expressions.

use serde::{Deserialize, Serialize};

/// An incrementally-updated mean, carrying its own sample count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct RunningStat {
    pub mean: f64,
    pub count: u64,
}

impl RunningStat {
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticalPattern {
    pub pattern_id: String,
    pub match_id: String,
    pub team_id: String,
    pub cluster_label: i32,

    pub label: String,
    pub description: Option<String>,

    pub occurrence_count: u64,
    pub success_count: u64,
    pub goal_count: u64,

    pub avg_duration_seconds: RunningStat,
    pub avg_event_count: RunningStat,
    pub avg_xt_progression: RunningStat,

    pub example_sequences: Vec<String>,
    pub centroid: Option<Vec<f64>>,
}

const MAX_EXAMPLE_SEQUENCES: usize = 5;

impl TacticalPattern {
    pub fn new(
        pattern_id: impl Into<String>,
        match_id: impl Into<String>,
        team_id: impl Into<String>,
        cluster_label: i32,
    ) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            match_id: match_id.into(),
            team_id: team_id.into(),
            cluster_label,
            label: "Unknown Pattern".to_string(),
            description: None,
            occurrence_count: 0,
            success_count: 0,
            goal_count: 0,
            avg_duration_seconds: RunningStat::default(),
            avg_event_count: RunningStat::default(),
            avg_xt_progression: RunningStat::default(),
            example_sequences: Vec::new(),
            centroid: None,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.occurrence_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.occurrence_count as f64
        }
    }

    pub fn goal_rate(&self) -> f64 {
        if self.occurrence_count == 0 {
            0.0
        } else {
            self.goal_count as f64 / self.occurrence_count as f64
        }
    }

    /// Folds one more possession sequence's outcome into this pattern's
    /// running statistics.
    pub fn add_sequence(
        &mut self,
        sequence_id: impl Into<String>,
        ended_in_shot: bool,
        ended_in_goal: bool,
        duration_seconds: f64,
        event_count: usize,
        xt_progression: f64,
    ) {
        self.occurrence_count += 1;
        if ended_in_shot || ended_in_goal {
            self.success_count += 1;
        }
        if ended_in_goal {
            self.goal_count += 1;
        }

        self.avg_duration_seconds.update(duration_seconds);
        self.avg_event_count.update(event_count as f64);
        self.avg_xt_progression.update(xt_progression);

        if self.example_sequences.len() < MAX_EXAMPLE_SEQUENCES {
            self.example_sequences.push(sequence_id.into());
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "pattern_id": self.pattern_id,
            "match_id": self.match_id,
            "team_id": self.team_id,
            "cluster_label": self.cluster_label,
            "label": self.label,
            "description": self.description,
            "occurrence_count": self.occurrence_count,
            "success_rate": round3(self.success_rate()),
            "goal_rate": round3(self.goal_rate()),
            "avg_duration_seconds": round2(self.avg_duration_seconds.mean),
            "avg_event_count": round1(self.avg_event_count.mean),
            "avg_xt_progression": round4(self.avg_xt_progression.mean),
            "example_sequences": self.example_sequences,
        })
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}
