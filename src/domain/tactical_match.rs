//! `TacticalMatch`: a value view over a match's events used by the
//! tactical-events engine (§4.4). Grounded on
//! `original_source/.../tactical_match.py`, minus its lazy
//! `_xt_grid` property — callers pass the shared `xt_grid::XT_GRID`
//! explicitly instead of the entity reaching for a module-level import.

use serde::{Deserialize, Serialize};

use crate::domain::event::{Event, EventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Home,
    Away,
}

/// Read-only projection of a `Match` for tactical-metric computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TacticalMatch {
    pub match_id: String,
    pub events: Vec<Event>,
    pub home_team_id: String,
    pub away_team_id: String,
    pub pitch_length: f64,
}

impl TacticalMatch {
    pub fn new(
        match_id: impl Into<String>,
        events: Vec<Event>,
        home_team_id: impl Into<String>,
        away_team_id: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            events,
            home_team_id: home_team_id.into(),
            away_team_id: away_team_id.into(),
            pitch_length: crate::geometry::PITCH_LENGTH_M,
        }
    }

    pub fn third_length(&self) -> f64 {
        self.pitch_length / 3.0
    }

    pub fn events_by_team<'a>(&'a self, team_id: &'a str) -> impl Iterator<Item = &'a Event> {
        self.events.iter().filter(move |e| e.team_id.as_deref() == Some(team_id))
    }
}

/// Passes-per-defensive-action. `None` denominator serializes as the
/// literal `"inf"` downstream via `crate::engines::tactical_events::Ppda`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PpdaResult {
    pub passes_allowed: u32,
    pub defensive_actions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PressureMetrics {
    pub defensive_third_presses: u32,
    pub middle_third_presses: u32,
    pub attacking_third_presses: u32,
}

impl PressureMetrics {
    pub fn total(&self) -> u32 {
        self.defensive_third_presses + self.middle_third_presses + self.attacking_third_presses
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XtEvent {
    pub event_id: String,
    pub event_type: EventKind,
    pub player_id: String,
    pub start_xt: f64,
    pub end_xt: f64,
    pub xt_change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XtChainResult {
    pub events: Vec<XtEvent>,
    pub total_xt: f64,
    pub average_xt_per_action: f64,
}
