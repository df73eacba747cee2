//! `Event` and the `Match` aggregate root.
//!
//! Grounded on `original_source/.../entities/{event,match}.py`. The
//! domain layer here carries no I/O dependency of its own.

use serde::{Deserialize, Serialize};

use crate::geometry::Coordinates;

/// Closed set of event types recognized across all ingestion sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Pass,
    Shot,
    Carry,
    Dribble,
    Tackle,
    Interception,
    Clearance,
    Foul,
    Goal,
    Pressure,
    DefensiveAction,
    BallLost,
    BallOut,
    HalfEnd,
    FoulWon,
    Dispossessed,
    BallRecovery,
}

impl EventKind {
    pub fn is_defensive(self) -> bool {
        matches!(
            self,
            EventKind::Tackle
                | EventKind::Interception
                | EventKind::Pressure
                | EventKind::DefensiveAction
        )
    }

    pub fn is_progressive(self) -> bool {
        matches!(
            self,
            EventKind::Pass | EventKind::Carry | EventKind::Dribble | EventKind::Shot
        )
    }

    /// Event kinds that always close a possession sequence outright.
    pub fn is_sequence_terminal(self) -> bool {
        matches!(
            self,
            EventKind::BallLost
                | EventKind::BallOut
                | EventKind::Goal
                | EventKind::HalfEnd
                | EventKind::FoulWon
                | EventKind::Clearance
                | EventKind::Interception
        )
    }

    /// Event kinds that represent a change of possession mid-sequence.
    pub fn is_turnover(self) -> bool {
        matches!(
            self,
            EventKind::Interception | EventKind::Tackle | EventKind::Dispossessed | EventKind::BallRecovery
        )
    }
}

/// A single match event. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_id: String,
    pub event_type: EventKind,
    pub timestamp: f64,
    pub coordinates: Coordinates,
    pub player_id: String,
    pub end_coordinates: Option<Coordinates>,
    pub team_id: Option<String>,
}

impl Event {
    pub fn new(
        event_id: impl Into<String>,
        event_type: EventKind,
        timestamp: f64,
        coordinates: Coordinates,
        player_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type,
            timestamp,
            coordinates,
            player_id: player_id.into(),
            end_coordinates: None,
            team_id: None,
        }
    }

    pub fn with_end_coordinates(mut self, end: Coordinates) -> Self {
        self.end_coordinates = Some(end);
        self
    }

    pub fn with_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }
}

/// Aggregate root for a football match: metadata plus its event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub match_id: String,
    pub home_team_id: String,
    pub away_team_id: String,
    pub competition: Option<String>,
    pub season: Option<String>,
    pub match_date: Option<String>,
    pub events: Vec<Event>,
}

impl Match {
    pub fn new(
        match_id: impl Into<String>,
        home_team_id: impl Into<String>,
        away_team_id: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            home_team_id: home_team_id.into(),
            away_team_id: away_team_id.into(),
            competition: None,
            season: None,
            match_date: None,
            events: Vec::new(),
        }
    }

    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn events_by_type(&self, event_type: EventKind) -> Vec<&Event> {
        self.events.iter().filter(|e| e.event_type == event_type).collect()
    }

    pub fn events_by_player(&self, player_id: &str) -> Vec<&Event> {
        self.events.iter().filter(|e| e.player_id == player_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coordinates {
        Coordinates::new(x, y)
    }

    #[test]
    fn match_filters_events_by_type_and_player() {
        let mut m = Match::new("m1", "home", "away");
        m.add_event(Event::new("e1", EventKind::Pass, 1.0, c(10.0, 10.0), "p1"));
        m.add_event(Event::new("e2", EventKind::Shot, 2.0, c(90.0, 34.0), "p2"));
        m.add_event(Event::new("e3", EventKind::Pass, 3.0, c(20.0, 20.0), "p1"));

        assert_eq!(m.events_by_type(EventKind::Pass).len(), 2);
        assert_eq!(m.events_by_player("p1").len(), 2);
        assert_eq!(m.events_by_player("p2").len(), 1);
    }

    #[test]
    fn event_kind_classification() {
        assert!(EventKind::Tackle.is_defensive());
        assert!(!EventKind::Pass.is_defensive());
        assert!(EventKind::Carry.is_progressive());
        assert!(!EventKind::Foul.is_progressive());
    }
}
