//! External event-feed parsing: source-schema rows in, canonical
//! `Match`/`Event` out.
//!
//! Grounded on `original_source/.../infrastructure/adapters/{statsbomb,
//! metrica}_adapter.py`. Both adapters there implement the same
//! `MatchRepository` port and differ only in field mapping and
//! coordinate normalization; here that's a single `FeedParser` trait
//! with two implementations sharing `Coordinates::from_source_a/b`.

use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::event::{Event, EventKind, Match};
use crate::geometry::Coordinates;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedParseError {
    #[error("unrecognized event type: {0}")]
    UnknownEventType(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("empty feed")]
    Empty,
}

/// A single denormalized row as received from an external feed, before
/// it is mapped onto a canonical `EventKind`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEventRow {
    pub event_id: String,
    pub event_type: String,
    pub timestamp: f64,
    pub x: f64,
    pub y: f64,
    pub player_id: Option<String>,
    pub team_id: Option<String>,
    pub end_x: Option<f64>,
    pub end_y: Option<f64>,
}

/// Converts one external feed's rows into a canonical `Match`.
/// Implementations own the event-type vocabulary mapping and the
/// coordinate normalization for their source.
pub trait FeedParser {
    fn parse(&self, match_id: &str, rows: &[FeedEventRow]) -> Result<Match, FeedParseError>;
}

/// Source "A": 120x80 pixel-style pitch, StatsBomb-shaped event vocabulary.
pub struct SourceAFeedParser {
    type_map: HashMap<&'static str, EventKind>,
}

impl Default for SourceAFeedParser {
    fn default() -> Self {
        let mut type_map = HashMap::new();
        type_map.insert("Pass", EventKind::Pass);
        type_map.insert("Shot", EventKind::Shot);
        type_map.insert("Carry", EventKind::Carry);
        type_map.insert("Dribble", EventKind::Dribble);
        type_map.insert("Tackle", EventKind::Tackle);
        type_map.insert("Interception", EventKind::Interception);
        type_map.insert("Clearance", EventKind::Clearance);
        type_map.insert("Foul Committed", EventKind::Foul);
        type_map.insert("Goal", EventKind::Goal);
        type_map.insert("Pressure", EventKind::Pressure);
        Self { type_map }
    }
}

impl FeedParser for SourceAFeedParser {
    fn parse(&self, match_id: &str, rows: &[FeedEventRow]) -> Result<Match, FeedParseError> {
        if rows.is_empty() {
            return Err(FeedParseError::Empty);
        }
        let home_team_id = rows[0].team_id.clone().ok_or(FeedParseError::MissingField("team_id"))?;
        let away_team_id = rows
            .iter()
            .map(|r| r.team_id.clone())
            .find(|t| t.as_deref() != Some(home_team_id.as_str()))
            .flatten()
            .unwrap_or_else(|| home_team_id.clone());

        let mut m = Match::new(match_id, &home_team_id, &away_team_id);
        for row in rows {
            let Some(&kind) = self.type_map.get(row.event_type.as_str()) else {
                continue;
            };
            let coords = Coordinates::from_source_a(row.x, row.y);
            let mut event = Event::new(
                &row.event_id,
                kind,
                row.timestamp,
                coords,
                row.player_id.as_deref().unwrap_or("unknown"),
            );
            if let (Some(ex), Some(ey)) = (row.end_x, row.end_y) {
                event = event.with_end_coordinates(Coordinates::from_source_a(ex, ey));
            }
            if let Some(team) = &row.team_id {
                event = event.with_team(team);
            }
            m.add_event(event);
        }
        Ok(m)
    }
}

/// Source "B": normalized 0..1 pitch, Metrica-shaped tracking-only feed.
/// Event data is not part of this source; `parse` always yields a
/// `Match` with no events, matching the original's placeholder behavior.
#[derive(Debug, Clone, Default)]
pub struct SourceBFeedParser;

impl FeedParser for SourceBFeedParser {
    fn parse(&self, match_id: &str, rows: &[FeedEventRow]) -> Result<Match, FeedParseError> {
        let home_team_id = rows
            .first()
            .and_then(|r| r.team_id.clone())
            .unwrap_or_else(|| "home".to_string());
        Ok(Match::new(match_id, &home_team_id, "away"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event_type: &str, team: &str, x: f64) -> FeedEventRow {
        FeedEventRow {
            event_id: "e1".into(),
            event_type: event_type.into(),
            timestamp: 0.0,
            x,
            y: 40.0,
            player_id: Some("p1".into()),
            team_id: Some(team.into()),
            end_x: None,
            end_y: None,
        }
    }

    #[test]
    fn unknown_event_types_are_skipped_not_rejected() {
        let parser = SourceAFeedParser::default();
        let rows = vec![row("Pass", "home", 60.0), row("VAR Review", "home", 60.0)];
        let m = parser.parse("m1", &rows).unwrap();
        assert_eq!(m.events.len(), 1);
    }

    #[test]
    fn empty_feed_is_rejected() {
        let parser = SourceAFeedParser::default();
        assert_eq!(parser.parse("m1", &[]).unwrap_err(), FeedParseError::Empty);
    }

    #[test]
    fn coordinates_are_normalized_to_canonical_pitch() {
        let parser = SourceAFeedParser::default();
        let rows = vec![row("Shot", "home", 120.0)];
        let m = parser.parse("m1", &rows).unwrap();
        assert!((m.events[0].coordinates.x - 105.0).abs() < 1e-9);
    }
}
