//! Tactical events engine: PPDA, pressing-by-zone and xT chain
//! valuation over a `TacticalMatch`.
//!
//! Grounded on `original_source/.../entities/tactical_match.py`. A
//! zero-denominator PPDA is a distinct `Infinite` variant rather than a
//! bare `f64::INFINITY`, so it serializes as the literal JSON string
//! `"inf"` instead of `null`.

use serde::de::{self, Deserializer, Visitor};
use serde::{Serialize, Serializer};
use std::fmt;

use crate::domain::event::EventKind;
use crate::domain::tactical_match::{PpdaResult, PressureMetrics, TacticalMatch, XtChainResult, XtEvent};
use crate::xt_grid::ExpectedThreatGrid;

/// Passes-per-defensive-action, explicit about the zero-denominator case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ppda {
    Finite(f64),
    Infinite,
}

impl Serialize for Ppda {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Ppda::Finite(v) => serializer.serialize_f64(*v),
            Ppda::Infinite => serializer.serialize_str("inf"),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Ppda {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PpdaVisitor;
        impl<'de> Visitor<'de> for PpdaVisitor {
            type Value = Ppda;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a finite number or the string \"inf\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Ppda, E> {
                Ok(Ppda::Finite(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Ppda, E> {
                Ok(Ppda::Finite(v as f64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Ppda, E> {
                Ok(Ppda::Finite(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Ppda, E> {
                if v == "inf" {
                    Ok(Ppda::Infinite)
                } else {
                    Err(de::Error::custom(format!("unexpected Ppda string {v:?}")))
                }
            }
        }
        deserializer.deserialize_any(PpdaVisitor)
    }
}

fn is_attacking_two_thirds(x: f64, team_is_home: bool, third_length: f64) -> bool {
    if team_is_home {
        x > third_length
    } else {
        x < 2.0 * third_length
    }
}

/// Maps an x-coordinate to one of the three pitch thirds, relative to
/// the given team's attacking direction (home attacks +x).
fn zone_relative_to_team(x: f64, team_is_home: bool, third_length: f64) -> PressingZone {
    let (defensive_end, attacking_start) = if team_is_home {
        (third_length, 2.0 * third_length)
    } else {
        (2.0 * third_length, third_length)
    };
    if team_is_home {
        if x < defensive_end {
            PressingZone::Defensive
        } else if x < attacking_start {
            PressingZone::Middle
        } else {
            PressingZone::Attacking
        }
    } else if x > defensive_end {
        PressingZone::Defensive
    } else if x > attacking_start {
        PressingZone::Middle
    } else {
        PressingZone::Attacking
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PressingZone {
    Defensive,
    Middle,
    Attacking,
}

/// `PPDA(defender, attacker)`: attacker passes in their attacking
/// two-thirds over defender defensive actions in the same window.
pub fn calculate_ppda(tm: &TacticalMatch, defending_team_is_home: bool, attacking_team_id: &str, defending_team_id: &str) -> (PpdaResult, Ppda) {
    let third = tm.third_length();
    let attacker_is_home = !defending_team_is_home;

    let passes_allowed = tm
        .events
        .iter()
        .filter(|e| {
            e.team_id.as_deref() == Some(attacking_team_id)
                && e.event_type == EventKind::Pass
                && is_attacking_two_thirds(e.coordinates.x, attacker_is_home, third)
        })
        .count() as u32;

    let defensive_kinds = [
        EventKind::DefensiveAction,
        EventKind::Tackle,
        EventKind::Interception,
        EventKind::Pressure,
    ];
    let defensive_actions = tm
        .events
        .iter()
        .filter(|e| e.team_id.as_deref() == Some(defending_team_id) && defensive_kinds.contains(&e.event_type))
        .count() as u32;

    let ppda = if defensive_actions == 0 {
        Ppda::Infinite
    } else {
        Ppda::Finite(passes_allowed as f64 / defensive_actions as f64)
    };

    (PpdaResult { passes_allowed, defensive_actions }, ppda)
}

/// Pressing intensity for `team_id`, bucketed by the team's own
/// defensive/middle/attacking thirds.
pub fn calculate_pressing_metrics(tm: &TacticalMatch, team_id: &str, team_is_home: bool) -> PressureMetrics {
    let third = tm.third_length();
    let pressure_kinds = [EventKind::Pressure, EventKind::DefensiveAction, EventKind::Tackle];

    let mut metrics = PressureMetrics::default();
    for e in &tm.events {
        if e.team_id.as_deref() != Some(team_id) || !pressure_kinds.contains(&e.event_type) {
            continue;
        }
        match zone_relative_to_team(e.coordinates.x, team_is_home, third) {
            PressingZone::Defensive => metrics.defensive_third_presses += 1,
            PressingZone::Middle => metrics.middle_third_presses += 1,
            PressingZone::Attacking => metrics.attacking_third_presses += 1,
        }
    }
    metrics
}

/// Expected-threat chain valuation for one team's progressive actions.
pub fn calculate_xt_chain(tm: &TacticalMatch, team_id: &str, xt_grid: &ExpectedThreatGrid) -> XtChainResult {
    let mut events = Vec::new();
    let mut total_xt = 0.0;

    for e in &tm.events {
        if e.team_id.as_deref() != Some(team_id) || !e.event_type.is_progressive() {
            continue;
        }
        let start_xt = xt_grid.threat_at_location(e.coordinates.x, e.coordinates.y);
        let end = e.end_coordinates.unwrap_or(e.coordinates);
        let end_xt = xt_grid.threat_at_location(end.x, end.y);
        let xt_change = end_xt - start_xt;

        events.push(XtEvent {
            event_id: e.event_id.clone(),
            event_type: e.event_type,
            player_id: e.player_id.clone(),
            start_xt,
            end_xt,
            xt_change,
        });
        total_xt += xt_change;
    }

    let average_xt_per_action = if events.is_empty() { 0.0 } else { total_xt / events.len() as f64 };
    XtChainResult { events, total_xt, average_xt_per_action }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::Event;
    use crate::geometry::Coordinates;
    use crate::xt_grid::XT_GRID;

    fn event(kind: EventKind, x: f64, team: &str) -> Event {
        Event::new("e", kind, 0.0, Coordinates::new(x, 34.0), "p1").with_team(team)
    }

    #[test]
    fn ppda_matches_scenario_3() {
        let events = vec![
            event(EventKind::Pass, 60.0, "home"),
            event(EventKind::Pass, 65.0, "home"),
            event(EventKind::Pass, 70.0, "home"),
            event(EventKind::Tackle, 72.0, "away"),
        ];
        let tm = TacticalMatch::new("m1", events, "home", "away");
        let (result, ppda) = calculate_ppda(&tm, false, "home", "away");
        assert_eq!(result.passes_allowed, 3);
        assert_eq!(result.defensive_actions, 1);
        assert_eq!(ppda, Ppda::Finite(3.0));
    }

    #[test]
    fn ppda_is_infinite_with_zero_defensive_actions() {
        let events = vec![event(EventKind::Pass, 80.0, "home")];
        let tm = TacticalMatch::new("m1", events, "home", "away");
        let (_, ppda) = calculate_ppda(&tm, false, "home", "away");
        assert_eq!(ppda, Ppda::Infinite);
        assert_eq!(serde_json::to_string(&ppda).unwrap(), "\"inf\"");
    }

    #[test]
    fn ppda_finite_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Ppda::Finite(2.5)).unwrap(), "2.5");
    }

    #[test]
    fn xt_chain_forward_pass_gains_threat() {
        let mut pass = event(EventKind::Pass, 30.0, "home");
        pass.end_coordinates = Some(Coordinates::new(90.0, 34.0));
        let tm = TacticalMatch::new("m1", vec![pass], "home", "away");
        let chain = calculate_xt_chain(&tm, "home", &XT_GRID);
        assert_eq!(chain.events.len(), 1);
        assert!(chain.total_xt > 0.0);
    }
}
