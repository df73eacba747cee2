//! Heuristic event inferencer: a per-frame carrier state machine that
//! turns stabilized tracking points into possession/pass/pressure
//! events without any ML model.
//!
//! No direct original_source equivalent — the Python backend infers
//! this from `event_detector.py`'s name enrichment step, whose
//! capability is carried through here as the optional `NameResolver`.

use serde::{Deserialize, Serialize};

use crate::adapters::name_resolver::NameResolver;
use crate::domain::trajectory::{ObjectKind, TeamSide, TrajectoryPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredEventKind {
    Possession,
    PassAttempt,
    PassComplete,
    Pressure,
    LossOfPossession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferredEvent {
    pub frame_start: i64,
    pub frame_end: i64,
    pub kind: InferredEventKind,
    pub actor_track_id: i64,
    pub other_track_id: Option<i64>,
    pub team: Option<TeamSide>,
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
    pub actor_name: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct InferencerConfig {
    pub ball_proximity_threshold_m: f64,
    pub pass_min_distance_m: f64,
    pub pressure_distance_m: f64,
}

impl Default for InferencerConfig {
    fn default() -> Self {
        Self {
            ball_proximity_threshold_m: 1.5,
            pass_min_distance_m: 3.0,
            pressure_distance_m: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Carrier {
    track_id: i64,
    team: Option<TeamSide>,
    start_x: f64,
    start_y: f64,
}

/// Sweeps frames in ascending order, maintaining ball-carrier state
/// and emitting events in non-decreasing `frame_end` order.
pub fn infer_events(
    points: &[TrajectoryPoint],
    config: &InferencerConfig,
    names: Option<&dyn NameResolver>,
) -> Vec<InferredEvent> {
    let mut by_frame: std::collections::BTreeMap<i64, Vec<&TrajectoryPoint>> = std::collections::BTreeMap::new();
    for p in points {
        by_frame.entry(p.frame_id).or_default().push(p);
    }

    let mut events = Vec::new();
    let mut carrier: Option<Carrier> = None;

    for (frame_id, mut frame_points) in by_frame {
        frame_points.sort_by_key(|p| p.track_id);

        let Some(ball) = frame_points.iter().find(|p| p.object_kind == ObjectKind::Ball) else {
            continue;
        };

        let closest = frame_points
            .iter()
            .filter(|p| p.object_kind != ObjectKind::Ball)
            .map(|p| (*p, distance(p.x, p.y, ball.x, ball.y)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

        let Some((closest_player, dist)) = closest else {
            continue;
        };

        match carrier {
            None => {
                if dist <= config.ball_proximity_threshold_m {
                    carrier = Some(Carrier {
                        track_id: closest_player.track_id,
                        team: closest_player.team,
                        start_x: closest_player.x,
                        start_y: closest_player.y,
                    });
                    events.push(InferredEvent {
                        frame_start: frame_id,
                        frame_end: frame_id,
                        kind: InferredEventKind::Possession,
                        actor_track_id: closest_player.track_id,
                        other_track_id: None,
                        team: closest_player.team,
                        x: closest_player.x,
                        y: closest_player.y,
                        confidence: 1.0,
                        actor_name: resolve(names, closest_player.track_id),
                    });
                }
            }
            Some(c) if c.track_id == closest_player.track_id => {
                // still carrying: no event
            }
            Some(c) if dist <= config.ball_proximity_threshold_m => {
                let same_team = c.team.is_some() && c.team == closest_player.team;
                if same_team {
                    let displacement = distance(c.start_x, c.start_y, closest_player.x, closest_player.y);
                    if displacement >= config.pass_min_distance_m {
                        events.push(InferredEvent {
                            frame_start: frame_id,
                            frame_end: frame_id,
                            kind: InferredEventKind::PassComplete,
                            actor_track_id: c.track_id,
                            other_track_id: Some(closest_player.track_id),
                            team: c.team,
                            x: closest_player.x,
                            y: closest_player.y,
                            confidence: 1.0,
                            actor_name: resolve(names, c.track_id),
                        });
                    }
                } else {
                    events.push(InferredEvent {
                        frame_start: frame_id,
                        frame_end: frame_id,
                        kind: InferredEventKind::LossOfPossession,
                        actor_track_id: c.track_id,
                        other_track_id: Some(closest_player.track_id),
                        team: c.team,
                        x: closest_player.x,
                        y: closest_player.y,
                        confidence: 1.0,
                        actor_name: resolve(names, c.track_id),
                    });
                }
                carrier = Some(Carrier {
                    track_id: closest_player.track_id,
                    team: closest_player.team,
                    start_x: closest_player.x,
                    start_y: closest_player.y,
                });
            }
            Some(_) => {}
        }

        if let Some(c) = carrier {
            let mut pressuring: Vec<&&TrajectoryPoint> = frame_points
                .iter()
                .filter(|p| {
                    p.track_id != c.track_id
                        && p.object_kind != ObjectKind::Ball
                        && p.team.is_some()
                        && p.team != c.team
                        && distance(p.x, p.y, closest_player.x, closest_player.y) <= config.pressure_distance_m
                })
                .collect();
            pressuring.sort_by_key(|p| p.track_id);

            for presser in pressuring {
                events.push(InferredEvent {
                    frame_start: frame_id,
                    frame_end: frame_id,
                    kind: InferredEventKind::Pressure,
                    actor_track_id: presser.track_id,
                    other_track_id: Some(c.track_id),
                    team: presser.team,
                    x: presser.x,
                    y: presser.y,
                    confidence: 0.8,
                    actor_name: resolve(names, presser.track_id),
                });
            }
        }
    }

    events
}

fn distance(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
}

fn resolve(names: Option<&dyn NameResolver>, track_id: i64) -> Option<String> {
    names.and_then(|r| r.resolve_player_name(&track_id.to_string()))
}
