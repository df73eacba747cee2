//! Pitch-control engine: Spearman 2018 (simplified) spatial control
//! model over a `MatchFrame`.
//!
//! Grounded on `original_source/.../domain/services/pitch_control.py`.
//! Grid construction, reaction-time/max-speed defaults and the
//! pointwise-max/normalize steps are carried over exactly; the numpy
//! vectorized grid becomes a flat `Vec<f64>` populated via `rayon`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::trajectory::MatchFrame;

#[derive(Debug, Clone, Copy)]
pub struct PitchControlConfig {
    pub grid_width: usize,
    pub grid_height: usize,
    pub reaction_time_s: f64,
    pub max_speed_ms: f64,
}

impl Default for PitchControlConfig {
    fn default() -> Self {
        Self {
            grid_width: 32,
            grid_height: 24,
            reaction_time_s: 0.7,
            max_speed_ms: 5.0,
        }
    }
}

/// Row-major `[grid_height][grid_width]` control grids, each cell in
/// `[0, 1]` and `home[cell] + away[cell] ≈ 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchControlGrid {
    pub home_control: Vec<f64>,
    pub away_control: Vec<f64>,
    pub grid_width: usize,
    pub grid_height: usize,
}

impl PitchControlGrid {
    pub fn home_dominance(&self) -> f64 {
        mean(&self.home_control)
    }

    pub fn away_dominance(&self) -> f64 {
        mean(&self.away_control)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Computes the pitch-control grid for a single frame. Missing team ⇒
/// that team's grid is all zero, per the documented edge case.
pub fn calculate_pitch_control(frame: &MatchFrame, config: &PitchControlConfig) -> PitchControlGrid {
    let xs = linspace(0.0, frame.pitch_length, config.grid_width);
    let ys = linspace(0.0, frame.pitch_width, config.grid_height);

    let home: Vec<(f64, f64, f64, f64)> = frame
        .home_players()
        .map(|p| (p.x, p.y, config.reaction_time_s, config.max_speed_ms))
        .collect();
    let away: Vec<(f64, f64, f64, f64)> = frame
        .away_players()
        .map(|p| (p.x, p.y, config.reaction_time_s, config.max_speed_ms))
        .collect();

    let home_control = team_control(&home, &xs, &ys);
    let away_control = team_control(&away, &xs, &ys);

    let mut home_norm = vec![0.0; home_control.len()];
    let mut away_norm = vec![0.0; away_control.len()];
    for i in 0..home_control.len() {
        let total = home_control[i] + away_control[i] + 1e-10;
        home_norm[i] = home_control[i] / total;
        away_norm[i] = away_control[i] / total;
    }

    PitchControlGrid {
        home_control: home_norm,
        away_control: away_norm,
        grid_width: config.grid_width,
        grid_height: config.grid_height,
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![start];
    }
    let step = (stop - start) / (n - 1) as f64;
    (0..n).map(|i| start + step * i as f64).collect()
}

fn team_control(players: &[(f64, f64, f64, f64)], xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let w = xs.len();
    let h = ys.len();

    (0..h * w)
        .into_par_iter()
        .map(|cell| {
            let row = cell / w;
            let col = cell % w;
            let (cx, cy) = (xs[col], ys[row]);
            players
                .iter()
                .map(|&(px, py, reaction_time, max_speed)| {
                    let dx = cx - px;
                    let dy = cy - py;
                    let distance = (dx * dx + dy * dy).sqrt();
                    let time_to_reach = reaction_time + distance / max_speed;
                    (-time_to_reach / 2.0).exp()
                })
                .fold(0.0_f64, f64::max)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trajectory::{PlayerFrameEntry, TeamSide};

    fn frame_with(home: Vec<(f64, f64)>, away: Vec<(f64, f64)>) -> MatchFrame {
        let mut players = Vec::new();
        for (i, (x, y)) in home.into_iter().enumerate() {
            players.push(PlayerFrameEntry { player_id_hash: i as i64, team: TeamSide::Home, x, y, velocity: None });
        }
        for (i, (x, y)) in away.into_iter().enumerate() {
            players.push(PlayerFrameEntry { player_id_hash: 100 + i as i64, team: TeamSide::Away, x, y, velocity: None });
        }
        MatchFrame {
            frame_id: 0,
            players,
            ball: (52.5, 34.0),
            pitch_length: 105.0,
            pitch_width: 68.0,
            grid_width: 32,
            grid_height: 24,
        }
    }

    #[test]
    fn cells_normalize_to_unity() {
        let frame = frame_with(vec![(20.0, 34.0), (40.0, 20.0)], vec![(80.0, 34.0), (60.0, 50.0)]);
        let grid = calculate_pitch_control(&frame, &PitchControlConfig::default());
        for i in 0..grid.home_control.len() {
            let total = grid.home_control[i] + grid.away_control[i];
            assert!((total - 1.0).abs() < 1e-6, "cell {i} did not normalize to 1: {total}");
        }
    }

    #[test]
    fn missing_team_yields_zero_grid() {
        let frame = frame_with(vec![(20.0, 34.0)], vec![]);
        let grid = calculate_pitch_control(&frame, &PitchControlConfig::default());
        assert!(grid.away_control.iter().all(|&v| v == 0.0));
        assert!(grid.home_control.iter().all(|&v| v > 0.99));
    }

    #[test]
    fn home_dominance_near_player_cluster_exceeds_away() {
        let frame = frame_with(vec![(10.0, 34.0), (15.0, 34.0), (12.0, 30.0)], vec![(95.0, 34.0)]);
        let grid = calculate_pitch_control(&frame, &PitchControlConfig::default());
        assert!(grid.home_control[0] > grid.away_control[0]);
    }
}
