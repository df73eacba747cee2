//! Physical metrics engine: per-player distance, speed and sprint
//! segmentation.
//!
//! Grounded on `original_source/.../entities/player_trajectory.py`'s
//! `calculate_physical_metrics`/`detect_sprints`/`_get_velocities`, but
//! split out of the entity per the explicit-memoization redesign: this
//! engine computes the values, the caller writes them back onto the
//! `PlayerTrajectory` via `set_velocities`/`set_metrics`.

use crate::domain::trajectory::{PhysicalMetrics, PlayerTrajectory, Sprint};
use crate::engines::stabilizer::smooth_signal;

const DEFAULT_SMOOTHING_WINDOW: usize = 11;
const DEFAULT_SMOOTHING_POLYORDER: usize = 3;

/// Computes smoothed per-frame speed (m/s). Length equals
/// `trajectory.frames.len()`; the last raw velocity is repeated once
/// to restore input size, mirroring `np.append(v, v[-1])` upstream.
pub fn compute_velocities_ms(trajectory: &PlayerTrajectory) -> Vec<f64> {
    let frames = &trajectory.frames;
    if frames.len() < 2 {
        return vec![0.0; frames.len()];
    }

    let mut raw = Vec::with_capacity(frames.len() - 1);
    for pair in frames.windows(2) {
        let dt = (pair[1].timestamp - pair[0].timestamp).max(1e-6);
        let dx = pair[1].x - pair[0].x;
        let dy = pair[1].y - pair[0].y;
        raw.push((dx * dx + dy * dy).sqrt() / dt);
    }

    let mut smoothed = smooth_signal(&raw, DEFAULT_SMOOTHING_WINDOW, DEFAULT_SMOOTHING_POLYORDER);
    smoothed.push(*smoothed.last().unwrap());
    smoothed
}

/// Computes total/max/avg speed and sprint count from a velocity
/// series already written onto the trajectory.
pub fn compute_metrics(trajectory: &PlayerTrajectory) -> PhysicalMetrics {
    let Some(velocities) = trajectory.velocities_ms() else {
        return PhysicalMetrics::default();
    };
    if velocities.is_empty() {
        return PhysicalMetrics::default();
    }

    let total_distance_km = velocities.iter().sum::<f64>() / trajectory.fps / 1000.0;
    let max_speed_kmh = velocities.iter().cloned().fold(f64::MIN, f64::max) * 3.6;
    let avg_speed_kmh = velocities.iter().sum::<f64>() / velocities.len() as f64 * 3.6;
    let sprint_count = detect_sprints(trajectory).len();

    PhysicalMetrics {
        total_distance_km: round2(total_distance_km),
        max_speed_kmh: round1(max_speed_kmh),
        sprint_count,
        avg_speed_kmh: round1(avg_speed_kmh),
    }
}

/// Maximal contiguous runs of frames whose smoothed speed exceeds
/// `sprint_threshold_kmh`. A sprint active at the last frame still
/// counts, per the boundary-behavior requirement.
pub fn detect_sprints(trajectory: &PlayerTrajectory) -> Vec<Sprint> {
    let Some(velocities) = trajectory.velocities_ms() else {
        return Vec::new();
    };
    let threshold_ms = trajectory.sprint_threshold_kmh / 3.6;

    let mut sprints = Vec::new();
    let mut in_sprint = false;
    let mut start_idx = 0usize;
    let mut max_speed_kmh = 0.0f64;
    let mut distance_m = 0.0f64;

    for (i, &v) in velocities.iter().enumerate() {
        let sprinting = v > threshold_ms;
        if sprinting && !in_sprint {
            in_sprint = true;
            start_idx = i;
            max_speed_kmh = v * 3.6;
            distance_m = 0.0;
        } else if sprinting && in_sprint {
            max_speed_kmh = max_speed_kmh.max(v * 3.6);
            distance_m += v / trajectory.fps;
        } else if !sprinting && in_sprint {
            in_sprint = false;
            sprints.push(Sprint {
                start_frame: trajectory.frames[start_idx].frame_id,
                end_frame: trajectory.frames[i - 1].frame_id,
                max_speed_kmh,
                distance_m,
            });
        }
    }

    if in_sprint {
        sprints.push(Sprint {
            start_frame: trajectory.frames[start_idx].frame_id,
            end_frame: trajectory.frames.last().unwrap().frame_id,
            max_speed_kmh,
            distance_m,
        });
    }

    sprints
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
