//! Trajectory stabilizer: smooth → clean → flag/clip outlier speed.
//!
//! Grounded on `original_source/.../savgol_smoother.py` (smoothing) and
//! `domain/services/track_cleaner.py` (ghost-track removal and
//! fragment merge). The scipy-backed filter is replaced by an
//! equivalent least-squares polynomial fit per centered window —
//! numerically close, not bit-exact.

use std::collections::BTreeMap;

use crate::domain::trajectory::{ObjectKind, TrajectoryPoint};
use crate::error::{PitchSenseError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierPolicy {
    /// Flag frames exceeding `max_speed_kmh`; leave positions untouched.
    /// The default: flagging preserves the raw trajectory for downstream
    /// inspection instead of silently rewriting it.
    Flag,
    /// Rescale the offending frame's displacement down to the maximum
    /// allowed step and re-derive its position.
    Clip,
}

#[derive(Debug, Clone, Copy)]
pub struct StabilizerConfig {
    pub smoothing_window: usize,
    pub smoothing_polyorder: usize,
    pub min_track_duration_frames: usize,
    pub merge_time_gap_frames: i64,
    pub merge_distance_threshold: f64,
    pub max_speed_kmh: f64,
    pub outlier_policy: OutlierPolicy,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 11,
            smoothing_polyorder: 3,
            min_track_duration_frames: 15,
            merge_time_gap_frames: 10,
            merge_distance_threshold: 2.0,
            max_speed_kmh: 36.0,
            outlier_policy: OutlierPolicy::Flag,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StabilizeOutput {
    pub points: Vec<TrajectoryPoint>,
    /// (track_id, frame_id) pairs whose instantaneous speed exceeded
    /// `max_speed_kmh` and were flagged rather than clipped.
    pub flagged: Vec<(i64, i64)>,
}

/// Runs the full smooth → clean → outlier pipeline over one match's
/// raw tracking points.
pub fn stabilize(points: Vec<TrajectoryPoint>, fps: f64, config: &StabilizerConfig) -> Result<StabilizeOutput> {
    if points.is_empty() {
        return Ok(StabilizeOutput { points: Vec::new(), flagged: Vec::new() });
    }

    reject_duplicate_frames(&points)?;

    let smoothed = smooth_tracks(points, config);
    let merged = clean_and_merge(smoothed, config);
    apply_outlier_policy(merged, fps, config)
}

fn reject_duplicate_frames(points: &[TrajectoryPoint]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for p in points {
        if !seen.insert((p.track_id, p.frame_id)) {
            return Err(PitchSenseError::BadInput(format!(
                "duplicate (track_id={}, frame_id={})",
                p.track_id, p.frame_id
            )));
        }
    }
    Ok(())
}

fn group_by_track(points: Vec<TrajectoryPoint>) -> BTreeMap<i64, Vec<TrajectoryPoint>> {
    let mut by_track: BTreeMap<i64, Vec<TrajectoryPoint>> = BTreeMap::new();
    for p in points {
        by_track.entry(p.track_id).or_default().push(p);
    }
    for track in by_track.values_mut() {
        track.sort_by_key(|p| p.frame_id);
    }
    by_track
}

fn smooth_tracks(points: Vec<TrajectoryPoint>, config: &StabilizerConfig) -> Vec<TrajectoryPoint> {
    let by_track = group_by_track(points);
    let mut out = Vec::new();
    for (_, mut track) in by_track {
        let xs: Vec<f64> = track.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = track.iter().map(|p| p.y).collect();
        let (sx, sy) = smooth_xy(&xs, &ys, config.smoothing_window, config.smoothing_polyorder);
        for (p, (x, y)) in track.iter_mut().zip(sx.into_iter().zip(sy)) {
            p.x = x;
            p.y = y;
        }
        out.extend(track);
    }
    out
}

/// Smooths both coordinate series together. Short tracks fall back to
/// a centered moving average of width `min(3, len)`.
fn smooth_xy(xs: &[f64], ys: &[f64], window: usize, polyorder: usize) -> (Vec<f64>, Vec<f64>) {
    (smooth_signal(xs, window, polyorder), smooth_signal(ys, window, polyorder))
}

/// Savitzky-Golay-family smoothing shared by the stabilizer and the
/// physical-metrics engine's velocity smoothing. Tracks shorter than
/// `polyorder + 2` fall back to a centered moving average of width
/// `min(3, len)`.
pub fn smooth_signal(signal: &[f64], window: usize, polyorder: usize) -> Vec<f64> {
    if signal.len() < polyorder + 2 {
        let w = signal.len().min(3);
        return moving_average(signal, w);
    }
    savgol_like(signal, window, polyorder)
}

fn moving_average(signal: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || signal.len() < window {
        return signal.to_vec();
    }
    let half = window / 2;
    (0..signal.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(signal.len());
            let slice = &signal[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Local least-squares polynomial smoothing equivalent to a
/// Savitzky-Golay filter: for each point, fit a degree-`polyorder`
/// polynomial over a centered window (shrunk near the boundaries) and
/// evaluate it at the center.
fn savgol_like(signal: &[f64], window: usize, polyorder: usize) -> Vec<f64> {
    let n = signal.len();
    let mut actual_window = window.min(n);
    if actual_window % 2 == 0 {
        actual_window -= 1;
    }
    actual_window = actual_window.max(polyorder + 2).min(n);
    let half = actual_window / 2;

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let start = i.saturating_sub(half);
        let end = (i + half + 1).min(n);
        let local_window = &signal[start..end];
        let center_offset = (i - start) as f64;
        out.push(fit_polynomial_at(local_window, polyorder.min(local_window.len().saturating_sub(1)), center_offset));
    }
    out
}

/// Fits a degree-`order` polynomial to `window` (indexed 0..len) via
/// normal equations and evaluates it at `at`.
fn fit_polynomial_at(window: &[f64], order: usize, at: f64) -> f64 {
    let n = window.len();
    if n <= 1 {
        return window.first().copied().unwrap_or(0.0);
    }
    let order = order.min(n - 1);
    let terms = order + 1;

    let mut ata = nalgebra::DMatrix::<f64>::zeros(terms, terms);
    let mut atb = nalgebra::DVector::<f64>::zeros(terms);

    for (idx, &value) in window.iter().enumerate() {
        let x = idx as f64;
        let row: Vec<f64> = (0..terms).map(|k| x.powi(k as i32)).collect();
        let row = nalgebra::DVector::from_vec(row);
        ata += &row * row.transpose();
        atb += &row * value;
    }

    match ata.lu().solve(&atb) {
        Some(coeffs) => (0..terms).map(|k| coeffs[k] * at.powi(k as i32)).sum(),
        None => window[at.round() as usize],
    }
}

fn clean_and_merge(points: Vec<TrajectoryPoint>, config: &StabilizerConfig) -> Vec<TrajectoryPoint> {
    let by_track = group_by_track(points);

    let valid_tracks: Vec<Vec<TrajectoryPoint>> = by_track
        .into_values()
        .filter(|t| t.len() >= config.min_track_duration_frames)
        .collect();

    let merged = merge_fragments(valid_tracks, config);

    let mut out = Vec::new();
    for (new_id, track) in merged.into_iter().enumerate() {
        let new_id = new_id as i64 + 1;
        for mut p in track {
            p.track_id = new_id;
            out.push(p);
        }
    }
    out
}

fn merge_fragments(tracks: Vec<Vec<TrajectoryPoint>>, config: &StabilizerConfig) -> Vec<Vec<TrajectoryPoint>> {
    let mut merged: Vec<Vec<TrajectoryPoint>> = Vec::new();
    let mut consumed = vec![false; tracks.len()];

    for i in 0..tracks.len() {
        if consumed[i] {
            continue;
        }
        let mut current = tracks[i].clone();
        consumed[i] = true;

        for j in 0..tracks.len() {
            if consumed[j] || i == j {
                continue;
            }
            if should_merge(&current, &tracks[j], config) {
                current.extend(tracks[j].clone());
                current.sort_by_key(|p| p.frame_id);
                consumed[j] = true;
            }
        }
        merged.push(current);
    }

    merged
}

fn should_merge(track_a: &[TrajectoryPoint], track_b: &[TrajectoryPoint], config: &StabilizerConfig) -> bool {
    let (Some(end_a), Some(start_b)) = (track_a.last(), track_b.first()) else {
        return false;
    };

    let frame_gap = start_b.frame_id - end_a.frame_id;
    if frame_gap < 0 || frame_gap > config.merge_time_gap_frames {
        return false;
    }

    let distance = ((end_a.x - start_b.x).powi(2) + (end_a.y - start_b.y).powi(2)).sqrt();
    if distance > config.merge_distance_threshold {
        return false;
    }

    end_a.object_kind == start_b.object_kind
}

fn apply_outlier_policy(points: Vec<TrajectoryPoint>, fps: f64, config: &StabilizerConfig) -> Result<StabilizeOutput> {
    let by_track = group_by_track(points);
    let max_speed_ms = config.max_speed_kmh / 3.6;
    let mut flagged = Vec::new();
    let mut out = Vec::new();

    for (track_id, mut track) in by_track {
        for i in 1..track.len() {
            let dt = (track[i].timestamp - track[i - 1].timestamp).max(1e-6);
            let dx = track[i].x - track[i - 1].x;
            let dy = track[i].y - track[i - 1].y;
            let distance = (dx * dx + dy * dy).sqrt();
            let speed_ms = distance / dt;

            if speed_ms > max_speed_ms {
                match config.outlier_policy {
                    OutlierPolicy::Flag => flagged.push((track_id, track[i].frame_id)),
                    OutlierPolicy::Clip => {
                        let max_step = max_speed_ms / fps;
                        if distance > 0.0 {
                            let scale = max_step / distance;
                            let prev = track[i - 1];
                            track[i].x = prev.x + dx * scale;
                            track[i].y = prev.y + dy * scale;
                        }
                    }
                }
            }
        }
        out.extend(track);
    }

    out.sort_by_key(|p| (p.track_id, p.frame_id));
    Ok(StabilizeOutput { points: out, flagged })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::trajectory::ObjectKind;

    fn point(track_id: i64, frame_id: i64, x: f64, y: f64, t: f64) -> TrajectoryPoint {
        TrajectoryPoint {
            frame_id,
            track_id,
            x,
            y,
            object_kind: ObjectKind::Player,
            team: None,
            confidence: None,
            timestamp: t,
        }
    }

    #[test]
    fn rejects_duplicate_track_frame_pairs() {
        let points = vec![point(1, 0, 0.0, 0.0, 0.0), point(1, 0, 1.0, 1.0, 0.0)];
        assert!(stabilize(points, 25.0, &StabilizerConfig::default()).is_err());
    }

    #[test]
    fn empty_input_returns_empty_output() {
        let out = stabilize(Vec::new(), 25.0, &StabilizerConfig::default()).unwrap();
        assert!(out.points.is_empty());
        assert!(out.flagged.is_empty());
    }

    #[test]
    fn drops_short_tracks() {
        let mut points = Vec::new();
        for f in 0..5 {
            points.push(point(1, f, f as f64, 0.0, f as f64 / 25.0));
        }
        let out = stabilize(points, 25.0, &StabilizerConfig::default()).unwrap();
        assert!(out.points.is_empty());
    }

    #[test]
    fn merges_fragments_within_gap_and_distance() {
        let mut points = Vec::new();
        for f in 0..20 {
            points.push(point(1, f, f as f64 * 0.1, 0.0, f as f64 / 25.0));
        }
        for f in 25..45 {
            points.push(point(2, f, 2.0 + (f - 25) as f64 * 0.1, 0.0, f as f64 / 25.0));
        }
        let out = stabilize(points, 25.0, &StabilizerConfig::default()).unwrap();
        let track_ids: std::collections::HashSet<i64> = out.points.iter().map(|p| p.track_id).collect();
        assert_eq!(track_ids.len(), 1, "fragments within thresholds should merge into one track");
    }

    #[test]
    fn flags_but_does_not_move_outlier_speed_by_default() {
        let mut points = Vec::new();
        for f in 0..20 {
            points.push(point(1, f, 0.0, 0.0, f as f64 / 25.0));
        }
        points[10].x = 50.0; // implausible single-frame jump
        let out = stabilize(points, 25.0, &StabilizerConfig::default()).unwrap();
        assert!(!out.flagged.is_empty());
        let moved = out.points.iter().find(|p| p.frame_id == 10).unwrap();
        assert_eq!(moved.x, 50.0);
    }

    #[test]
    fn clip_mode_caps_displacement() {
        let mut points = Vec::new();
        for f in 0..20 {
            points.push(point(1, f, 0.0, 0.0, f as f64 / 25.0));
        }
        points[10].x = 50.0;
        let mut config = StabilizerConfig::default();
        config.outlier_policy = OutlierPolicy::Clip;
        config.smoothing_window = 1; // isolate the clip step from smoothing in this test
        config.smoothing_polyorder = 0;
        let out = stabilize(points, 25.0, &config).unwrap();
        let clipped = out.points.iter().find(|p| p.frame_id == 10).unwrap();
        assert!(clipped.x < 50.0);
    }
}
