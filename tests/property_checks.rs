//! Property-based checks for numeric invariants that should hold across
//! the whole input space, run with `proptest`.
//!
//! Unit tests colocated with each module already cover the concrete
//! scenarios; these sweep a range of inputs to catch boundary cases a
//! handful of fixed examples would miss.

use proptest::prelude::*;

use pitchsense_core::domain::pattern::RunningStat;
use pitchsense_core::domain::phase::{GamePhase, PhaseSequence};
use pitchsense_core::domain::trajectory::{MatchFrame, PlayerFrameEntry, TeamSide};
use pitchsense_core::engines::pitch_control::{calculate_pitch_control, PitchControlConfig};
use pitchsense_core::engines::stabilizer::{stabilize, OutlierPolicy, StabilizerConfig};
use pitchsense_core::domain::trajectory::{ObjectKind, TrajectoryPoint};
use pitchsense_core::geometry::Coordinates;
use pitchsense_core::xt_grid::XT_GRID;

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

proptest! {
    /// Coordinate conversions are round-trip consistent on the
    /// canonical axis for finite inputs.
    #[test]
    fn source_a_round_trip(x in 0.0f64..120.0, y in 0.0f64..80.0) {
        let canonical = Coordinates::from_source_a(x, y);
        let (rx, ry) = canonical.to_source_a();
        prop_assert!((rx - x).abs() < 1e-9);
        prop_assert!((ry - y).abs() < 1e-9);
    }

    #[test]
    fn source_b_round_trip(x in 0.0f64..1.0, y in 0.0f64..1.0) {
        let canonical = Coordinates::from_source_b(x, y);
        let (rx, ry) = canonical.to_source_b();
        prop_assert!((rx - x).abs() < 1e-9);
        prop_assert!((ry - y).abs() < 1e-9);
    }

    /// `RunningStat::update` always tracks the arithmetic mean of the
    /// values supplied so far, within a tight floating-point tolerance.
    #[test]
    fn running_stat_equals_arithmetic_mean(values in prop::collection::vec(-1000.0f64..1000.0, 1..200)) {
        let mut stat = RunningStat::default();
        for &v in &values {
            stat.update(v);
        }
        let expected = values.iter().sum::<f64>() / values.len() as f64;
        prop_assert!((stat.mean - expected).abs() < 1e-6 * (1.0 + expected.abs()));
    }

    /// No per-frame speed exceeds `max_speed_kmh` once clip mode is
    /// active, regardless of how extreme the raw jump is.
    #[test]
    fn clip_mode_never_exceeds_max_speed(jump_x in 20.0f64..500.0) {
        let mut points = Vec::new();
        for f in 0..20 {
            points.push(point(1, f, 0.0, 0.0, f as f64 / 25.0));
        }
        points[10].x = jump_x;

        let mut config = StabilizerConfig::default();
        config.outlier_policy = OutlierPolicy::Clip;
        config.smoothing_window = 1;
        config.smoothing_polyorder = 0;

        let out = stabilize(points, 25.0, &config).unwrap();
        let max_speed_ms = config.max_speed_kmh / 3.6;
        let by_frame: std::collections::HashMap<i64, &TrajectoryPoint> =
            out.points.iter().map(|p| (p.frame_id, p)).collect();
        for f in 1..20i64 {
            let (Some(prev), Some(cur)) = (by_frame.get(&(f - 1)), by_frame.get(&f)) else { continue };
            let dt = (cur.timestamp - prev.timestamp).max(1e-6);
            let dx = cur.x - prev.x;
            let dy = cur.y - prev.y;
            let speed = (dx * dx + dy * dy).sqrt() / dt;
            prop_assert!(speed <= max_speed_ms + 1e-6, "frame {f} speed {speed} exceeded cap {max_speed_ms}");
        }
    }

    /// Every pitch-control cell's home+away control normalizes to 1
    /// within tolerance, across arbitrary player placements.
    #[test]
    fn pitch_control_cells_normalize_to_unity(
        home_xs in prop::collection::vec(0.0f64..105.0, 0..6),
        home_ys in prop::collection::vec(0.0f64..68.0, 0..6),
        away_xs in prop::collection::vec(0.0f64..105.0, 0..6),
        away_ys in prop::collection::vec(0.0f64..68.0, 0..6),
    ) {
        let n = home_xs.len().min(home_ys.len());
        let m = away_xs.len().min(away_ys.len());
        // Both teams empty is a degenerate frame beyond the documented
        // "missing team" edge case (only one side missing); every cell's
        // control is 0/0 there, which normalizes to 0, not 1.
        prop_assume!(n + m > 0);
        let mut players = Vec::new();
        for i in 0..n {
            players.push(PlayerFrameEntry { player_id_hash: i as i64, team: TeamSide::Home, x: home_xs[i], y: home_ys[i], velocity: None });
        }
        for i in 0..m {
            players.push(PlayerFrameEntry { player_id_hash: 100 + i as i64, team: TeamSide::Away, x: away_xs[i], y: away_ys[i], velocity: None });
        }
        let frame = MatchFrame {
            frame_id: 0,
            players,
            ball: (52.5, 34.0),
            pitch_length: 105.0,
            pitch_width: 68.0,
            grid_width: 8,
            grid_height: 6,
        };
        let grid = calculate_pitch_control(&frame, &PitchControlConfig { grid_width: 8, grid_height: 6, ..PitchControlConfig::default() });
        for i in 0..grid.home_control.len() {
            let total = grid.home_control[i] + grid.away_control[i];
            prop_assert!((total - 1.0).abs() < 1e-6, "cell {i} normalized to {total}");
        }
    }

    /// A `PhaseSequence` built from an arbitrary (non-empty) run of
    /// organized-attack/organized-defense frames always reports phase
    /// percentages that sum to 100 within a tight tolerance.
    #[test]
    fn phase_percentages_always_sum_to_100(
        attack_frames in 1usize..300,
        defense_frames in 1usize..300,
    ) {
        let mut seq = PhaseSequence::new("m1", "home", 25.0);
        let mut frame_id = 0i64;
        for _ in 0..attack_frames {
            seq.add_frame_phase(frame_id, GamePhase::OrganizedAttack, 1.0);
            frame_id += 1;
        }
        for _ in 0..defense_frames {
            seq.add_frame_phase(frame_id, GamePhase::OrganizedDefense, 1.0);
            frame_id += 1;
        }
        let pct = seq.percentages();
        let total: f64 = pct.values().sum();
        prop_assert!((total - 100.0).abs() < 1e-3);
    }

    /// xT monotonicity: moving further along the attacking axis (home
    /// attacks +x) toward the opposing penalty area never decreases xT.
    #[test]
    fn xt_non_decreasing_toward_attacking_goal(
        x1 in 0.0f64..104.0,
        delta in 0.1f64..20.0,
        y in 0.0f64..68.0,
    ) {
        let x2 = (x1 + delta).min(104.9);
        let t1 = XT_GRID.threat_at_location(x1, y);
        let t2 = XT_GRID.threat_at_location(x2, y);
        // the grid is piecewise-constant per zone; only assert the
        // invariant when the two points actually land in different
        // (or the same) x-zones, since within a zone values are equal.
        prop_assert!(t2 >= t1 - 1e-12);
    }
}
