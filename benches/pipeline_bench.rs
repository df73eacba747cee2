//! Benchmarks the per-frame pipeline stages most sensitive to scale:
//! trajectory stabilization and pitch-control grid computation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pitchsense_core::domain::trajectory::{MatchFrame, ObjectKind, PlayerFrameEntry, TeamSide, TrajectoryPoint};
use pitchsense_core::engines::pitch_control::{calculate_pitch_control, PitchControlConfig};
use pitchsense_core::engines::stabilizer::{stabilize, StabilizerConfig};

fn synthetic_points(num_tracks: i64, num_frames: i64, fps: f64) -> Vec<TrajectoryPoint> {
    let mut points = Vec::with_capacity((num_tracks * num_frames) as usize);
    for frame_id in 0..num_frames {
        let t = frame_id as f64 / fps;
        for track_id in 0..num_tracks {
            let phase = track_id as f64;
            points.push(TrajectoryPoint {
                frame_id,
                track_id,
                x: 52.5 + 10.0 * (t * 0.5 + phase).sin(),
                y: 34.0 + 8.0 * (t * 0.3 + phase).cos(),
                object_kind: if track_id == 0 { ObjectKind::Ball } else { ObjectKind::Player },
                team: Some(if track_id % 2 == 0 { TeamSide::Home } else { TeamSide::Away }),
                confidence: Some(0.9),
                timestamp: t,
            });
        }
    }
    points
}

fn synthetic_frame(num_players_per_team: usize) -> MatchFrame {
    let mut players = Vec::with_capacity(num_players_per_team * 2);
    for i in 0..num_players_per_team {
        players.push(PlayerFrameEntry {
            player_id_hash: i as i64,
            team: TeamSide::Home,
            x: 20.0 + i as f64 * 3.0,
            y: 10.0 + i as f64 * 2.0,
            velocity: None,
        });
        players.push(PlayerFrameEntry {
            player_id_hash: (1000 + i) as i64,
            team: TeamSide::Away,
            x: 70.0 + i as f64 * 3.0,
            y: 50.0 - i as f64 * 2.0,
            velocity: None,
        });
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

fn bench_stabilizer(c: &mut Criterion) {
    let config = StabilizerConfig::default();
    c.bench_function("stabilize_22_tracks_1500_frames", |b| {
        b.iter_batched(
            || synthetic_points(23, 1500, 25.0),
            |points| black_box(stabilize(points, 25.0, &config).unwrap()),
            criterion::BatchSize::LargeInput,
        )
    });
}

fn bench_pitch_control(c: &mut Criterion) {
    let frame = synthetic_frame(11);
    let config = PitchControlConfig::default();
    c.bench_function("pitch_control_single_frame", |b| {
        b.iter(|| black_box(calculate_pitch_control(&frame, &config)))
    });
}

criterion_group!(benches, bench_stabilizer, bench_pitch_control);
criterion_main!(benches);
