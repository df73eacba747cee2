//! The columnar trajectory-table format persisted under `tracking/`.
//!
//! Columns: `frame_id`, `player_id`, `x`, `y`, `object_kind`,
//! `confidence`, `timestamp`, plus optional `team`. Encoded with
//! `bincode` (serde-derived, self-describing via the struct's own
//! field layout), the same binary-table codec used by
//! `prospectorengine-prospector-btc`'s own columnar/binary persistence.

use serde::{Deserialize, Serialize};

use crate::domain::trajectory::{ObjectKind, TeamSide, TrajectoryPoint};
use crate::error::{PitchSenseError, Result};

/// One row of the trajectory table. Optional columns (`team`,
/// `confidence`) round-trip as `None` when absent — readers must
/// tolerate missing optional columns rather than erroring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub frame_id: i64,
    pub player_id: String,
    pub x: f64,
    pub y: f64,
    pub object_kind: ObjectKind,
    pub confidence: Option<f64>,
    pub timestamp: f64,
    pub team: Option<TeamSide>,
}

impl From<&TrajectoryPoint> for TableRow {
    fn from(p: &TrajectoryPoint) -> Self {
        TableRow {
            frame_id: p.frame_id,
            player_id: p.track_id.to_string(),
            x: p.x,
            y: p.y,
            object_kind: p.object_kind,
            confidence: p.confidence,
            timestamp: p.timestamp,
            team: p.team,
        }
    }
}

/// A self-describing columnar table: `rows` ordered ascending by
/// `frame_id` is the writer's contract; readers that cannot assume
/// this re-sort before metric computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn from_trajectory_points(points: &[TrajectoryPoint]) -> Self {
        Table { rows: points.iter().map(TableRow::from).collect() }
    }

    /// Re-sorts by `frame_id` if not already ascending, so metric
    /// computation never runs over an out-of-order writer.
    pub fn ensure_sorted(&mut self) {
        if !self.rows.windows(2).all(|w| w[0].frame_id <= w[1].frame_id) {
            self.rows.sort_by_key(|r| r.frame_id);
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| PitchSenseError::Internal {
            message: format!("table encode failed: {e}"),
            correlation_id: "store/table".to_string(),
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Table> {
        bincode::deserialize(bytes).map_err(|e| PitchSenseError::BadInput(format!("table decode failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(frame_id: i64, track_id: i64) -> TrajectoryPoint {
        TrajectoryPoint {
            frame_id,
            track_id,
            x: 10.0,
            y: 20.0,
            object_kind: ObjectKind::Player,
            team: Some(TeamSide::Home),
            confidence: Some(0.9),
            timestamp: frame_id as f64 / 25.0,
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let table = Table::from_trajectory_points(&[point(0, 1), point(1, 1), point(2, 2)]);
        let bytes = table.encode().unwrap();
        let decoded = Table::decode(&bytes).unwrap();
        assert_eq!(table, decoded);
    }

    #[test]
    fn ensure_sorted_fixes_out_of_order_rows() {
        let mut table = Table::from_trajectory_points(&[point(5, 1), point(1, 1), point(3, 1)]);
        table.ensure_sorted();
        let frame_ids: Vec<i64> = table.rows.iter().map(|r| r.frame_id).collect();
        assert_eq!(frame_ids, vec![1, 3, 5]);
    }

    #[test]
    fn missing_optional_columns_round_trip_as_none() {
        let mut table = Table::from_trajectory_points(&[point(0, 1)]);
        table.rows[0].team = None;
        table.rows[0].confidence = None;
        let bytes = table.encode().unwrap();
        let decoded = Table::decode(&bytes).unwrap();
        assert!(decoded.rows[0].team.is_none());
        assert!(decoded.rows[0].confidence.is_none());
    }
}
