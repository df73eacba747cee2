//! Expected Threat (xT) grid: a 12x8 lookup mapping pitch zones to the
//! probability of scoring within the next few actions.
//!
//! Values are adapted from Karun Singh's xT model (see
//! `original_source/.../expected_threat_grid.py`), loaded once per
//! process as a constant resource.

use once_cell::sync::Lazy;

pub const GRID_WIDTH: usize = 12;
pub const GRID_HEIGHT: usize = 8;

/// `[zone_y][zone_x]`, y in [0, GRID_HEIGHT), x in [0, GRID_WIDTH).
/// Symmetric across the pitch's vertical midline; monotonically
/// non-decreasing toward the attacked goal's penalty area.
#[rustfmt::skip]
static RAW_COLUMNS: [[f64; GRID_HEIGHT]; GRID_WIDTH] = [
    [0.00638, 0.00750, 0.00835, 0.00882, 0.00878, 0.00864, 0.00864, 0.00878],
    [0.00779, 0.00878, 0.00969, 0.01022, 0.01026, 0.01016, 0.01016, 0.01026],
    [0.00844, 0.00982, 0.01094, 0.01164, 0.01183, 0.01179, 0.01179, 0.01183],
    [0.00977, 0.01155, 0.01319, 0.01432, 0.01480, 0.01489, 0.01489, 0.01480],
    [0.01199, 0.01465, 0.01756, 0.01990, 0.02116, 0.02162, 0.02162, 0.02116],
    [0.01438, 0.01846, 0.02398, 0.02957, 0.03305, 0.03475, 0.03475, 0.03305],
    [0.01678, 0.02284, 0.03256, 0.04558, 0.05593, 0.06116, 0.06116, 0.05593],
    [0.02332, 0.03366, 0.05161, 0.08059, 0.11640, 0.13681, 0.13681, 0.11640],
    [0.02950, 0.04270, 0.06570, 0.10300, 0.14800, 0.17400, 0.17400, 0.14800],
    [0.03720, 0.05420, 0.08400, 0.13200, 0.18900, 0.22200, 0.22200, 0.18900],
    [0.04650, 0.06800, 0.10600, 0.16600, 0.23700, 0.27800, 0.27800, 0.23700],
    [0.05800, 0.08500, 0.13300, 0.20800, 0.29600, 0.34700, 0.34700, 0.29600],
];

pub static XT_GRID: Lazy<ExpectedThreatGrid> = Lazy::new(ExpectedThreatGrid::default_grid);

/// Maps pitch locations (meters, 105x68) to xT probability.
pub struct ExpectedThreatGrid {
    grid: [[f64; GRID_WIDTH]; GRID_HEIGHT],
    pitch_length: f64,
    pitch_width: f64,
}

impl ExpectedThreatGrid {
    fn default_grid() -> Self {
        let mut grid = [[0.0; GRID_WIDTH]; GRID_HEIGHT];
        for x in 0..GRID_WIDTH {
            for y in 0..GRID_HEIGHT {
                grid[y][x] = RAW_COLUMNS[x][y];
            }
        }
        Self {
            grid,
            pitch_length: crate::geometry::PITCH_LENGTH_M,
            pitch_width: crate::geometry::PITCH_WIDTH_M,
        }
    }

    pub fn threat_at_zone(&self, zone_x: usize, zone_y: usize) -> f64 {
        let zx = zone_x.min(GRID_WIDTH - 1);
        let zy = zone_y.min(GRID_HEIGHT - 1);
        self.grid[zy][zx]
    }

    /// Pitch coords map to zones via floor-scaling, clamped to grid bounds.
    pub fn pitch_to_zone(&self, x: f64, y: f64) -> (usize, usize) {
        let zx = ((x / self.pitch_length) * GRID_WIDTH as f64)
            .floor()
            .clamp(0.0, (GRID_WIDTH - 1) as f64) as usize;
        let zy = ((y / self.pitch_width) * GRID_HEIGHT as f64)
            .floor()
            .clamp(0.0, (GRID_HEIGHT - 1) as f64) as usize;
        (zx, zy)
    }

    pub fn threat_at_location(&self, x: f64, y: f64) -> f64 {
        let (zx, zy) = self.pitch_to_zone(x, y);
        self.threat_at_zone(zx, zy)
    }

    pub fn change(&self, from: (f64, f64), to: (f64, f64)) -> f64 {
        self.threat_at_location(to.0, to.1) - self.threat_at_location(from.0, from.1)
    }
}
