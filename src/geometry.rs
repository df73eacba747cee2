//! Coordinate systems, pitch zones and homography.
//!
//! Grounded on `original_source/.../value_objects/{coordinates,
//! homography_matrix,bounding_box}.py`.

use crate::error::{PitchSenseError, Result};
use serde::{Deserialize, Serialize};

/// Standard pitch length in meters.
pub const PITCH_LENGTH_M: f64 = 105.0;
/// Standard pitch width in meters.
pub const PITCH_WIDTH_M: f64 = 68.0;

const STATSBOMB_LENGTH: f64 = 120.0;
const STATSBOMB_WIDTH: f64 = 80.0;

/// A canonical pitch coordinate in meters on a 105x68 field, origin at
/// a corner, x along the long axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert source "A" (StatsBomb-style 120x80) coordinates to canonical.
    pub fn from_source_a(x: f64, y: f64) -> Self {
        Self {
            x: (x / STATSBOMB_LENGTH) * PITCH_LENGTH_M,
            y: (y / STATSBOMB_WIDTH) * PITCH_WIDTH_M,
        }
    }

    /// Convert canonical coordinates back to source "A" space.
    pub fn to_source_a(self) -> (f64, f64) {
        (
            (self.x / PITCH_LENGTH_M) * STATSBOMB_LENGTH,
            (self.y / PITCH_WIDTH_M) * STATSBOMB_WIDTH,
        )
    }

    /// Convert source "B" (Metrica-style, normalized 0..1) coordinates to canonical.
    pub fn from_source_b(x: f64, y: f64) -> Self {
        Self {
            x: x * PITCH_LENGTH_M,
            y: y * PITCH_WIDTH_M,
        }
    }

    /// Convert canonical coordinates back to source "B" space.
    pub fn to_source_b(self) -> (f64, f64) {
        (self.x / PITCH_LENGTH_M, self.y / PITCH_WIDTH_M)
    }

    /// Which of the three pitch thirds this point's x falls in, given
    /// a pitch length (0 = defensive third, 2 = attacking third for a
    /// team attacking +x).
    pub fn third(self, pitch_length: f64) -> PitchThird {
        let t = pitch_length / 3.0;
        if self.x < t {
            PitchThird::Defensive
        } else if self.x < 2.0 * t {
            PitchThird::Middle
        } else {
            PitchThird::Attacking
        }
    }

    /// Index into a 4x3 zone map (12 zones total): 4 bands across y,
    /// 3 bands across x.
    pub fn zone_4x3(self, pitch_length: f64, pitch_width: f64) -> usize {
        let col = ((self.x / pitch_length) * 3.0).floor().clamp(0.0, 2.0) as usize;
        let row = ((self.y / pitch_width) * 4.0).floor().clamp(0.0, 3.0) as usize;
        row * 3 + col
    }

    pub fn euclidean_distance(self, other: Coordinates) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchThird {
    Defensive,
    Middle,
    Attacking,
}

/// Pixel-space detection from the object detector, before homography.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
    pub class_id: i32,
}

impl BoundingBox {
    pub fn center(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// A calibration keypoint pairing a pixel location with a known pitch
/// location (e.g. a penalty spot, corner flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keypoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub pitch_x: f64,
    pub pitch_y: f64,
    /// Landmark identity (e.g. "penalty_spot_left"), when the detector
    /// or calibration source supplies one.
    #[serde(default)]
    pub name: Option<String>,
}

/// Immutable 3x3 homography transform from pixel space to pitch space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomographyMatrix {
    pub matrix: [[f64; 3]; 3],
}

impl HomographyMatrix {
    pub fn identity() -> Self {
        Self {
            matrix: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    /// Homogeneous-division point transform with a tiny denominator guard.
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let h = &self.matrix;
        let mut w = h[2][0] * x + h[2][1] * y + h[2][2];
        if w == 0.0 {
            w = 1e-10;
        }
        let new_x = (h[0][0] * x + h[0][1] * y + h[0][2]) / w;
        let new_y = (h[1][0] * x + h[1][1] * y + h[1][2]) / w;
        (new_x, new_y)
    }

    /// Fits a homography from >=4 pixel<->pitch keypoint correspondences
    /// via a direct linear transform least-squares solve.
    pub fn fit(keypoints: &[Keypoint]) -> Result<Self> {
        if keypoints.len() < 4 {
            return Err(PitchSenseError::BadInput(format!(
                "homography fit requires >= 4 keypoints, got {}",
                keypoints.len()
            )));
        }

        // Build the 2n x 8 design matrix for the DLT formulation with
        // h[2][2] fixed to 1, solved via normal equations (A^T A h = A^T b).
        let mut ata = nalgebra::DMatrix::<f64>::zeros(8, 8);
        let mut atb = nalgebra::DVector::<f64>::zeros(8);

        for kp in keypoints {
            let (px, py) = (kp.pixel_x, kp.pixel_y);
            let (u, v) = (kp.pitch_x, kp.pitch_y);

            let row_u = nalgebra::DVector::from_vec(vec![
                px, py, 1.0, 0.0, 0.0, 0.0, -px * u, -py * u,
            ]);
            let row_v = nalgebra::DVector::from_vec(vec![
                0.0, 0.0, 0.0, px, py, 1.0, -px * v, -py * v,
            ]);

            ata += &row_u * row_u.transpose();
            ata += &row_v * row_v.transpose();
            atb += &row_u * u;
            atb += &row_v * v;
        }

        let h = ata
            .lu()
            .solve(&atb)
            .ok_or_else(|| PitchSenseError::BadInput("degenerate keypoint configuration".into()))?;

        Ok(Self {
            matrix: [
                [h[0], h[1], h[2]],
                [h[3], h[4], h[5]],
                [h[6], h[7], 1.0],
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_a_round_trip() {
        let c = Coordinates::from_source_a(60.0, 40.0);
        let (x, y) = c.to_source_a();
        assert!((x - 60.0).abs() < 1e-9);
        assert!((y - 40.0).abs() < 1e-9);
    }

    #[test]
    fn source_b_round_trip() {
        let c = Coordinates::from_source_b(0.3, 0.75);
        let (x, y) = c.to_source_b();
        assert!((x - 0.3).abs() < 1e-9);
        assert!((y - 0.75).abs() < 1e-9);
    }

    #[test]
    fn pitch_thirds() {
        let c = Coordinates::new(10.0, 34.0);
        assert_eq!(c.third(105.0), PitchThird::Defensive);
        let c = Coordinates::new(90.0, 34.0);
        assert_eq!(c.third(105.0), PitchThird::Attacking);
    }

    #[test]
    fn identity_homography_is_noop() {
        let h = HomographyMatrix::identity();
        let (x, y) = h.transform_point(12.3, 45.6);
        assert!((x - 12.3).abs() < 1e-9);
        assert!((y - 45.6).abs() < 1e-9);
    }

    #[test]
    fn fit_recovers_known_scale() {
        // pixel space 0..1920x1080 maps linearly onto the pitch.
        let keypoints = vec![
            Keypoint { pixel_x: 0.0, pixel_y: 0.0, pitch_x: 0.0, pitch_y: 0.0, name: Some("top_left".into()) },
            Keypoint { pixel_x: 1920.0, pixel_y: 0.0, pitch_x: 105.0, pitch_y: 0.0, name: Some("top_right".into()) },
            Keypoint { pixel_x: 0.0, pixel_y: 1080.0, pitch_x: 0.0, pitch_y: 68.0, name: None },
            Keypoint { pixel_x: 1920.0, pixel_y: 1080.0, pitch_x: 105.0, pitch_y: 68.0, name: None },
        ];
        let h = HomographyMatrix::fit(&keypoints).unwrap();
        let (x, y) = h.transform_point(960.0, 540.0);
        assert!((x - 52.5).abs() < 1e-6);
        assert!((y - 34.0).abs() < 1e-6);
    }

    #[test]
    fn fit_rejects_too_few_keypoints() {
        let keypoints = vec![Keypoint { pixel_x: 0.0, pixel_y: 0.0, pitch_x: 0.0, pitch_y: 0.0, name: None }];
        assert!(HomographyMatrix::fit(&keypoints).is_err());
    }

    #[test]
    fn zone_4x3_covers_corners() {
        let c = Coordinates::new(0.0, 0.0);
        assert_eq!(c.zone_4x3(105.0, 68.0), 0);
        let c = Coordinates::new(104.9, 67.9);
        assert_eq!(c.zone_4x3(105.0, 68.0), 11);
    }
}
