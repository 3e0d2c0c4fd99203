//! Fundamental types used across the entire workspace.

use crate::error::{FilterError, Result};
use nalgebra::{Matrix4, SMatrix, SVector, Vector4};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Scalar type: f64 throughout. All matrices are fixed-size and stack allocated.
// ---------------------------------------------------------------------------

/// Dimension of the state vector.
pub const STATE_DIM: usize = 8;

/// Dimension of a box measurement.
pub const MEAS_DIM: usize = 4;

/// 8-DOF state vector: [x, y, a, h, vx, vy, va, vh]
pub type StateVec = SVector<f64, STATE_DIM>;

/// 8×8 state covariance matrix
pub type StateCov = SMatrix<f64, STATE_DIM, STATE_DIM>;

/// Box measurement [x, y, a, h] (centre, aspect ratio, height)
pub type MeasVec = Vector4<f64>;

/// 4×4 covariance in measurement space
pub type MeasCov = Matrix4<f64>;

/// 4×8 observation matrix H
pub type ObservationMatrix = SMatrix<f64, MEAS_DIM, STATE_DIM>;

/// Build a measurement from a slice, rejecting anything that is not exactly
/// four finite values.
pub fn measurement_from_slice(values: &[f64]) -> Result<MeasVec> {
    if values.len() != MEAS_DIM {
        return Err(FilterError::DimensionMismatch {
            what: "measurement",
            expected: MEAS_DIM,
            actual: values.len(),
        });
    }
    let z = MeasVec::from_column_slice(values);
    if z.iter().any(|v| !v.is_finite()) {
        return Err(FilterError::NonFinite { what: "measurement" });
    }
    Ok(z)
}

// ---------------------------------------------------------------------------
// KalmanState — the (mean, covariance) pair owned by one track
// ---------------------------------------------------------------------------

/// Gaussian belief over one track's kinematic state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KalmanState {
    pub mean: StateVec,
    pub cov: StateCov,
}

impl KalmanState {
    pub fn new(mean: StateVec, cov: StateCov) -> Self {
        Self { mean, cov }
    }

    /// Current box estimate as [x, y, a, h].
    pub fn xyah(&self) -> MeasVec {
        self.mean.fixed_rows::<MEAS_DIM>(0).into_owned()
    }

    /// Current box estimate in top-left/size form.
    pub fn to_bbox(&self) -> BoundingBox {
        BoundingBox::from_xyah(&self.xyah())
    }

    /// Sum of the covariance diagonal, a scalar summary of uncertainty.
    pub fn uncertainty(&self) -> f64 {
        self.cov.trace()
    }
}

// ---------------------------------------------------------------------------
// BoundingBox — detector-side box format
// ---------------------------------------------------------------------------

/// Axis-aligned box in pixel coordinates: top-left corner plus size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert to the filter's measurement space: centre, aspect (w/h), height.
    pub fn to_xyah(&self) -> MeasVec {
        MeasVec::new(
            self.x + self.width / 2.0,
            self.y + self.height / 2.0,
            self.width / self.height,
            self.height,
        )
    }

    pub fn from_xyah(z: &MeasVec) -> Self {
        let width = z[2] * z[3];
        let height = z[3];
        Self {
            x: z[0] - width / 2.0,
            y: z[1] - height / 2.0,
            width,
            height,
        }
    }

    /// Corners as (min x, min y, max x, max y).
    pub fn to_tlbr(&self) -> [f64; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn bbox_xyah_conversion() {
        let b = BoundingBox::new(10.0, 20.0, 50.0, 100.0);
        let z = b.to_xyah();
        assert_abs_diff_eq!(z[0], 35.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z[1], 70.0, epsilon = 1e-12);
        assert_abs_diff_eq!(z[2], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z[3], 100.0, epsilon = 1e-12);

        let back = BoundingBox::from_xyah(&z);
        assert_abs_diff_eq!(back.x, b.x, epsilon = 1e-12);
        assert_abs_diff_eq!(back.width, b.width, epsilon = 1e-12);
        assert_eq!(back.to_tlbr(), [10.0, 20.0, 60.0, 120.0]);
    }

    #[test]
    fn slice_measurement_validation() {
        assert!(measurement_from_slice(&[1.0, 2.0, 0.5, 10.0]).is_ok());
        assert_eq!(
            measurement_from_slice(&[1.0, 2.0, 0.5]),
            Err(FilterError::DimensionMismatch {
                what: "measurement",
                expected: 4,
                actual: 3
            })
        );
        assert!(matches!(
            measurement_from_slice(&[1.0, f64::NAN, 0.5, 10.0]),
            Err(FilterError::NonFinite { .. })
        ));
    }

    #[test]
    fn state_box_uses_position_components() {
        let mean = StateVec::from_column_slice(&[35.0, 70.0, 0.5, 100.0, 9.0, 9.0, 9.0, 9.0]);
        let state = KalmanState::new(mean, StateCov::identity() * 2.0);
        assert_eq!(state.to_bbox(), BoundingBox::new(10.0, 20.0, 50.0, 100.0));
        assert_abs_diff_eq!(state.uncertainty(), 16.0, epsilon = 1e-12);
    }
}
