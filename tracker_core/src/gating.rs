//! Mahalanobis gating: scores how well candidate measurements fit a
//! predicted track.
//!
//! # Gating criterion
//! d²(z, track) = νᵀ S⁻¹ ν  where ν = z − H·x̂_pred,  S = H·P_pred·Hᵀ + R
//!
//! S is factored as L·Lᵀ and each residual is whitened with a triangular
//! solve, so d² = ‖L⁻¹ν‖². The association stage accepts a pair if
//! d² ≤ χ²(0.95, dof), with dof = 4 for the full box and 2 for position only.

use crate::{
    error::{FilterError, Result},
    kf::{validate_measurement, BoxKalmanFilter, MotionModel},
    types::{MeasVec, StateCov, StateVec},
};
use nalgebra::{SMatrix, SVector};
use tracing::warn;

/// 95% quantile of the χ² distribution indexed by degrees of freedom [1..=9].
/// Index 0 is unused.
pub const CHI2INV95: [f64; 10] = [
    0.0, 3.8415, 5.9915, 7.8147, 9.4877, 11.070, 12.592, 14.067, 15.507, 16.919,
];

/// Look up χ²(0.95, dof), if tabulated.
pub fn chi2inv95(dof: usize) -> Option<f64> {
    match dof {
        1..=9 => Some(CHI2INV95[dof]),
        _ => None,
    }
}

/// Gate threshold matching a `gating_distance` call with the same flag.
pub fn gating_threshold(only_position: bool) -> f64 {
    if only_position {
        CHI2INV95[2]
    } else {
        CHI2INV95[4]
    }
}

/// True if a squared distance falls inside the 95% gate.
pub fn within_gate(d2: f64, only_position: bool) -> bool {
    d2 <= gating_threshold(only_position)
}

/// Squared Mahalanobis distance of each point from a Gaussian (mean, cov),
/// computed through the Cholesky factor of `cov`.
pub fn squared_mahalanobis<const D: usize>(
    mean: &SVector<f64, D>,
    cov: SMatrix<f64, D, D>,
    points: impl IntoIterator<Item = SVector<f64, D>>,
) -> Result<Vec<f64>> {
    let not_pd = || FilterError::NotPositiveDefinite {
        what: "gating covariance",
    };
    let chol = cov.cholesky().ok_or_else(|| {
        warn!(dim = D, "gating covariance is not positive definite");
        not_pd()
    })?;
    let l = chol.l();

    points
        .into_iter()
        .map(|p| {
            let d = p - mean;
            l.solve_lower_triangular(&d)
                .map(|z| z.norm_squared())
                .ok_or_else(not_pd)
        })
        .collect()
}

impl<M: MotionModel> BoxKalmanFilter<M> {
    /// Squared Mahalanobis distance between the projected state and each
    /// candidate measurement, in input order.
    ///
    /// With `only_position` set, only the box centre (x, y) is compared.
    pub fn gating_distance(
        &self,
        mean: &StateVec,
        cov: &StateCov,
        measurements: &[MeasVec],
        only_position: bool,
    ) -> Result<Vec<f64>> {
        let (projected_mean, projected_cov) = self.project(mean, cov)?;
        for z in measurements {
            validate_measurement(z)?;
        }

        if only_position {
            let mean_xy = projected_mean.fixed_rows::<2>(0).into_owned();
            let cov_xy = projected_cov.fixed_view::<2, 2>(0, 0).into_owned();
            squared_mahalanobis(
                &mean_xy,
                cov_xy,
                measurements.iter().map(|z| z.fixed_rows::<2>(0).into_owned()),
            )
        } else {
            squared_mahalanobis(&projected_mean, projected_cov, measurements.iter().copied())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KalmanState;
    use approx::assert_abs_diff_eq;

    fn track(kf: &BoxKalmanFilter) -> KalmanState {
        // diagonal covariance: projected var for x, y, h is 20² + 10² = 500
        kf.initiate(&MeasVec::new(100.0, 50.0, 0.5, 200.0)).unwrap()
    }

    #[test]
    fn measurement_at_prediction_has_zero_distance() {
        let kf = BoxKalmanFilter::default();
        let mut state = track(&kf);
        kf.predict_state(&mut state).unwrap();
        let (pm, _) = kf.project(&state.mean, &state.cov).unwrap();

        for only_position in [false, true] {
            let d = kf
                .gating_distance(&state.mean, &state.cov, &[pm], only_position)
                .unwrap();
            assert_eq!(d.len(), 1);
            assert!(d[0] < 1e-12);
        }
    }

    #[test]
    fn distance_is_residual_in_standard_deviations_squared() {
        let kf = BoxKalmanFilter::default();
        let state = track(&kf);
        let sigma = 500.0_f64.sqrt();
        let z = MeasVec::new(100.0 + 2.0 * sigma, 50.0, 0.5, 200.0);

        let full = kf.gating_distance(&state.mean, &state.cov, &[z], false).unwrap();
        let xy = kf.gating_distance(&state.mean, &state.cov, &[z], true).unwrap();
        assert_abs_diff_eq!(full[0], 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(xy[0], 4.0, epsilon = 1e-9);
    }

    #[test]
    fn results_follow_input_order() {
        let kf = BoxKalmanFilter::default();
        let state = track(&kf);
        let candidates = [
            MeasVec::new(180.0, 50.0, 0.5, 200.0),
            MeasVec::new(100.0, 50.0, 0.5, 200.0),
            MeasVec::new(120.0, 50.0, 0.5, 200.0),
        ];

        let d = kf
            .gating_distance(&state.mean, &state.cov, &candidates, false)
            .unwrap();
        assert_eq!(d.len(), 3);
        assert!(d[1] < d[2] && d[2] < d[0]);
        assert!(within_gate(d[1], false));
        assert!(!within_gate(d[0], false));
    }

    #[test]
    fn position_only_ignores_shape_and_never_exceeds_full() {
        let kf = BoxKalmanFilter::default();
        let mut state = track(&kf);
        state.mean[4] = 4.0;
        kf.predict_state(&mut state).unwrap();
        // correlate position with velocity through a correction
        let z = MeasVec::new(108.0, 47.0, 0.55, 205.0);
        kf.update_state(&mut state, &z).unwrap();
        kf.predict_state(&mut state).unwrap();

        let candidates = [
            MeasVec::new(112.0, 45.0, 0.9, 260.0),
            MeasVec::new(90.0, 70.0, 0.5, 200.0),
            MeasVec::new(130.0, 20.0, 0.3, 150.0),
        ];
        let full = kf
            .gating_distance(&state.mean, &state.cov, &candidates, false)
            .unwrap();
        let xy = kf
            .gating_distance(&state.mean, &state.cov, &candidates, true)
            .unwrap();
        for (f, p) in full.iter().zip(&xy) {
            assert!(p <= &(f + 1e-9), "marginal {p} > full {f}");
        }

        let (pm, _) = kf.project(&state.mean, &state.cov).unwrap();
        let shape_only = MeasVec::new(pm[0], pm[1], pm[2] + 0.3, pm[3] * 1.5);
        let d = kf
            .gating_distance(&state.mean, &state.cov, &[shape_only], true)
            .unwrap();
        assert!(d[0] < 1e-12);
    }

    #[test]
    fn empty_candidates_yield_empty_result() {
        let kf = BoxKalmanFilter::default();
        let state = track(&kf);
        let d = kf.gating_distance(&state.mean, &state.cov, &[], false).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn degenerate_covariance_is_an_error() {
        let kf = BoxKalmanFilter::default();
        let mean = StateVec::from_column_slice(&[0.0, 0.0, 1.0, 100.0, 0.0, 0.0, 0.0, 0.0]);
        let cov = StateCov::identity() * -1000.0;
        let z = MeasVec::new(0.0, 0.0, 1.0, 100.0);

        assert_eq!(
            kf.gating_distance(&mean, &cov, &[z], true),
            Err(FilterError::NotPositiveDefinite {
                what: "gating covariance"
            })
        );
    }

    #[test]
    fn non_finite_candidate_is_rejected() {
        let kf = BoxKalmanFilter::default();
        let state = track(&kf);
        let bad = MeasVec::new(f64::NAN, 0.0, 1.0, 10.0);
        assert!(matches!(
            kf.gating_distance(&state.mean, &state.cov, &[bad], false),
            Err(FilterError::NonFinite { .. })
        ));
    }

    #[test]
    fn chi_square_table() {
        assert_eq!(chi2inv95(4), Some(9.4877));
        assert_eq!(chi2inv95(2), Some(5.9915));
        assert_eq!(chi2inv95(9), Some(16.919));
        assert_eq!(chi2inv95(0), None);
        assert_eq!(chi2inv95(10), None);
        assert_eq!(gating_threshold(true), 5.9915);
        assert_eq!(gating_threshold(false), 9.4877);
    }
}
