//! Data-parallel helpers over many tracks.
//!
//! Each track owns its (mean, covariance) and the filter is read-only, so
//! predicting and gating distinct tracks needs no locking. Results keep the
//! input order; the first failing track aborts the whole batch.

use crate::{
    error::Result,
    kf::{BoxKalmanFilter, MotionModel},
    types::{KalmanState, MeasVec},
};
use rayon::prelude::*;
use tracing::debug;

/// Predict every track one step forward.
pub fn predict_all<M>(
    filter: &BoxKalmanFilter<M>,
    states: &[KalmanState],
) -> Result<Vec<KalmanState>>
where
    M: MotionModel + Sync,
{
    debug!(tracks = states.len(), "predicting tracks");
    states
        .par_iter()
        .map(|s| {
            filter
                .predict(&s.mean, &s.cov)
                .map(|(mean, cov)| KalmanState::new(mean, cov))
        })
        .collect()
}

/// Gating distances for every (track, measurement) pair: one row per track,
/// one column per measurement.
pub fn gating_matrix<M>(
    filter: &BoxKalmanFilter<M>,
    states: &[KalmanState],
    measurements: &[MeasVec],
    only_position: bool,
) -> Result<Vec<Vec<f64>>>
where
    M: MotionModel + Sync,
{
    debug!(
        tracks = states.len(),
        measurements = measurements.len(),
        only_position,
        "computing gating matrix"
    );
    states
        .par_iter()
        .map(|s| filter.gating_distance(&s.mean, &s.cov, measurements, only_position))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::types::StateCov;

    fn tracks(kf: &BoxKalmanFilter) -> Vec<KalmanState> {
        (0..64)
            .map(|i| {
                let t = i as f64;
                kf.initiate(&MeasVec::new(10.0 * t, 5.0 * t, 0.5, 40.0 + t))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn parallel_predict_matches_sequential() {
        let kf = BoxKalmanFilter::default();
        let states = tracks(&kf);

        let predicted = predict_all(&kf, &states).unwrap();
        assert_eq!(predicted.len(), states.len());
        for (p, s) in predicted.iter().zip(&states) {
            let (mean, cov) = kf.predict(&s.mean, &s.cov).unwrap();
            assert_eq!(p.mean, mean);
            assert_eq!(p.cov, cov);
        }
    }

    #[test]
    fn gating_matrix_rows_follow_tracks() {
        let kf = BoxKalmanFilter::default();
        let states = tracks(&kf);
        let measurements: Vec<MeasVec> = states.iter().take(3).map(|s| s.xyah()).collect();

        let m = gating_matrix(&kf, &states, &measurements, false).unwrap();
        assert_eq!(m.len(), states.len());
        for (i, row) in m.iter().take(3).enumerate() {
            assert_eq!(row.len(), 3);
            assert!(row[i] < 1e-12);
        }
    }

    #[test]
    fn one_corrupted_track_fails_the_batch() {
        let kf = BoxKalmanFilter::default();
        let mut states = tracks(&kf);
        states[17].cov = StateCov::identity() * f64::NAN;

        assert!(matches!(
            predict_all(&kf, &states),
            Err(FilterError::NonFinite { .. })
        ));
    }
}
