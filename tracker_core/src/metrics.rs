//! Tracking metrics: RMSE of box centre / height, gating statistics.

use crate::{
    gating::within_gate,
    types::{MeasVec, StateVec},
};
use serde::{Deserialize, Serialize};

/// Accumulated metric statistics.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrackingMetrics {
    /// Number of frames evaluated
    pub n_frames: u64,
    /// Number of (estimate, ground truth) pairs evaluated
    pub n_matched: u64,
    /// Sum of squared centre errors (for RMSE)
    pub sum_sq_center_err: f64,
    /// Sum of squared height errors (for RMSE)
    pub sum_sq_height_err: f64,
    /// Number of gating distances recorded
    pub n_gated: u64,
    /// Sum of recorded gating distances
    pub sum_gating_distance: f64,
    /// Gating distances inside the 95% gate
    pub gate_accepted: u64,
}

impl TrackingMetrics {
    /// Root-mean-square centre error (pixels).
    pub fn rmse_center(&self) -> f64 {
        if self.n_matched == 0 {
            return 0.0;
        }
        (self.sum_sq_center_err / self.n_matched as f64).sqrt()
    }

    /// Root-mean-square height error (pixels).
    pub fn rmse_height(&self) -> f64 {
        if self.n_matched == 0 {
            return 0.0;
        }
        (self.sum_sq_height_err / self.n_matched as f64).sqrt()
    }

    /// Average squared Mahalanobis distance of associated detections. For a
    /// well-tuned filter this sits near the measurement dimension.
    pub fn mean_gating_distance(&self) -> f64 {
        if self.n_gated == 0 {
            return 0.0;
        }
        self.sum_gating_distance / self.n_gated as f64
    }

    /// Fraction of associated detections that fell inside the gate.
    pub fn gate_acceptance_rate(&self) -> f64 {
        if self.n_gated == 0 {
            1.0
        } else {
            self.gate_accepted as f64 / self.n_gated as f64
        }
    }

    pub fn begin_frame(&mut self) {
        self.n_frames += 1;
    }

    /// Record the error of one estimate against its true box [x, y, a, h].
    pub fn record_estimate(&mut self, mean: &StateVec, truth: &MeasVec) {
        let dx = mean[0] - truth[0];
        let dy = mean[1] - truth[1];
        let dh = mean[3] - truth[3];
        self.sum_sq_center_err += dx * dx + dy * dy;
        self.sum_sq_height_err += dh * dh;
        self.n_matched += 1;
    }

    /// Record the gating distance of an associated detection.
    pub fn record_gating(&mut self, d2: f64, only_position: bool) {
        self.n_gated += 1;
        self.sum_gating_distance += d2;
        if within_gate(d2, only_position) {
            self.gate_accepted += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_metrics_are_neutral() {
        let m = TrackingMetrics::default();
        assert_eq!(m.rmse_center(), 0.0);
        assert_eq!(m.mean_gating_distance(), 0.0);
        assert_eq!(m.gate_acceptance_rate(), 1.0);
    }

    #[test]
    fn accumulates_errors_and_gating() {
        let mut m = TrackingMetrics::default();
        m.begin_frame();
        let mean = StateVec::from_column_slice(&[3.0, 4.0, 0.5, 102.0, 0.0, 0.0, 0.0, 0.0]);
        m.record_estimate(&mean, &MeasVec::new(0.0, 0.0, 0.5, 100.0));
        m.record_gating(2.0, false);
        m.record_gating(20.0, false);

        assert_abs_diff_eq!(m.rmse_center(), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.rmse_height(), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.mean_gating_distance(), 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.gate_acceptance_rate(), 0.5, epsilon = 1e-12);
    }
}
