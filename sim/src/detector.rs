//! Noisy object-detector simulator.
//!
//! Generates one batch of box detections per frame with:
//! - Miss probability (1 - P_D)
//! - Uniform centre/height noise proportional to the box height
//! - Fixed-width aspect-ratio noise

use crate::target::BoxTarget;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Detector characteristics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DetectorParams {
    /// Probability a visible target is detected
    pub p_detection: f64,
    /// Half-width of the centre/height noise, as a fraction of box height
    pub position_noise: f64,
    /// Half-width of the aspect-ratio noise
    pub aspect_noise: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            p_detection: 0.9,
            position_noise: 0.05,
            aspect_noise: 0.02,
        }
    }
}

/// A single box detection. `target_id` is the ground-truth label, used in
/// place of an association stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Detection {
    pub target_id: u64,
    /// [x, y, a, h]
    pub xyah: [f64; 4],
}

/// All detections reported for one video frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub frame: u64,
    pub detections: Vec<Detection>,
}

/// Generates detection frames from a set of targets.
pub struct DetectorSimulator {
    pub params: DetectorParams,
    rng: ChaCha8Rng,
}

impl DetectorSimulator {
    pub fn new(params: DetectorParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform sample in [-half_width, half_width].
    fn noise(&mut self, half_width: f64) -> f64 {
        self.rng.gen::<f64>() * half_width * 2.0 - half_width
    }

    /// Detect every visible target in `frame`.
    pub fn detect(&mut self, frame: u64, targets: &[BoxTarget]) -> DetectionFrame {
        let mut detections = Vec::new();

        for target in targets {
            if !target.is_active(frame) {
                continue;
            }
            // Miss detection?
            if self.rng.gen::<f64>() > self.params.p_detection {
                continue;
            }

            let [x, y, a, h, ..] = target.state;
            let sigma = self.params.position_noise * h;
            let aspect_sigma = self.params.aspect_noise;
            let xyah = [
                x + self.noise(sigma),
                y + self.noise(sigma),
                (a + self.noise(aspect_sigma)).max(1e-3),
                (h + self.noise(sigma)).max(1.0),
            ];
            detections.push(Detection {
                target_id: target.id,
                xyah,
            });
        }

        DetectionFrame { frame, detections }
    }
}
