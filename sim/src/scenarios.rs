//! Scenario definitions.
//!
//! Each scenario is a named set of box targets plus detector settings.
//! All scenarios are deterministic given the same seed.

use crate::{
    detector::DetectorParams,
    target::{BoxTarget, MotionSpec},
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Which pre-defined scenario to load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// One pedestrian walking across a 1080p frame
    Single,
    /// 6 targets on crossing paths, some accelerating
    Crossing,
    /// 3 targets approaching / receding from the camera
    Zoom,
    /// 200 targets with staggered entry and exit, lower detection rate
    Crowd,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    /// Number of frames to simulate
    pub frames: u64,
    pub targets: Vec<BoxTarget>,
    pub detector: DetectorParams,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        match kind {
            ScenarioKind::Single => Self::single(seed),
            ScenarioKind::Crossing => Self::crossing(seed),
            ScenarioKind::Zoom => Self::zoom(seed),
            ScenarioKind::Crowd => Self::crowd(seed),
        }
    }

    fn single(seed: u64) -> Self {
        Self {
            name: "single".into(),
            seed,
            frames: 300,
            targets: vec![BoxTarget::new(
                0,
                [100.0, 540.0, 0.41, 180.0],
                [5.0, 0.5, 0.0, 0.0],
                MotionSpec::ConstantVelocity,
            )],
            detector: DetectorParams::default(),
        }
    }

    fn crossing(seed: u64) -> Self {
        let targets = vec![
            BoxTarget::new(
                0,
                [100.0, 300.0, 0.4, 150.0],
                [6.0, 1.0, 0.0, 0.0],
                MotionSpec::ConstantVelocity,
            ),
            BoxTarget::new(
                1,
                [1800.0, 300.0, 0.4, 150.0],
                [-6.0, 1.0, 0.0, 0.0],
                MotionSpec::ConstantVelocity,
            ),
            BoxTarget::new(
                2,
                [960.0, 50.0, 0.5, 120.0],
                [0.0, 4.0, 0.0, 0.2],
                MotionSpec::ConstantVelocity,
            ),
            BoxTarget::new(
                3,
                [200.0, 800.0, 0.45, 200.0],
                [2.0, -2.0, 0.0, 0.0],
                MotionSpec::ConstantAccel { ax: 0.05, ay: 0.0 },
            ),
            BoxTarget::new(
                4,
                [1700.0, 800.0, 0.45, 200.0],
                [-2.0, -2.0, 0.0, 0.0],
                MotionSpec::ConstantAccel { ax: -0.05, ay: 0.01 },
            ),
            BoxTarget::new(
                5,
                [960.0, 1000.0, 0.6, 90.0],
                [0.0, -3.0, 0.0, -0.1],
                MotionSpec::ConstantVelocity,
            )
            .visible_between(Some(60), None),
        ];
        Self {
            name: "crossing".into(),
            seed,
            frames: 250,
            targets,
            detector: DetectorParams::default(),
        }
    }

    fn zoom(seed: u64) -> Self {
        let targets = vec![
            BoxTarget::new(
                0,
                [960.0, 540.0, 0.5, 40.0],
                [0.5, 0.0, 0.0, 0.0],
                MotionSpec::Zooming { rate: 0.01 },
            ),
            BoxTarget::new(
                1,
                [500.0, 600.0, 0.5, 400.0],
                [-0.5, 0.0, 0.0, 0.0],
                MotionSpec::Zooming { rate: -0.008 },
            ),
            BoxTarget::new(
                2,
                [1400.0, 500.0, 1.2, 60.0],
                [0.0, 0.3, 0.0, 0.0],
                MotionSpec::Zooming { rate: 0.005 },
            ),
        ];
        Self {
            name: "zoom".into(),
            seed,
            frames: 200,
            targets,
            detector: DetectorParams::default(),
        }
    }

    fn crowd(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let frames = 400;
        let targets = (0..200)
            .map(|id| {
                let h = 40.0 + rng.gen::<f64>() * 160.0;
                let xyah = [
                    rng.gen::<f64>() * 1920.0,
                    rng.gen::<f64>() * 1080.0,
                    0.35 + rng.gen::<f64>() * 0.3,
                    h,
                ];
                let velocity = [
                    rng.gen::<f64>() * 8.0 - 4.0,
                    rng.gen::<f64>() * 4.0 - 2.0,
                    0.0,
                    0.0,
                ];
                let appear = rng.gen_range(0..frames / 2);
                let disappear = appear + rng.gen_range(50..frames / 2);
                BoxTarget::new(id, xyah, velocity, MotionSpec::ConstantVelocity)
                    .visible_between(Some(appear), Some(disappear))
            })
            .collect();
        Self {
            name: "crowd".into(),
            seed,
            frames,
            targets,
            detector: DetectorParams {
                p_detection: 0.75,
                ..DetectorParams::default()
            },
        }
    }
}
