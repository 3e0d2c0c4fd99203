//! `sim` — Scenario simulator: box trajectories, noisy detections, replay.

pub mod detector;
pub mod replay;
pub mod scenarios;
pub mod target;

pub use detector::{Detection, DetectionFrame, DetectorParams, DetectorSimulator};
pub use replay::{load_replay, record, save_replay, ReplayLog};
pub use scenarios::{Scenario, ScenarioKind};
pub use target::{BoxTarget, MotionSpec};
