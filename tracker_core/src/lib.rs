//! `tracker_core` — per-track state estimation for bounding-box tracking.
//!
//! # Module layout
//! - [`types`]   — State/measurement vectors, `KalmanState`, `BoundingBox`
//! - [`error`]   — `FilterError` and the crate `Result` alias
//! - [`kf`]      — Box Kalman filter (initiate / predict / project / update)
//! - [`gating`]  — Mahalanobis gating distance and the χ² threshold table
//! - [`batch`]   — Parallel predict / gating over many tracks
//! - [`metrics`] — RMSE and gating statistics

pub mod batch;
pub mod error;
pub mod gating;
pub mod kf;
pub mod metrics;
pub mod types;

pub use error::{FilterError, Result};
pub use gating::{chi2inv95, gating_threshold, within_gate, CHI2INV95};
pub use kf::{BoxKalmanFilter, ConstantVelocity, KfUpdateResult, MotionModel, NoiseConfig};
pub use types::{BoundingBox, KalmanState, MeasCov, MeasVec, StateCov, StateVec};
