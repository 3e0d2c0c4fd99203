//! Kalman filter for bounding-box tracks: initiate, predict, project, update.
//!
//! # Design choices
//! - A **linear KF** with a constant-velocity (CV) motion model and a unit
//!   time step (one frame).
//! - All math is `f64` on fixed-size `nalgebra` matrices, so nothing on the
//!   per-frame, per-track path allocates.
//! - The posterior update solves against the Cholesky factor of the projected
//!   covariance; no explicit inverse is ever formed.
//! - The `MotionModel` trait is the seam for alternative motion models.
//!
//! ## State vector
//! x = [cx, cy, a, h, vx, vy, va, vh]ᵀ  (8-dimensional)
//!
//! ## CV Transition model
//! F = I₈ + dt * [[0₄ I₄]; [0₄ 0₄]]
//!
//! ## Noise model
//! Standard deviations scale with the box height h, except the aspect-ratio
//! terms which are small constants. Q and R are diagonal.

use crate::{
    error::{FilterError, Result},
    types::{
        KalmanState, MeasCov, MeasVec, ObservationMatrix, StateCov, StateVec, MEAS_DIM,
        STATE_DIM,
    },
};
use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Aspect-ratio position std (initial covariance and process noise).
pub const ASPECT_STD: f64 = 1e-2;
/// Aspect-ratio velocity std (initial covariance and process noise).
pub const ASPECT_VELOCITY_STD: f64 = 1e-5;
/// Aspect-ratio measurement noise std.
pub const ASPECT_MEASUREMENT_STD: f64 = 1e-1;

/// Initial position std is this multiple of the position weight × height.
const INIT_POSITION_FACTOR: f64 = 2.0;
/// Initial velocity std is this multiple of the velocity weight × height.
const INIT_VELOCITY_FACTOR: f64 = 10.0;

/// Relative tolerance when checking covariance symmetry.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Relative tolerance on the smallest posterior eigenvalue.
const PSD_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Noise weights for the box filter. Every std that depends on the object
/// scale is `weight × height`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Position std per unit of box height.
    pub std_weight_position: f64,
    /// Velocity std per unit of box height.
    pub std_weight_velocity: f64,
    /// Multiplier on the velocity std in the process noise. Matches the
    /// factor used for the initial velocity covariance.
    pub predict_velocity_scale: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
            predict_velocity_scale: INIT_VELOCITY_FACTOR,
        }
    }
}

impl NoiseConfig {
    /// Reject weights that would poison every covariance they touch.
    pub fn validate(&self) -> Result<()> {
        let weights = [
            self.std_weight_position,
            self.std_weight_velocity,
            self.predict_velocity_scale,
        ];
        if weights.iter().all(|w| w.is_finite()) {
            Ok(())
        } else {
            Err(FilterError::NonFinite {
                what: "noise config",
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Motion model
// ---------------------------------------------------------------------------

/// Provides the transition matrix and process noise for one predict step.
pub trait MotionModel {
    /// State transition matrix F.
    fn transition_matrix(&self) -> StateCov;

    /// Per-component process noise std, evaluated at the current mean.
    fn process_noise_std(&self, mean: &StateVec, noise: &NoiseConfig) -> [f64; STATE_DIM];
}

/// Constant-velocity motion with a fixed time step (one frame by default).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstantVelocity {
    pub dt: f64,
}

impl Default for ConstantVelocity {
    fn default() -> Self {
        Self { dt: 1.0 }
    }
}

impl MotionModel for ConstantVelocity {
    fn transition_matrix(&self) -> StateCov {
        motion_matrix(self.dt)
    }

    fn process_noise_std(&self, mean: &StateVec, noise: &NoiseConfig) -> [f64; STATE_DIM] {
        let h = mean[3];
        let pos = noise.std_weight_position * h;
        let vel = noise.predict_velocity_scale * noise.std_weight_velocity * h;
        [pos, pos, ASPECT_STD, pos, vel, vel, ASPECT_VELOCITY_STD, vel]
    }
}

// ---------------------------------------------------------------------------
// Matrix helpers
// ---------------------------------------------------------------------------

/// Build the CV transition matrix F for timestep dt.
pub fn motion_matrix(dt: f64) -> StateCov {
    let mut f = StateCov::identity();
    // position += velocity * dt
    for i in 0..MEAS_DIM {
        f[(i, MEAS_DIM + i)] = dt;
    }
    f
}

/// Observation matrix H: picks [x, y, a, h] out of the state.
pub fn update_matrix() -> ObservationMatrix {
    let mut h = ObservationMatrix::zeros();
    for i in 0..MEAS_DIM {
        h[(i, i)] = 1.0;
    }
    h
}

/// Diagonal covariance from a vector of standard deviations.
pub fn diag_from_std<const D: usize>(std: [f64; D]) -> SMatrix<f64, D, D> {
    SMatrix::from_diagonal(&SVector::from(std.map(|s| s * s)))
}

fn check_finite<const R: usize, const C: usize>(
    m: &SMatrix<f64, R, C>,
    what: &'static str,
) -> Result<()> {
    if m.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(FilterError::NonFinite { what })
    }
}

fn check_symmetric(cov: &StateCov, what: &'static str) -> Result<()> {
    let scale = cov.amax().max(1.0);
    if (cov - cov.transpose()).amax() > SYMMETRY_TOLERANCE * scale {
        return Err(FilterError::NotSymmetric { what });
    }
    Ok(())
}

/// Input checks shared by every operation that takes a (mean, covariance).
pub(crate) fn validate_state(mean: &StateVec, cov: &StateCov) -> Result<()> {
    check_finite(mean, "state mean")?;
    check_finite(cov, "state covariance")?;
    check_symmetric(cov, "state covariance")
}

pub(crate) fn validate_measurement(z: &MeasVec) -> Result<()> {
    check_finite(z, "measurement")
}

fn check_posterior(cov: &StateCov) -> Result<()> {
    for i in 0..STATE_DIM {
        let value = cov[(i, i)];
        if !value.is_finite() || value < 0.0 {
            warn!(index = i, value, "posterior covariance lost positive semi-definiteness");
            return Err(FilterError::NegativeVariance {
                what: "posterior covariance",
                index: i,
                value,
            });
        }
    }
    check_finite(cov, "posterior covariance")?;
    if cov.cholesky().is_some() {
        return Ok(());
    }

    // Singular but PSD is still acceptable
    let min_eigen = cov.symmetric_eigenvalues().min();
    if min_eigen < -PSD_TOLERANCE * cov.amax().max(1.0) {
        warn!(min_eigen, "posterior covariance is indefinite");
        return Err(FilterError::NotPositiveDefinite {
            what: "posterior covariance",
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Result of a KF update step, with the intermediates exposed for debugging.
#[derive(Clone, Debug)]
pub struct KfUpdateResult {
    pub mean: StateVec,
    pub cov: StateCov,
    /// Innovation ν = z − H·x
    pub innovation: MeasVec,
    /// Innovation covariance S = H·P·Hᵀ + R
    pub innovation_cov: MeasCov,
    /// Kalman gain K
    pub kalman_gain: SMatrix<f64, STATE_DIM, MEAS_DIM>,
}

/// Box Kalman filter. Holds only configuration: every operation is a pure
/// function of its arguments, so one instance can serve every track, on any
/// thread.
#[derive(Clone, Debug)]
pub struct BoxKalmanFilter<M = ConstantVelocity> {
    pub config: NoiseConfig,
    pub model: M,
}

impl BoxKalmanFilter<ConstantVelocity> {
    pub fn new(config: NoiseConfig) -> Self {
        Self::with_model(config, ConstantVelocity::default())
    }
}

impl Default for BoxKalmanFilter<ConstantVelocity> {
    fn default() -> Self {
        Self::new(NoiseConfig::default())
    }
}

impl<M: MotionModel> BoxKalmanFilter<M> {
    pub fn with_model(config: NoiseConfig, model: M) -> Self {
        Self { config, model }
    }

    /// Measurement noise R at the given mean.
    pub fn measurement_noise(&self, mean: &StateVec) -> MeasCov {
        let pos = self.config.std_weight_position * mean[3];
        diag_from_std([pos, pos, ASPECT_MEASUREMENT_STD, pos])
    }

    /// Create a track state from an unassociated measurement. Velocities
    /// start at zero with a wide, height-proportional uncertainty.
    pub fn initiate(&self, measurement: &MeasVec) -> Result<KalmanState> {
        validate_measurement(measurement)?;
        let h = measurement[3];
        if h <= 0.0 {
            return Err(FilterError::NonPositiveHeight { height: h });
        }

        let mut mean = StateVec::zeros();
        mean.fixed_rows_mut::<MEAS_DIM>(0).copy_from(measurement);

        let pos = INIT_POSITION_FACTOR * self.config.std_weight_position * h;
        let vel = INIT_VELOCITY_FACTOR * self.config.std_weight_velocity * h;
        let cov = diag_from_std([pos, pos, ASPECT_STD, pos, vel, vel, ASPECT_VELOCITY_STD, vel]);

        Ok(KalmanState::new(mean, cov))
    }

    /// Predict state and covariance one step forward.
    pub fn predict(&self, mean: &StateVec, cov: &StateCov) -> Result<(StateVec, StateCov)> {
        validate_state(mean, cov)?;
        let f = self.model.transition_matrix();
        let q = diag_from_std(self.model.process_noise_std(mean, &self.config));
        let predicted_mean = f * mean;
        let predicted_cov = f * cov * f.transpose() + q;
        Ok((predicted_mean, predicted_cov))
    }

    /// Project the state distribution into measurement space (H·x, H·P·Hᵀ + R).
    pub fn project(&self, mean: &StateVec, cov: &StateCov) -> Result<(MeasVec, MeasCov)> {
        validate_state(mean, cov)?;
        let h = update_matrix();
        let r = self.measurement_noise(mean);
        Ok((h * mean, h * cov * h.transpose() + r))
    }

    /// Fuse a measurement into the state.
    pub fn update(
        &self,
        mean: &StateVec,
        cov: &StateCov,
        measurement: &MeasVec,
    ) -> Result<(StateVec, StateCov)> {
        let res = self.update_detailed(mean, cov, measurement)?;
        Ok((res.mean, res.cov))
    }

    /// Same as [`update`](Self::update), also returning innovation, innovation
    /// covariance and gain.
    pub fn update_detailed(
        &self,
        mean: &StateVec,
        cov: &StateCov,
        measurement: &MeasVec,
    ) -> Result<KfUpdateResult> {
        validate_measurement(measurement)?;
        let (projected_mean, projected_cov) = self.project(mean, cov)?;

        let chol = projected_cov.cholesky().ok_or_else(|| {
            warn!("projected covariance is not positive definite");
            FilterError::NotPositiveDefinite {
                what: "projected covariance",
            }
        })?;

        // Kalman gain: K = P·Hᵀ·S⁻¹, i.e. Kᵀ = S⁻¹·(H·P) solved with the factor
        let pht = cov * update_matrix().transpose();
        let kalman_gain = chol.solve(&pht.transpose()).transpose();

        // Innovation: ν = z − H·x
        let innovation = measurement - projected_mean;

        let new_mean = mean + kalman_gain * innovation;
        let new_cov = cov - kalman_gain * projected_cov * kalman_gain.transpose();
        // Round-off in the product above leaves tiny asymmetries
        let new_cov = (new_cov + new_cov.transpose()) * 0.5;
        check_posterior(&new_cov)?;

        Ok(KfUpdateResult {
            mean: new_mean,
            cov: new_cov,
            innovation,
            innovation_cov: projected_cov,
            kalman_gain,
        })
    }

    /// Predict a whole [`KalmanState`] in place.
    pub fn predict_state(&self, state: &mut KalmanState) -> Result<()> {
        let (mean, cov) = self.predict(&state.mean, &state.cov)?;
        state.mean = mean;
        state.cov = cov;
        Ok(())
    }

    /// Fuse a measurement into a whole [`KalmanState`] in place. On error the
    /// state is left untouched.
    pub fn update_state(&self, state: &mut KalmanState, measurement: &MeasVec) -> Result<()> {
        let (mean, cov) = self.update(&state.mean, &state.cov, measurement)?;
        state.mean = mean;
        state.cov = cov;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
