//! Ground-truth box trajectories.
//!
//! Each target has a true state [x, y, a, h, vx, vy, va, vh] in pixels per
//! frame and a `MotionSpec` describing how it moves. The simulator steps each
//! target one frame at a time.

use serde::{Deserialize, Serialize};
use tracker_core::MeasVec;

/// Smallest box height a target may shrink to.
const MIN_HEIGHT: f64 = 4.0;

/// Describes target motion from frame to frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Constant velocity in every component.
    ConstantVelocity,
    /// Constant acceleration of the box centre, in pixels/frame².
    ConstantAccel { ax: f64, ay: f64 },
    /// Object approaching or receding: height changes by `rate` (relative)
    /// each frame while the centre moves at constant velocity.
    Zooming { rate: f64 },
}

/// A simulated object with ground-truth box state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoxTarget {
    /// Unique target ID (also used as the association label)
    pub id: u64,
    /// True state [x, y, a, h, vx, vy, va, vh]
    pub state: [f64; 8],
    pub motion: MotionSpec,
    /// Optional: first frame the target is visible
    pub appear_at: Option<u64>,
    /// Optional: target disappears at this frame
    pub disappear_at: Option<u64>,
}

impl BoxTarget {
    pub fn new(id: u64, xyah: [f64; 4], velocity: [f64; 4], motion: MotionSpec) -> Self {
        let [x, y, a, h] = xyah;
        let [vx, vy, va, vh] = velocity;
        Self {
            id,
            state: [x, y, a, h, vx, vy, va, vh],
            motion,
            appear_at: None,
            disappear_at: None,
        }
    }

    pub fn visible_between(mut self, appear_at: Option<u64>, disappear_at: Option<u64>) -> Self {
        self.appear_at = appear_at;
        self.disappear_at = disappear_at;
        self
    }

    /// Propagate the true state by one frame.
    pub fn step(&mut self) {
        let s = &mut self.state;
        match self.motion {
            MotionSpec::ConstantVelocity => {
                for i in 0..4 {
                    s[i] += s[i + 4];
                }
            }
            MotionSpec::ConstantAccel { ax, ay } => {
                s[0] += s[4] + 0.5 * ax;
                s[1] += s[5] + 0.5 * ay;
                s[2] += s[6];
                s[3] += s[7];
                s[4] += ax;
                s[5] += ay;
            }
            MotionSpec::Zooming { rate } => {
                s[0] += s[4];
                s[1] += s[5];
                s[2] += s[6];
                s[7] = s[3] * rate;
                s[3] += s[7];
            }
        }
        s[3] = s[3].max(MIN_HEIGHT);
    }

    /// True if the target is in view at `frame`.
    pub fn is_active(&self, frame: u64) -> bool {
        if self.appear_at.is_some_and(|appear| frame < appear) {
            return false;
        }
        if self.disappear_at.is_some_and(|disappear| frame >= disappear) {
            return false;
        }
        true
    }

    /// True box as [x, y, a, h].
    pub fn xyah(&self) -> MeasVec {
        MeasVec::new(self.state[0], self.state[1], self.state[2], self.state[3])
    }
}
