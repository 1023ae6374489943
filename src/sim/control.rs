//! Per-tick driver intent

use serde::{Deserialize, Serialize};

/// Snapshot of the driver's controls for one tick (built by the caller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub accelerate: bool,
    pub brake: bool,
    pub reverse: bool,
    pub steer_left: bool,
    pub steer_right: bool,
}

impl ControlState {
    /// +1 for left, -1 for right, 0 when neither or both are held
    #[inline]
    pub fn turn_input(&self) -> f64 {
        let mut turn = 0.0;
        if self.steer_left {
            turn += 1.0;
        }
        if self.steer_right {
            turn -= 1.0;
        }
        turn
    }

    /// Whether any propulsion key (forward or backward) is held
    #[inline]
    pub fn wants_propulsion(&self) -> bool {
        self.accelerate || self.reverse
    }
}
