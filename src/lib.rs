//! Arcade Drive - stylized ground-vehicle locomotion
//!
//! Core modules:
//! - `sim`: Deterministic per-frame vehicle dynamics and wheel kinematics
//! - `tuning`: Live-tunable parameter records with named access and JSON persistence
//! - `platform`: Key bindings that turn device input into per-tick control state

pub mod platform;
pub mod sim;
pub mod tuning;

pub use tuning::{PhysicsParameters, Tuning, TuningError, WheelParameters};

use glam::{DQuat, DVec3};

/// Simulation constants
pub mod consts {
    /// Reference rate that all per-tick forces are scaled against
    pub const REFERENCE_HZ: f64 = 60.0;
    /// Fixed timestep used by the headless driver
    pub const SIM_DT: f64 = 1.0 / REFERENCE_HZ;

    /// Speed below which the vehicle counts as stopped and directions are undefined
    pub const STOP_EPSILON: f64 = 0.001;
    /// Speed above which the full steering curve applies
    pub const STEERING_SPEED_THRESHOLD: f64 = 0.05;
    /// Speed above which turning injects drift
    pub const DRIFT_SPEED_THRESHOLD: f64 = 0.3;
    /// Speed above which drift is amplified
    pub const HIGH_DRIFT_SPEED: f64 = 0.7;
    /// Below this speed heading changes are damped further
    pub const LOW_SPEED_TURN_LIMIT: f64 = 0.3;

    /// Weight of the new frame time in the jitter filter
    pub const DT_BLEND: f64 = 0.2;

    /// Display conversion: `speed * 100 / 2` km/h (20 units ~ 100 km/h)
    pub const KPH_PER_UNIT: f64 = 50.0;
}

/// Local forward axis (+Z) before heading rotation
pub const FORWARD: DVec3 = DVec3::Z;
/// Local lateral axis (+X, the left-hand side when facing +Z) before heading rotation
pub const LATERAL: DVec3 = DVec3::X;

/// Forward direction for a heading (yaw about +Y)
#[inline]
pub fn heading_vector(yaw: f64) -> DVec3 {
    DQuat::from_rotation_y(yaw) * FORWARD
}

/// Lateral direction for a heading (yaw about +Y)
#[inline]
pub fn lateral_vector(yaw: f64) -> DVec3 {
    DQuat::from_rotation_y(yaw) * LATERAL
}

/// Wrap an angle to [0, 2π)
#[inline]
pub fn wrap_angle_positive(angle: f64) -> f64 {
    use std::f64::consts::TAU;
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Speed in display km/h, rounded like the HUD readout
#[inline]
pub fn display_kph(speed: f64) -> i64 {
    (speed * consts::KPH_PER_UNIT).round() as i64
}
