//! Per-frame session tick
//!
//! Advances the vehicle, then the wheels, in that order: wheel visuals are
//! derived from the state the dynamics just produced.

use glam::DVec3;

use super::control::ControlState;
use super::state::{Telemetry, VehicleState};
use super::vehicle::VehicleDynamics;
use super::wheels::WheelKinematics;
use crate::tuning::{Tuning, TuningError};

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    pub control: ControlState,
    /// Respawn the vehicle before stepping (one-shot)
    pub reset: bool,
}

impl From<ControlState> for TickInput {
    fn from(control: ControlState) -> Self {
        Self {
            control,
            reset: false,
        }
    }
}

/// One vehicle with its wheels, stepped together
#[derive(Debug, Clone)]
pub struct DriveSession<H> {
    pub vehicle: VehicleDynamics,
    pub wheels: WheelKinematics<H>,
    /// Ticks advanced since the session started
    pub time_ticks: u64,
}

impl<H> DriveSession<H> {
    /// Session with no body yet; call [`VehicleDynamics::spawn`] when the model is placed
    pub fn new(tuning: Tuning) -> Self {
        Self {
            vehicle: VehicleDynamics::new(tuning.physics),
            wheels: WheelKinematics::new(tuning.wheels),
            time_ticks: 0,
        }
    }

    pub fn spawned(tuning: Tuning, spawn: DVec3) -> Self {
        let mut session = Self::new(tuning);
        session.vehicle.spawn(spawn);
        session
    }

    /// Respawn vehicle and wheels
    pub fn reset(&mut self) {
        self.vehicle.reset();
        self.wheels.respawn();
    }

    pub fn vehicle_state(&self) -> Option<VehicleState> {
        self.vehicle.state()
    }

    pub fn telemetry(&self) -> Option<Telemetry> {
        self.vehicle.state_ref().map(VehicleState::telemetry)
    }

    /// Current parameters of both records
    pub fn tuning(&self) -> Tuning {
        Tuning {
            physics: *self.vehicle.parameters(),
            wheels: *self.wheels.parameters(),
        }
    }

    /// Swap in a whole tuning set between ticks
    pub fn apply_tuning(&mut self, tuning: Tuning) {
        *self.vehicle.parameters_mut() = tuning.physics;
        *self.wheels.parameters_mut() = tuning.wheels;
    }

    /// Set a vehicle or wheel parameter by name
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), TuningError> {
        match self.vehicle.set_parameter(name, value) {
            Err(TuningError::UnknownParameter(_)) => self.wheels.set_parameter(name, value),
            other => other,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.vehicle
            .parameter(name)
            .or_else(|| self.wheels.parameter(name))
    }
}

/// Advance the session by one frame of `dt` seconds
pub fn tick<H>(session: &mut DriveSession<H>, input: &TickInput, dt: f64) {
    if input.reset {
        session.reset();
    }

    session.vehicle.step(dt, &input.control);
    let Some(state) = session.vehicle.state_ref() else {
        return;
    };
    session.wheels.step(dt, state, &input.control);
    session.time_ticks += 1;
}
