//! Wheel spin and steering visuals
//!
//! Purely derived from the vehicle state: nothing here feeds back into the
//! dynamics. The asset loader hands over wheel nodes through a [`WheelRig`];
//! until every wheel and both front steering mounts are present the
//! kinematics stay inert.

use super::control::ControlState;
use super::state::{SteeringMount, VehicleState, WheelSlot, WheelState};
use crate::consts::{REFERENCE_HZ, STOP_EPSILON};
use crate::tuning::{TuningError, WheelParameters};

/// Collects wheel node handles as the asset loader finds them
#[derive(Debug, Clone)]
pub struct WheelRig<H> {
    wheels: [Option<H>; 4],
    mounts: [Option<H>; 2],
}

impl<H> Default for WheelRig<H> {
    fn default() -> Self {
        Self {
            wheels: [None, None, None, None],
            mounts: [None, None],
        }
    }
}

impl<H> WheelRig<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_wheel(&mut self, slot: WheelSlot, handle: H) -> &mut Self {
        self.wheels[slot.index()] = Some(handle);
        self
    }

    pub fn set_mount(&mut self, mount: SteeringMount, handle: H) -> &mut Self {
        self.mounts[mount.index()] = Some(handle);
        self
    }

    /// Offer a named node; returns the slot it filled, if the name is a wheel
    pub fn offer_node(&mut self, name: &str, handle: H) -> Option<WheelSlot> {
        let slot = WheelSlot::from_node_name(name)?;
        self.set_wheel(slot, handle);
        Some(slot)
    }

    /// Wheel slots still waiting for a node
    pub fn missing_wheels(&self) -> impl Iterator<Item = WheelSlot> + '_ {
        WheelSlot::ALL
            .into_iter()
            .filter(|slot| self.wheels[slot.index()].is_none())
    }

    /// Freeze into a resolved rig once all six nodes are present
    pub fn resolve(self) -> Result<ResolvedRig<H>, Self> {
        match (self.wheels, self.mounts) {
            ([Some(fl), Some(fr), Some(rl), Some(rr)], [Some(ml), Some(mr)]) => Ok(ResolvedRig {
                wheels: [fl, fr, rl, rr],
                mounts: [ml, mr],
            }),
            (wheels, mounts) => Err(Self { wheels, mounts }),
        }
    }
}

/// All four wheels plus both front steering mounts
#[derive(Debug, Clone)]
pub struct ResolvedRig<H> {
    wheels: [H; 4],
    mounts: [H; 2],
}

impl<H> ResolvedRig<H> {
    pub fn wheel(&self, slot: WheelSlot) -> &H {
        &self.wheels[slot.index()]
    }

    pub fn mount(&self, mount: SteeringMount) -> &H {
        &self.mounts[mount.index()]
    }
}

/// Which rotation a renderer should write on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseChannel {
    /// Rotation about the axle
    Spin,
    /// Rotation about the vertical axis of a steering mount
    Steer,
}

/// Derives wheel visuals from the vehicle each frame
#[derive(Debug, Clone)]
pub struct WheelKinematics<H> {
    params: WheelParameters,
    rig: Option<ResolvedRig<H>>,
    state: WheelState,
}

impl<H> WheelKinematics<H> {
    pub fn new(params: WheelParameters) -> Self {
        Self {
            params,
            rig: None,
            state: WheelState::default(),
        }
    }

    /// One-shot readiness signal from the asset loader
    pub fn attach(&mut self, rig: ResolvedRig<H>) {
        log::debug!("Wheel rig attached");
        self.rig = Some(rig);
    }

    pub fn is_ready(&self) -> bool {
        self.rig.is_some()
    }

    pub fn state(&self) -> &WheelState {
        &self.state
    }

    pub fn parameters(&self) -> &WheelParameters {
        &self.params
    }

    pub fn parameters_mut(&mut self) -> &mut WheelParameters {
        &mut self.params
    }

    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.params.get(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), TuningError> {
        self.params.set(name, value)
    }

    /// Zero spin and steering (vehicle respawned)
    pub fn respawn(&mut self) {
        self.state = WheelState::default();
    }

    /// Angular speed the wheels are easing toward for this vehicle state
    pub fn target_angular_speed(&self, vehicle: &VehicleState) -> f64 {
        let speed = vehicle.speed();
        if speed < STOP_EPSILON || self.params.wheel_radius <= 0.0 {
            return 0.0;
        }
        // v = ωr, exaggerated so the spin reads on screen
        let magnitude = speed / self.params.wheel_radius * self.params.wheel_speed_multiplier;
        if vehicle.forward().dot(vehicle.velocity) > 0.0 {
            magnitude
        } else {
            -magnitude
        }
    }

    /// Advance one frame; `vehicle` must already be stepped for this tick
    pub fn step(&mut self, dt: f64, vehicle: &VehicleState, control: &ControlState) {
        if self.rig.is_none() || !dt.is_finite() {
            return;
        }
        let dt = dt.max(0.0);
        let ticks = dt * REFERENCE_HZ;

        let target = self.target_angular_speed(vehicle);
        let ease = (1.0 - self.params.wheel_inertia.powf(ticks)).clamp(0.0, 1.0);
        self.state.angular_speed += (target - self.state.angular_speed) * ease;

        // Absolute accumulators instead of repeated relative rotations
        let delta = self.state.angular_speed * dt;
        for spin in &mut self.state.spin {
            *spin += delta;
        }

        // Same convention in reverse: left means left
        let target_angle = control.turn_input() * self.params.max_steering_angle;
        let follow = (self.params.steering_speed * ticks).clamp(0.0, 1.0);
        self.state.steering_angle += (target_angle - self.state.steering_angle) * follow;

        if vehicle.speed() > 0.05 {
            log::trace!(
                "wheels {:.3} target {:.3}",
                self.state.angular_speed,
                target
            );
        }
    }

    /// Node handles paired with the angle to apply this frame
    pub fn poses(&self) -> impl Iterator<Item = (&H, PoseChannel, f64)> + '_ {
        let state = self.state;
        self.rig.iter().flat_map(move |rig| {
            let spins = WheelSlot::ALL
                .into_iter()
                .map(move |slot| (rig.wheel(slot), PoseChannel::Spin, state.spin_of(slot)));
            let steers = SteeringMount::ALL
                .into_iter()
                .map(move |mount| (rig.mount(mount), PoseChannel::Steer, state.steering_angle));
            spins.chain(steers)
        })
    }
}
