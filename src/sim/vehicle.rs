//! Arcade vehicle dynamics
//!
//! One deterministic update per rendered frame. The stages run in a fixed
//! order and each reads what the previous one wrote:
//!
//! 1. frame-time stabilization
//! 2. frame axes from the current heading
//! 3. longitudinal force (brake > accelerate > reverse), smoothed
//! 4. speed-dependent steering rate
//! 5. steering inertia
//! 6. low-speed turning-radius (Ackermann) correction
//! 7. drift
//! 8. traction (lateral velocity decay)
//! 9. aerodynamic drag
//! 10. rolling friction / stop snap
//! 11. speed clamp
//! 12. ground contact and gravity
//! 13. position integration
//! 14. cosmetic tilt
//!
//! Speed and travel direction are sampled once at the start of the tick and
//! shape every coefficient below; direction vectors always come from the
//! current velocity.

use glam::DVec3;

use super::control::ControlState;
use super::state::VehicleState;
use crate::consts::*;
use crate::tuning::{PhysicsParameters, TuningError};
use crate::{heading_vector, lateral_vector};

/// Brake force relative to propulsion
const BRAKE_MULTIPLIER: f64 = 3.0;
/// Reverse force relative to propulsion
const REVERSE_POWER: f64 = 0.7;
/// Propulsion never fades below this share of full force
const MIN_PROPULSION: f64 = 0.2;
/// Travel direction below which steering flips for reversing
const REVERSE_STEER_THRESHOLD: f64 = -0.5;
/// Strength of the arc correction applied while turning slowly
const ARC_CORRECTION: f64 = 0.02;
/// Rate at which pitch/roll chase their targets, per reference tick
const TILT_RATE: f64 = 0.3;
/// Frame time assumed before the first step
const INITIAL_DT: f64 = 0.016;

/// Per-tick values shared by every stage
#[derive(Debug, Clone, Copy)]
struct Frame {
    dt: f64,
    /// `dt` expressed in reference ticks
    scaled: f64,
    heading: DVec3,
    lateral: DVec3,
    /// |velocity| at the start of the tick
    speed: f64,
    /// dot(heading, velocity direction) at the start of the tick
    travel_dir: f64,
    turn: f64,
}

/// A spawned vehicle body and its integrator memory
#[derive(Debug, Clone)]
struct Body {
    spawn: DVec3,
    state: VehicleState,
    dt_prev: f64,
    /// Last tick's unsmoothed longitudinal force
    force_prev: DVec3,
    /// Last tick's applied displacement
    movement_prev: DVec3,
}

impl Body {
    fn new(spawn: DVec3) -> Self {
        Self {
            spawn,
            state: VehicleState::at_spawn(spawn),
            dt_prev: INITIAL_DT,
            force_prev: DVec3::ZERO,
            movement_prev: DVec3::ZERO,
        }
    }

    fn reset(&mut self) {
        self.state = VehicleState::at_spawn(self.spawn);
        self.force_prev = DVec3::ZERO;
        self.movement_prev = DVec3::ZERO;
    }

    /// Stages 1-2
    fn begin_frame(&mut self, dt_raw: f64, control: &ControlState) -> Frame {
        let dt = DT_BLEND * dt_raw + (1.0 - DT_BLEND) * self.dt_prev;
        self.dt_prev = dt;

        let yaw = self.state.heading;
        Frame {
            dt,
            scaled: dt * REFERENCE_HZ,
            heading: heading_vector(yaw),
            lateral: lateral_vector(yaw),
            speed: self.state.speed(),
            travel_dir: self.state.travel_direction(),
            turn: control.turn_input(),
        }
    }

    /// Stage 3
    fn propel(&mut self, p: &PhysicsParameters, f: &Frame, control: &ControlState) {
        let push = p.acceleration * f.scaled;

        let mut force = DVec3::ZERO;
        if control.brake {
            // Brake suppresses propulsion even when there is nothing to slow down
            if f.speed > STOP_EPSILON {
                if let Some(dir) = self.state.velocity.try_normalize() {
                    force = -dir * push * BRAKE_MULTIPLIER;
                }
            }
        } else if control.accelerate {
            // Fades as speed approaches (a little beyond) the cap
            let fade = (1.0 - f.speed / (p.max_speed * 1.2)).max(MIN_PROPULSION);
            force = f.heading * (push * fade);
        } else if control.reverse {
            let fade = (1.0 - f.speed / (p.max_speed * REVERSE_POWER)).max(MIN_PROPULSION);
            // Gentler while still rolling forward
            let transition = if f.travel_dir < 0.0 { 1.0 } else { 0.5 };
            force = f.heading * (-push * REVERSE_POWER * fade * transition);
        }
        force *= inverse_mass(p);

        let smoothing = p.movement_smoothing * (1.0 + f.speed * 0.5);
        self.state.velocity += force * smoothing + self.force_prev * (1.0 - smoothing);
        self.force_prev = force;
    }

    /// Stages 4-7
    fn steer(&mut self, p: &PhysicsParameters, f: &Frame) {
        if f.turn == 0.0 {
            return;
        }

        let mut rate = p.base_rotation_speed;
        if f.speed > STEERING_SPEED_THRESHOLD {
            // Faster means slower turning, with a floor
            rate *= p.steering_max.max(p.steering_factor / (f.speed * 0.5 + 0.1));
            if f.travel_dir < 0.0 {
                rate *= 0.7;
            }
        } else {
            // Parking-speed manoeuvres
            rate *= 1.5;
        }
        let desired = f.turn * rate * f.scaled;

        let inertia = p.inertia_factor * (1.0 + f.speed * 2.0);
        let mut applied = desired / (1.0 + inertia);
        // Clearly reversing: the tail swings toward the steered side
        if f.travel_dir < REVERSE_STEER_THRESHOLD {
            applied = -applied;
        }

        self.apply_yaw(p, f, applied);
        self.drift(p, f);
    }

    /// Stage 6: blend toward a wider turning radius at low speed
    fn apply_yaw(&mut self, p: &PhysicsParameters, f: &Frame, applied: f64) {
        let speed_factor = (f.speed * 5.0 + 0.2).min(1.0);
        let blend = p.ackermann_factor * (1.0 - speed_factor) + speed_factor;

        let mut yaw = applied * blend;
        if f.speed < LOW_SPEED_TURN_LIMIT {
            yaw *= (f.speed / LOW_SPEED_TURN_LIMIT).max(0.1);
        }
        self.state.heading += yaw;

        // Swing the body along an arc instead of pivoting on the spot
        if applied.abs() > STOP_EPSILON && f.speed > STEERING_SPEED_THRESHOLD {
            let swing = applied.abs() * f.speed * ARC_CORRECTION * (1.0 - blend);
            self.state.position += f.lateral * applied.signum() * swing * f.dt;
        }
    }

    /// Stage 7
    fn drift(&mut self, p: &PhysicsParameters, f: &Frame) {
        if f.speed <= DRIFT_SPEED_THRESHOLD {
            return;
        }
        let boost = if f.speed > HIGH_DRIFT_SPEED { 1.5 } else { 1.0 };
        let amount = p.drift_factor * f.speed * f.turn.abs() * boost * f.scaled;
        self.state.velocity += f.lateral * (f.turn * amount);
    }

    /// Stage 8: tyres grip along the heading and shed sideways motion
    fn apply_traction(&mut self, p: &PhysicsParameters, f: &Frame) {
        let velocity = self.state.velocity;
        let along = f.heading * f.heading.dot(velocity);
        let across = velocity - along;

        let grip = (p.traction - f.speed * 0.15).max(0.5);
        self.state.velocity = along + across * grip.powf(f.scaled);
    }

    /// Stages 9-10
    fn resist(&mut self, p: &PhysicsParameters, f: &Frame, control: &ControlState) {
        if f.speed <= STOP_EPSILON {
            if !control.wants_propulsion() {
                // Kill residual creep
                self.state.velocity = DVec3::ZERO;
            }
            return;
        }

        let velocity = self.state.velocity;
        let Some(dir) = velocity.try_normalize() else {
            return;
        };
        let inv_mass = inverse_mass(p);
        let drag = p.drag * (1.0 + f.speed * 0.5) * velocity.length_squared() * f.scaled * inv_mass;
        // Tyres scrub harder in corners
        let friction = p.friction * (1.0 + f.turn.abs() * f.speed * 0.2) * f.scaled * inv_mass;

        let loss = drag + friction;
        self.state.velocity = if loss >= velocity.length() {
            DVec3::ZERO
        } else {
            velocity - dir * loss
        };
    }

    /// Stage 11
    fn clamp_speed(&mut self, p: &PhysicsParameters) {
        let max = p.max_speed.max(0.0);
        if self.state.velocity.length() > max {
            self.state.velocity = self
                .state
                .velocity
                .try_normalize()
                .map_or(DVec3::ZERO, |dir| dir * max);
        }
    }

    /// Stage 12
    fn ground_contact(&mut self, p: &PhysicsParameters, f: &Frame) {
        let ground = p.ground_level;
        let state = &mut self.state;
        if state.position.y < ground {
            state.position.y = ground;
            state.velocity.y = 0.0;
        } else if state.position.y > ground {
            state.velocity.y -= p.gravity * f.scaled;
            self.clamp_speed(p);
        }
    }

    /// Stage 13
    fn integrate(&mut self, p: &PhysicsParameters, f: &Frame) {
        let mut movement = self.state.velocity * f.scaled;
        if f.travel_dir < 0.0 {
            // Reversing gets extra smoothing
            movement = movement * 0.2 + self.movement_prev * 0.8;
        }
        self.movement_prev = movement;
        self.state.position += movement;

        if self.state.position.y < p.ground_level {
            self.state.position.y = p.ground_level;
            self.state.velocity.y = self.state.velocity.y.max(0.0);
        }
    }

    /// Stage 14: visual only, nothing reads pitch/roll back
    fn tilt(&mut self, p: &PhysicsParameters, f: &Frame, control: &ControlState) {
        let max = p.max_speed;
        let target_pitch = if control.accelerate {
            // Nose up under throttle, strongest from a standstill
            -0.03 * (1.0 - f.speed / max)
        } else if control.reverse {
            0.03 * (1.0 - f.speed / (max * REVERSE_POWER))
        } else if control.brake && f.speed > 0.1 {
            0.05 * (f.speed / max).min(1.0)
        } else {
            0.0
        };

        let lateral_speed = f.lateral.dot(self.state.velocity);
        let target_roll = -lateral_speed * 0.3 * (1.0 + f.speed);

        let rate = (TILT_RATE * f.scaled).clamp(0.0, 1.0);
        let state = &mut self.state;
        state.pitch += (target_pitch - state.pitch) * rate;
        state.roll += (target_roll - state.roll) * rate;
    }
}

#[inline]
fn inverse_mass(p: &PhysicsParameters) -> f64 {
    if p.mass > 0.0 { 1.0 / p.mass } else { 0.0 }
}

/// Owns the vehicle state and advances it once per frame
#[derive(Debug, Clone, Default)]
pub struct VehicleDynamics {
    params: PhysicsParameters,
    body: Option<Body>,
}

impl VehicleDynamics {
    /// Unspawned vehicle; `step` does nothing until [`spawn`](Self::spawn)
    pub fn new(params: PhysicsParameters) -> Self {
        Self { params, body: None }
    }

    /// Vehicle already placed at `spawn`
    pub fn spawned(params: PhysicsParameters, spawn: DVec3) -> Self {
        let mut dynamics = Self::new(params);
        dynamics.spawn(spawn);
        dynamics
    }

    /// Attach a body at rest at `spawn` (replaces any previous body)
    pub fn spawn(&mut self, spawn: DVec3) {
        log::debug!("Vehicle spawned at {:?}", spawn);
        self.body = Some(Body::new(spawn));
    }

    pub fn is_spawned(&self) -> bool {
        self.body.is_some()
    }

    pub fn spawn_point(&self) -> Option<DVec3> {
        self.body.as_ref().map(|b| b.spawn)
    }

    /// Snapshot of the current state
    pub fn state(&self) -> Option<VehicleState> {
        self.body.as_ref().map(|b| b.state)
    }

    /// Borrow the current state without copying
    pub fn state_ref(&self) -> Option<&VehicleState> {
        self.body.as_ref().map(|b| &b.state)
    }

    /// Back to the spawn point, stopped and facing +Z
    pub fn reset(&mut self) {
        if let Some(body) = &mut self.body {
            body.reset();
            log::debug!("Vehicle reset to {:?}", body.spawn);
        }
    }

    /// Externally forced displacement (teleport); physics resumes next step
    pub fn set_position(&mut self, position: DVec3) {
        if let Some(body) = &mut self.body {
            body.state.position = position;
        }
    }

    pub fn parameters(&self) -> &PhysicsParameters {
        &self.params
    }

    pub fn parameters_mut(&mut self) -> &mut PhysicsParameters {
        &mut self.params
    }

    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.params.get(name)
    }

    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<(), TuningError> {
        self.params.set(name, value)
    }

    /// Advance one frame of `dt_raw` seconds
    pub fn step(&mut self, dt_raw: f64, control: &ControlState) {
        let Some(body) = &mut self.body else {
            return;
        };
        if !dt_raw.is_finite() {
            log::debug!("Skipping vehicle step with dt {}", dt_raw);
            return;
        }
        let p = &self.params;

        let frame = body.begin_frame(dt_raw.max(0.0), control);
        body.propel(p, &frame, control);
        body.steer(p, &frame);
        body.apply_traction(p, &frame);
        body.resist(p, &frame, control);
        body.clamp_speed(p);
        body.ground_contact(p, &frame);
        body.integrate(p, &frame);
        body.tilt(p, &frame, control);

        if frame.speed > STEERING_SPEED_THRESHOLD {
            log::trace!(
                "speed {:.3} direction {:.2}",
                frame.speed,
                frame.travel_dir
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::TAU;

    const TOL: f64 = 1e-9;

    fn car() -> VehicleDynamics {
        VehicleDynamics::spawned(PhysicsParameters::default(), DVec3::ZERO)
    }

    fn controls(accelerate: bool, brake: bool, reverse: bool, left: bool, right: bool) -> ControlState {
        ControlState {
            accelerate,
            brake,
            reverse,
            steer_left: left,
            steer_right: right,
        }
    }

    fn throttle() -> ControlState {
        ControlState {
            accelerate: true,
            ..Default::default()
        }
    }

    fn set_velocity(car: &mut VehicleDynamics, velocity: DVec3) {
        car.body.as_mut().unwrap().state.velocity = velocity;
    }

    fn set_heading(car: &mut VehicleDynamics, heading: f64) {
        car.body.as_mut().unwrap().state.heading = heading;
    }

    fn assert_finite(state: &VehicleState) {
        assert!(state.position.is_finite(), "position {:?}", state.position);
        assert!(state.velocity.is_finite(), "velocity {:?}", state.velocity);
        assert!(state.heading.is_finite(), "heading {}", state.heading);
        assert!(state.pitch.is_finite() && state.roll.is_finite());
    }

    #[test]
    fn test_step_before_spawn_is_noop() {
        let mut car = VehicleDynamics::new(PhysicsParameters::default());
        car.step(SIM_DT, &throttle());
        car.reset();
        assert!(!car.is_spawned());
        assert!(car.state().is_none());
    }

    #[test]
    fn test_idle_at_rest_stays_put() {
        let mut car = car();
        for _ in 0..100 {
            car.step(SIM_DT, &ControlState::default());
        }
        let state = car.state().unwrap();
        assert_eq!(state.velocity, DVec3::ZERO);
        assert_eq!(state.position, DVec3::ZERO);
        assert_eq!(state.heading, 0.0);
    }

    /// Straight-line reference: along +Z only forces, drag, friction and the cap act
    fn straight_line_reference(ticks: usize) -> Vec<(f64, f64)> {
        let p = PhysicsParameters::default();
        let mut dt_prev = INITIAL_DT;
        let mut v = 0.0_f64;
        let mut z = 0.0_f64;
        let mut force_prev = 0.0_f64;
        let mut trace = Vec::with_capacity(ticks);
        for _ in 0..ticks {
            let dt = 0.2 * SIM_DT + 0.8 * dt_prev;
            dt_prev = dt;
            let scaled = dt * 60.0;
            let speed = v.abs();

            let fade = (1.0 - speed / (p.max_speed * 1.2)).max(0.2);
            let force = p.acceleration * scaled * fade / p.mass;
            let k = p.movement_smoothing * (1.0 + speed * 0.5);
            v += force * k + force_prev * (1.0 - k);
            force_prev = force;

            if speed > STOP_EPSILON {
                let drag = p.drag * (1.0 + speed * 0.5) * v * v * scaled / p.mass;
                let friction = p.friction * scaled / p.mass;
                v = if drag + friction >= v { 0.0 } else { v - (drag + friction) };
            }
            v = v.min(p.max_speed);
            z += v * scaled;
            trace.push((v, z));
        }
        trace
    }

    #[test]
    fn test_scenario_a_straight_acceleration() {
        let mut car = car();
        let reference = straight_line_reference(120);
        let mut last_speed = 0.0;
        for (tick, &(ref_speed, ref_z)) in reference.iter().enumerate() {
            car.step(SIM_DT, &throttle());
            let state = car.state().unwrap();
            let speed = state.speed();

            assert!((speed - ref_speed).abs() < 1e-6, "tick {tick}: {speed} vs {ref_speed}");
            assert!((state.velocity.z - ref_speed).abs() < 1e-6);
            assert!(state.velocity.x.abs() < 1e-6 && state.velocity.y.abs() < 1e-6);
            assert!((state.position.z - ref_z).abs() < 1e-6, "tick {tick}");
            assert!(state.position.x.abs() < 1e-6);

            assert!(speed > last_speed, "speed must rise every tick (tick {tick})");
            assert!(speed < car.parameters().max_speed);
            last_speed = speed;
        }
        // Gains shrink as the car approaches its top speed
        let early = reference[10].0 - reference[9].0;
        let late = reference[119].0 - reference[118].0;
        assert!(late < early);
    }

    #[test]
    fn test_scenario_b_left_turn_under_throttle() {
        let mut car = car();
        let input = ControlState {
            accelerate: true,
            steer_left: true,
            ..Default::default()
        };
        let mut last = 0.0;
        for _ in 0..60 {
            car.step(SIM_DT, &input);
            let state = car.state().unwrap();
            assert!(state.heading > last, "heading must keep rising");
            let wrapped = state.normalized_heading();
            assert!((0.0..TAU).contains(&wrapped));
            last = state.heading;
        }
    }

    #[test]
    fn test_scenario_c_ground_clamp() {
        let mut car = car();
        set_velocity(&mut car, DVec3::new(0.0, -0.5, 0.3));
        car.set_position(DVec3::new(0.0, -2.0, 0.0));
        car.step(SIM_DT, &ControlState::default());
        let state = car.state().unwrap();
        assert_eq!(state.position.y, 0.0);
        assert_eq!(state.velocity.y, 0.0);
    }

    #[test]
    fn test_airborne_falls_back_to_ground() {
        let mut car = car();
        car.set_position(DVec3::new(0.0, 0.05, 0.0));
        let mut landed = false;
        for _ in 0..200 {
            car.step(SIM_DT, &ControlState::default());
            let state = car.state().unwrap();
            assert!(state.position.y >= 0.0);
            if state.position.y == 0.0 {
                landed = true;
                break;
            }
        }
        assert!(landed);
    }

    #[test]
    fn test_ground_level_parameter() {
        let mut car = car();
        car.set_parameter("ground_level", 1.5).unwrap();
        car.step(SIM_DT, &ControlState::default());
        assert_eq!(car.state().unwrap().position.y, 1.5);
    }

    #[test]
    fn test_brake_beats_throttle() {
        let mut car = car();
        let input = ControlState {
            accelerate: true,
            brake: true,
            ..Default::default()
        };
        for _ in 0..30 {
            car.step(SIM_DT, &input);
        }
        assert_eq!(car.state().unwrap().velocity, DVec3::ZERO);
    }

    fn brake() -> ControlState {
        ControlState {
            brake: true,
            ..Default::default()
        }
    }

    /// Filtered frame time of the first step on a fresh body
    fn first_frame_dt() -> f64 {
        DT_BLEND * SIM_DT + (1.0 - DT_BLEND) * INITIAL_DT
    }

    #[test]
    fn test_brake_force_is_applied_as_is() {
        let mut car = car();
        let p = *car.parameters();
        let v0 = 0.03;
        set_velocity(&mut car, DVec3::new(0.0, 0.0, v0));
        car.step(SIM_DT, &brake());

        let scaled = first_frame_dt() * REFERENCE_HZ;
        let force = p.acceleration * scaled * BRAKE_MULTIPLIER / p.mass;
        let smoothing = p.movement_smoothing * (1.0 + v0 * 0.5);
        // The braked velocity overshoots past zero; resistance then pulls it back
        let braked = v0 - force * smoothing;
        assert!(braked < 0.0);
        let drag = p.drag * (1.0 + v0 * 0.5) * braked * braked * scaled / p.mass;
        let friction = p.friction * scaled / p.mass;
        let expected = braked + drag + friction;

        let v = car.state().unwrap().velocity;
        assert!((v.z - expected).abs() < 1e-12, "{} vs {}", v.z, expected);
        assert_eq!(v.x, 0.0);
    }

    #[test]
    fn test_brake_sheds_speed() {
        let mut car = car();
        set_velocity(&mut car, DVec3::new(0.0, 0.0, 0.8));
        let mut last = 0.8;
        for _ in 0..9 {
            car.step(SIM_DT, &brake());
            let speed = car.state().unwrap().speed();
            assert!(speed < last, "brake must slow the car: {last} -> {speed}");
            last = speed;
        }
        // Held at a near-standstill the brake only chatters around zero
        for _ in 0..120 {
            car.step(SIM_DT, &brake());
            assert!(car.state().unwrap().speed() < 0.1);
        }
    }

    #[test]
    fn test_throttle_tilt_wins_over_brake() {
        let mut both = car();
        let mut braking = car();
        set_velocity(&mut both, DVec3::new(0.0, 0.0, 0.8));
        set_velocity(&mut braking, DVec3::new(0.0, 0.0, 0.8));
        let input = controls(true, true, false, false, false);
        for _ in 0..3 {
            both.step(SIM_DT, &input);
            braking.step(SIM_DT, &brake());
        }
        // Nose up while the throttle is held, even with the brake on
        assert!(both.state().unwrap().pitch < 0.0);
        // Nose down under braking alone
        assert!(braking.state().unwrap().pitch > 0.0);
    }

    #[test]
    fn test_arc_correction_offsets_sideways() {
        let speed = 0.15;
        for (steer_left, sign) in [(true, 1.0), (false, -1.0)] {
            let mut car = car();
            let p = *car.parameters();
            set_velocity(&mut car, DVec3::new(0.0, 0.0, speed));
            let input = controls(false, false, false, steer_left, !steer_left);
            car.step(SIM_DT, &input);

            let dt = first_frame_dt();
            let rate = p.base_rotation_speed
                * p.steering_max.max(p.steering_factor / (speed * 0.5 + 0.1));
            let applied = sign * rate * dt * REFERENCE_HZ / (1.0 + p.inertia_factor * (1.0 + speed * 2.0));
            let speed_factor = (speed * 5.0 + 0.2).min(1.0);
            let blend = p.ackermann_factor * (1.0 - speed_factor) + speed_factor;
            let offset = applied.abs() * speed * ARC_CORRECTION * (1.0 - blend) * dt;

            // Velocity stays on +Z, so all sideways motion is the arc correction
            let state = car.state().unwrap();
            assert_eq!(state.velocity.x, 0.0);
            assert!(state.position.x * sign > 0.0);
            assert!(
                (state.position.x - sign * offset).abs() <= offset * 1e-9,
                "{} vs {}",
                state.position.x,
                sign * offset
            );
        }
    }

    #[test]
    fn test_reverse_movement_is_smoothed() {
        let mut car = car();
        for _ in 0..30 {
            car.step(SIM_DT, &throttle());
        }
        let previous = car.body.as_ref().unwrap().movement_prev;
        assert!(previous.z > 0.0);

        // Snap to rolling backwards and let it coast one step
        set_velocity(&mut car, DVec3::new(0.0, 0.0, -0.4));
        let before = car.state().unwrap().position;
        car.step(SIM_DT, &ControlState::default());

        let body = car.body.as_ref().unwrap();
        let raw = body.state.velocity * (body.dt_prev * REFERENCE_HZ);
        let expected = raw * 0.2 + previous * 0.8;
        let moved = body.state.position - before;
        assert!((moved - expected).length() < 1e-12, "{moved:?} vs {expected:?}");
        assert_eq!(body.movement_prev, expected);
        // Still carried forward by the previous frame's motion
        assert!(moved.z > raw.z);
    }

    #[test]
    fn test_reverse_moves_backwards() {
        let mut car = car();
        let input = ControlState {
            reverse: true,
            ..Default::default()
        };
        for _ in 0..60 {
            car.step(SIM_DT, &input);
        }
        let state = car.state().unwrap();
        assert!(state.velocity.z < 0.0);
        assert!(state.position.z < 0.0);
        assert!(state.travel_direction() < -0.99);
    }

    #[test]
    fn test_reverse_steering_flips() {
        let mut car = car();
        let back = ControlState {
            reverse: true,
            ..Default::default()
        };
        for _ in 0..60 {
            car.step(SIM_DT, &back);
        }
        let before = car.state().unwrap().heading;
        let back_left = ControlState {
            reverse: true,
            steer_left: true,
            ..Default::default()
        };
        car.step(SIM_DT, &back_left);
        assert!(car.state().unwrap().heading < before);
    }

    #[test]
    fn test_drift_pushes_sideways_at_speed() {
        let mut car = car();
        for _ in 0..120 {
            car.step(SIM_DT, &throttle());
        }
        let heading_before = car.state().unwrap().heading;
        let input = ControlState {
            accelerate: true,
            steer_left: true,
            ..Default::default()
        };
        car.step(SIM_DT, &input);
        let state = car.state().unwrap();
        assert!(state.heading > heading_before);
        // Sideways slip is left over after traction
        let slip = state.velocity.dot(lateral_vector(state.heading));
        assert!(slip.abs() > 0.0);
        assert!(state.roll != 0.0);
    }

    #[test]
    fn test_steering_cancellation() {
        let mut car = car();
        let both = controls(true, false, false, true, true);
        for _ in 0..200 {
            car.step(SIM_DT, &both);
        }
        let state = car.state().unwrap();
        assert_eq!(state.heading, 0.0);
        assert!(state.position.x.abs() < TOL);
    }

    #[test]
    fn test_reset_idempotent() {
        let spawn = DVec3::new(3.0, 0.0, -4.0);
        let mut car = VehicleDynamics::spawned(PhysicsParameters::default(), spawn);
        let input = controls(true, false, false, true, false);
        for _ in 0..90 {
            car.step(SIM_DT, &input);
        }
        assert_ne!(car.state().unwrap().position, spawn);
        for _ in 0..3 {
            car.reset();
            let state = car.state().unwrap();
            assert_eq!(state.velocity, DVec3::ZERO);
            assert_eq!(state.heading, 0.0);
            assert_eq!(state.position, spawn);
        }
        assert_eq!(car.spawn_point(), Some(spawn));
    }

    #[test]
    fn test_reset_clears_smoothing_memory() {
        let mut car = car();
        car.step(SIM_DT, &throttle());
        car.reset();
        car.step(SIM_DT, &ControlState::default());
        assert_eq!(car.state().unwrap().velocity, DVec3::ZERO);
    }

    #[test]
    fn test_live_tuning_changes_top_speed() {
        let mut car = car();
        car.set_parameter("max_speed", 0.5).unwrap();
        for _ in 0..600 {
            car.step(SIM_DT, &throttle());
        }
        assert!(car.state().unwrap().speed() <= 0.5 + TOL);
        assert_eq!(car.parameter("max_speed"), Some(0.5));
        assert!(car.set_parameter("top_speed", 1.0).is_err());
    }

    #[test]
    fn test_frame_jitter_is_filtered() {
        let mut smooth = car();
        let mut jittery = car();
        for i in 0..240 {
            smooth.step(SIM_DT, &throttle());
            let dt = if i % 2 == 0 { SIM_DT * 0.5 } else { SIM_DT * 1.5 };
            jittery.step(dt, &throttle());
        }
        let a = smooth.state().unwrap();
        let b = jittery.state().unwrap();
        assert!((a.speed() - b.speed()).abs() < 0.01);
    }

    #[test]
    fn test_non_finite_dt_is_skipped() {
        let mut car = car();
        car.step(f64::NAN, &throttle());
        car.step(f64::INFINITY, &throttle());
        assert_eq!(car.state().unwrap().velocity, DVec3::ZERO);
        car.step(SIM_DT, &throttle());
        assert_finite(&car.state().unwrap());
        assert!(car.state().unwrap().speed() > 0.0);
    }

    #[test]
    fn test_scripted_soak_stays_finite() {
        let mut car = car();
        let script = [
            controls(true, false, false, false, false),
            controls(true, false, false, true, false),
            controls(false, true, false, false, false),
            controls(false, false, true, false, true),
            controls(false, false, true, true, false),
            controls(true, true, true, true, true),
            controls(false, false, false, false, false),
            controls(true, false, true, false, true),
        ];
        for tick in 0..12_000 {
            let input = script[(tick / 97) % script.len()];
            car.step(SIM_DT, &input);
            let state = car.state().unwrap();
            assert_finite(&state);
            assert!(state.speed() <= car.parameters().max_speed + TOL);
            assert!(state.position.y >= car.parameters().ground_level);
        }
    }

    fn control_strategy() -> impl Strategy<Value = ControlState> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>())
            .prop_map(|(a, b, r, l, rt)| controls(a, b, r, l, rt))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_speed_bound_and_finite(
            inputs in proptest::collection::vec((control_strategy(), 1usize..40), 1..40),
            dt in prop_oneof![Just(1.0 / 60.0), Just(1.0 / 30.0), Just(1.0 / 144.0), 0.0f64..0.1],
        ) {
            let mut car = car();
            for (input, hold) in inputs {
                for _ in 0..hold {
                    car.step(dt, &input);
                    let state = car.state().unwrap();
                    prop_assert!(state.position.is_finite() && state.velocity.is_finite());
                    prop_assert!(state.heading.is_finite());
                    prop_assert!(state.speed() <= car.parameters().max_speed + TOL);
                    prop_assert!(state.position.y >= 0.0);
                }
            }
        }

        #[test]
        fn prop_decays_to_rest(
            vx in -1.5f64..1.5,
            vz in -1.5f64..1.5,
            heading in -3.2f64..3.2,
        ) {
            let mut car = car();
            set_heading(&mut car, heading);
            set_velocity(&mut car, DVec3::new(vx, 0.0, vz));
            let mut previous = car.state().unwrap().speed();
            let mut ticks = 0;
            while car.state().unwrap().speed() > 0.0 {
                car.step(SIM_DT, &ControlState::default());
                let speed = car.state().unwrap().speed();
                prop_assert!(speed <= previous, "speed rose {} -> {}", previous, speed);
                previous = speed;
                ticks += 1;
                prop_assert!(ticks < 2_000, "never came to rest");
            }
            prop_assert_eq!(car.state().unwrap().velocity, DVec3::ZERO);
        }

        #[test]
        fn prop_steering_cancels(
            accelerate in any::<bool>(),
            reverse in any::<bool>(),
            ticks in 1usize..300,
        ) {
            let mut car = car();
            let input = controls(accelerate, false, reverse, true, true);
            for _ in 0..ticks {
                car.step(SIM_DT, &input);
            }
            prop_assert_eq!(car.state().unwrap().heading, 0.0);
        }
    }
}
