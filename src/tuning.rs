//! Live-tunable vehicle and wheel parameters
//!
//! Every field is a plain `f64` so a tuning surface can replace one between
//! ticks without recreating the vehicle. Fields are reachable by name for UI
//! adapters, and the whole set persists as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the tuning surface and tuning files
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("parameter `{name}` must be finite, got {value}")]
    NonFinite { name: String, value: f64 },
    #[error("tuning file i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("tuning file format: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which record a parameter belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamGroup {
    CarPhysics,
    DrivingBehavior,
    Wheels,
}

impl ParamGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamGroup::CarPhysics => "Car Physics",
            ParamGroup::DrivingBehavior => "Driving Behavior",
            ParamGroup::Wheels => "Wheels",
        }
    }
}

/// Describes one tunable field for a UI adapter (slider bounds are advisory)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub group: ParamGroup,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

const fn spec(
    name: &'static str,
    label: &'static str,
    group: ParamGroup,
    min: f64,
    max: f64,
    step: f64,
) -> ParamSpec {
    ParamSpec {
        name,
        label,
        group,
        min,
        max,
        step,
    }
}

const PHYSICS_SPECS: &[ParamSpec] = &[
    spec("acceleration", "Acceleration", ParamGroup::CarPhysics, 0.01, 0.1, 0.005),
    spec("max_speed", "Max Speed", ParamGroup::CarPhysics, 0.5, 2.0, 0.1),
    spec("friction", "Friction", ParamGroup::CarPhysics, 0.001, 0.01, 0.001),
    spec("mass", "Mass", ParamGroup::CarPhysics, 0.5, 2.0, 0.1),
    spec("gravity", "Gravity", ParamGroup::CarPhysics, 0.0, 0.05, 0.001),
    spec("drag", "Air Drag", ParamGroup::CarPhysics, 0.0, 0.002, 0.0001),
    spec("ground_level", "Ground Level", ParamGroup::CarPhysics, -10.0, 10.0, 0.1),
    spec("steering_factor", "Steering Response", ParamGroup::DrivingBehavior, 0.1, 2.0, 0.05),
    spec("steering_max", "Steering Floor", ParamGroup::DrivingBehavior, 0.1, 2.0, 0.05),
    spec("base_rotation_speed", "Turn Rate", ParamGroup::DrivingBehavior, 0.005, 0.1, 0.005),
    spec("drift_factor", "Drift Amount", ParamGroup::DrivingBehavior, 0.0, 0.2, 0.01),
    spec("traction", "Traction", ParamGroup::DrivingBehavior, 0.5, 1.0, 0.01),
    spec("inertia_factor", "Inertia", ParamGroup::DrivingBehavior, 0.05, 0.5, 0.01),
    spec("movement_smoothing", "Movement Smoothing", ParamGroup::DrivingBehavior, 0.1, 0.9, 0.05),
    spec("ackermann_factor", "Low Speed Turn Factor", ParamGroup::DrivingBehavior, 0.1, 1.0, 0.05),
];

const WHEEL_SPECS: &[ParamSpec] = &[
    spec("wheel_speed_multiplier", "Rotation Speed", ParamGroup::Wheels, 10.0, 100.0, 1.0),
    spec("wheel_inertia", "Wheel Inertia", ParamGroup::Wheels, 0.01, 0.5, 0.01),
    spec("wheel_radius", "Wheel Radius", ParamGroup::Wheels, 0.1, 0.5, 0.01),
    spec("max_steering_angle", "Steering Angle", ParamGroup::Wheels, 0.1, 0.8, 0.05),
    spec("steering_speed", "Steering Response", ParamGroup::Wheels, 0.05, 0.5, 0.05),
];

/// All tunable fields, vehicle first then wheels
pub fn param_specs() -> impl Iterator<Item = &'static ParamSpec> {
    PHYSICS_SPECS.iter().chain(WHEEL_SPECS.iter())
}

/// Look up the UI description of a parameter
pub fn param_spec(name: &str) -> Option<&'static ParamSpec> {
    param_specs().find(|s| s.name == name)
}

fn check_finite(name: &str, value: f64) -> Result<f64, TuningError> {
    if value.is_finite() {
        Ok(value)
    } else {
        log::warn!("Rejected non-finite value {} for {}", value, name);
        Err(TuningError::NonFinite {
            name: name.to_string(),
            value,
        })
    }
}

/// Vehicle dynamics parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParameters {
    // === Car Physics ===
    /// Propulsion force per reference tick
    pub acceleration: f64,
    /// Hard cap on speed (units per reference tick)
    pub max_speed: f64,
    /// Rolling friction
    pub friction: f64,
    pub mass: f64,
    /// Downward pull while above ground
    pub gravity: f64,
    /// Quadratic air resistance
    pub drag: f64,
    /// Height of the flat ground plane
    pub ground_level: f64,

    // === Driving Behavior ===
    /// How strongly speed reduces the turn rate (lower = less influence)
    pub steering_factor: f64,
    /// Floor on the speed-dependent steering coefficient
    pub steering_max: f64,
    /// Yaw per reference tick before speed shaping
    pub base_rotation_speed: f64,
    /// Lateral slide injected while turning at speed
    pub drift_factor: f64,
    /// Lateral grip (lower slides more)
    pub traction: f64,
    /// Resistance to heading change, grows with speed
    pub inertia_factor: f64,
    /// Blend between this tick's and last tick's propulsion
    pub movement_smoothing: f64,
    /// Low-speed turning radius correction (0-1)
    pub ackermann_factor: f64,
}

impl Default for PhysicsParameters {
    fn default() -> Self {
        Self {
            acceleration: 0.03,
            max_speed: 1.2,
            friction: 0.005,
            mass: 1.2,
            gravity: 0.01,
            drag: 0.0002,
            ground_level: 0.0,

            steering_factor: 0.85,
            steering_max: 0.8,
            base_rotation_speed: 0.02,
            drift_factor: 0.03,
            traction: 0.9,
            inertia_factor: 0.25,
            movement_smoothing: 0.8,
            ackermann_factor: 0.5,
        }
    }
}

impl PhysicsParameters {
    /// Read a field by name
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "acceleration" => self.acceleration,
            "max_speed" => self.max_speed,
            "friction" => self.friction,
            "mass" => self.mass,
            "gravity" => self.gravity,
            "drag" => self.drag,
            "ground_level" => self.ground_level,
            "steering_factor" => self.steering_factor,
            "steering_max" => self.steering_max,
            "base_rotation_speed" => self.base_rotation_speed,
            "drift_factor" => self.drift_factor,
            "traction" => self.traction,
            "inertia_factor" => self.inertia_factor,
            "movement_smoothing" => self.movement_smoothing,
            "ackermann_factor" => self.ackermann_factor,
            _ => return None,
        };
        Some(value)
    }

    /// Replace a field by name
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), TuningError> {
        let field = match name {
            "acceleration" => &mut self.acceleration,
            "max_speed" => &mut self.max_speed,
            "friction" => &mut self.friction,
            "mass" => &mut self.mass,
            "gravity" => &mut self.gravity,
            "drag" => &mut self.drag,
            "ground_level" => &mut self.ground_level,
            "steering_factor" => &mut self.steering_factor,
            "steering_max" => &mut self.steering_max,
            "base_rotation_speed" => &mut self.base_rotation_speed,
            "drift_factor" => &mut self.drift_factor,
            "traction" => &mut self.traction,
            "inertia_factor" => &mut self.inertia_factor,
            "movement_smoothing" => &mut self.movement_smoothing,
            "ackermann_factor" => &mut self.ackermann_factor,
            _ => return Err(TuningError::UnknownParameter(name.to_string())),
        };
        *field = check_finite(name, value)?;
        Ok(())
    }
}

/// Wheel visual parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelParameters {
    pub wheel_radius: f64,
    /// Spin smoothing per reference tick (smaller = more responsive)
    pub wheel_inertia: f64,
    /// Exaggerates spin so it reads on screen
    pub wheel_speed_multiplier: f64,
    /// Full-lock steering angle (radians)
    pub max_steering_angle: f64,
    /// Steering lerp per reference tick
    pub steering_speed: f64,
}

impl Default for WheelParameters {
    fn default() -> Self {
        Self {
            wheel_radius: 0.25,
            wheel_inertia: 0.15,
            wheel_speed_multiplier: 30.0,
            max_steering_angle: 0.4,
            steering_speed: 0.1,
        }
    }
}

impl WheelParameters {
    pub fn get(&self, name: &str) -> Option<f64> {
        let value = match name {
            "wheel_radius" => self.wheel_radius,
            "wheel_inertia" => self.wheel_inertia,
            "wheel_speed_multiplier" => self.wheel_speed_multiplier,
            "max_steering_angle" => self.max_steering_angle,
            "steering_speed" => self.steering_speed,
            _ => return None,
        };
        Some(value)
    }

    pub fn set(&mut self, name: &str, value: f64) -> Result<(), TuningError> {
        let field = match name {
            "wheel_radius" => &mut self.wheel_radius,
            "wheel_inertia" => &mut self.wheel_inertia,
            "wheel_speed_multiplier" => &mut self.wheel_speed_multiplier,
            "max_steering_angle" => &mut self.max_steering_angle,
            "steering_speed" => &mut self.steering_speed,
            _ => return Err(TuningError::UnknownParameter(name.to_string())),
        };
        *field = check_finite(name, value)?;
        Ok(())
    }
}

/// Complete tuning set, persisted as one JSON document
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub physics: PhysicsParameters,
    pub wheels: WheelParameters,
}

impl Tuning {
    /// Read any parameter by name
    pub fn get(&self, name: &str) -> Option<f64> {
        self.physics.get(name).or_else(|| self.wheels.get(name))
    }

    /// Set any parameter by name
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), TuningError> {
        match self.physics.set(name, value) {
            Err(TuningError::UnknownParameter(_)) => self.wheels.set(name, value),
            other => other,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a tuning file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self, TuningError> {
        let json = fs::read_to_string(path)?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.display());
        Ok(tuning)
    }

    /// Load a tuning file, falling back to defaults when absent or unreadable
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(tuning) => tuning,
            Err(e) => {
                log::info!("Using default tuning ({})", e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), TuningError> {
        fs::write(path, self.to_json()?)?;
        log::info!("Tuning saved to {}", path.display());
        Ok(())
    }
}
