//! Vehicle and wheel state
//!
//! Plain data read by camera, HUD and render collaborators each frame.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::consts::STOP_EPSILON;
use crate::{display_kph, heading_vector, wrap_angle_positive};

/// Kinematic state of the vehicle body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: DVec3,
    /// Yaw about +Y (radians, unwrapped)
    pub heading: f64,
    /// Units per reference tick
    pub velocity: DVec3,
    /// Cosmetic nose-up/down tilt (radians)
    #[serde(default)]
    pub pitch: f64,
    /// Cosmetic side lean (radians)
    #[serde(default)]
    pub roll: f64,
}

impl VehicleState {
    /// At rest at the spawn point, facing +Z
    pub fn at_spawn(spawn: DVec3) -> Self {
        Self {
            position: spawn,
            heading: 0.0,
            velocity: DVec3::ZERO,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }

    /// Unit vector the nose points along
    #[inline]
    pub fn forward(&self) -> DVec3 {
        heading_vector(self.heading)
    }

    /// Heading wrapped to [0, 2π)
    #[inline]
    pub fn normalized_heading(&self) -> f64 {
        wrap_angle_positive(self.heading)
    }

    /// Cosine between velocity and heading: 1 forward, -1 backward, 0 stopped or sideways
    pub fn travel_direction(&self) -> f64 {
        if self.speed() <= STOP_EPSILON {
            return 0.0;
        }
        self.velocity
            .try_normalize()
            .map(|dir| dir.dot(self.forward()))
            .unwrap_or(0.0)
    }

    /// HUD snapshot
    pub fn telemetry(&self) -> Telemetry {
        let speed = self.speed();
        Telemetry {
            speed,
            kph: display_kph(speed),
            travel_direction: self.travel_direction(),
            heading: self.normalized_heading(),
            position: self.position,
            forward: self.forward(),
            velocity: self.velocity,
        }
    }
}

/// Read-only readout for speedometers and debug arrows
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Telemetry {
    pub speed: f64,
    pub kph: i64,
    pub travel_direction: f64,
    /// Wrapped to [0, 2π)
    pub heading: f64,
    pub position: DVec3,
    pub forward: DVec3,
    pub velocity: DVec3,
}

/// Wheel positions on the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelSlot {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
}

impl WheelSlot {
    pub const ALL: [WheelSlot; 4] = [
        WheelSlot::FrontLeft,
        WheelSlot::FrontRight,
        WheelSlot::RearLeft,
        WheelSlot::RearRight,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            WheelSlot::FrontLeft => 0,
            WheelSlot::FrontRight => 1,
            WheelSlot::RearLeft => 2,
            WheelSlot::RearRight => 3,
        }
    }

    /// Classify an asset node name ("RoueAG", "roue arrière droite", ...)
    pub fn from_node_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        if name.contains("rouag") || name == "roueag" || name == "roue avant gauche" {
            Some(WheelSlot::FrontLeft)
        } else if name.contains("rouad") || name == "rouead" || name == "roue avant droite" {
            Some(WheelSlot::FrontRight)
        } else if name.contains("routedg")
            || name.contains("rouedg")
            || name == "roue arrière gauche"
        {
            Some(WheelSlot::RearLeft)
        } else if name.contains("rouedd") || name == "routedd" || name == "roue arrière droite" {
            Some(WheelSlot::RearRight)
        } else {
            None
        }
    }
}

/// Front steering mounts (the pivot each front wheel hangs from)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SteeringMount {
    FrontLeft,
    FrontRight,
}

impl SteeringMount {
    pub const ALL: [SteeringMount; 2] = [SteeringMount::FrontLeft, SteeringMount::FrontRight];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            SteeringMount::FrontLeft => 0,
            SteeringMount::FrontRight => 1,
        }
    }
}

/// Derived wheel visuals
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelState {
    /// Accumulated spin per wheel, indexed by [`WheelSlot::index`]
    pub spin: [f64; 4],
    /// Shared front steering angle (radians, positive = left)
    pub steering_angle: f64,
    /// Smoothed signed angular speed (radians per second)
    pub angular_speed: f64,
}

impl WheelState {
    #[inline]
    pub fn spin_of(&self, slot: WheelSlot) -> f64 {
        self.spin[slot.index()]
    }
}
