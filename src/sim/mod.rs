//! Deterministic vehicle simulation
//!
//! Everything here is a pure function of parameters, inputs and frame time:
//! - No rendering, scene graph or device dependencies
//! - Same inputs and dt sequence give the same trajectory
//! - Wheels are stepped after the body they follow

pub mod control;
pub mod state;
pub mod tick;
pub mod vehicle;
pub mod wheels;

pub use control::ControlState;
pub use state::{SteeringMount, Telemetry, VehicleState, WheelSlot, WheelState};
pub use tick::{DriveSession, TickInput, tick};
pub use vehicle::VehicleDynamics;
pub use wheels::{PoseChannel, ResolvedRig, WheelKinematics, WheelRig};
