//! Platform input adapter
//!
//! Maps device key names (as reported by `KeyboardEvent.key` or a terminal
//! front end) onto the per-tick control snapshot. The simulation never sees
//! key names, only [`TickInput`].

use crate::sim::{ControlState, TickInput};

/// Driver actions a key can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKey {
    Accelerate,
    Reverse,
    SteerLeft,
    SteerRight,
    Brake,
    /// One-shot respawn, consumed by the next tick
    Reset,
}

impl DriverKey {
    /// Default AZERTY-friendly layout plus arrows, case-insensitive
    pub fn from_key_name(key: &str) -> Option<Self> {
        if key == " " {
            return Some(DriverKey::Brake);
        }
        match key.to_ascii_lowercase().as_str() {
            "z" | "arrowup" => Some(DriverKey::Accelerate),
            "s" | "arrowdown" => Some(DriverKey::Reverse),
            "q" | "arrowleft" => Some(DriverKey::SteerLeft),
            "d" | "arrowright" => Some(DriverKey::SteerRight),
            "space" | "spacebar" => Some(DriverKey::Brake),
            "r" => Some(DriverKey::Reset),
            _ => None,
        }
    }
}

/// Held-key tracker producing one [`TickInput`] per frame
#[derive(Debug, Clone, Default)]
pub struct KeyBindings {
    control: ControlState,
    reset_pending: bool,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for unbound keys so the caller can let them through
    pub fn key_down(&mut self, key: &str) -> bool {
        match DriverKey::from_key_name(key) {
            Some(DriverKey::Reset) => {
                self.reset_pending = true;
                true
            }
            Some(action) => {
                self.set(action, true);
                true
            }
            None => false,
        }
    }

    pub fn key_up(&mut self, key: &str) -> bool {
        match DriverKey::from_key_name(key) {
            Some(DriverKey::Reset) => true,
            Some(action) => {
                self.set(action, false);
                true
            }
            None => false,
        }
    }

    /// Drop every held key (focus lost, tab hidden)
    pub fn release_all(&mut self) {
        self.control = ControlState::default();
        log::debug!("All driver keys released");
    }

    pub fn control(&self) -> ControlState {
        self.control
    }

    /// Snapshot for this tick; a pending reset is consumed
    pub fn take_input(&mut self) -> TickInput {
        TickInput {
            control: self.control,
            reset: std::mem::take(&mut self.reset_pending),
        }
    }

    fn set(&mut self, action: DriverKey, held: bool) {
        let flag = match action {
            DriverKey::Accelerate => &mut self.control.accelerate,
            DriverKey::Reverse => &mut self.control.reverse,
            DriverKey::SteerLeft => &mut self.control.steer_left,
            DriverKey::SteerRight => &mut self.control.steer_right,
            DriverKey::Brake => &mut self.control.brake,
            DriverKey::Reset => return,
        };
        *flag = held;
    }
}
