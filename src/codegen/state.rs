//! Machine state threaded through one export run

use serde::{Deserialize, Serialize};
use uom::si::f64::Length;
use uom::si::length::millimeter;

use crate::post::DialectPolicy;
use crate::toolpath::Axis;

/// Whether coordinates are machine positions (G90) or offsets (G91)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionMode {
    #[default]
    Absolute,
    Relative,
}

impl MotionMode {
    pub fn code(self) -> &'static str {
        match self {
            MotionMode::Absolute => "G90",
            MotionMode::Relative => "G91",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "G90" => Some(MotionMode::Absolute),
            "G91" => Some(MotionMode::Relative),
            _ => None,
        }
    }
}

/// Where drilling cycles retract to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetractMode {
    /// G98: back to the Z the tool had before the cycle
    #[default]
    OldZ,
    /// G99: to the R plane
    RPlane,
}

impl RetractMode {
    pub fn code(self) -> &'static str {
        match self {
            RetractMode::OldZ => "G98",
            RetractMode::RPlane => "G99",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "G98" => Some(RetractMode::OldZ),
            "G99" => Some(RetractMode::RPlane),
            _ => None,
        }
    }
}

/// Last known absolute tool position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: Length,
    pub y: Length,
    pub z: Length,
}

impl Default for Position {
    fn default() -> Self {
        let zero = Length::new::<millimeter>(0.0);
        Self {
            x: zero,
            y: zero,
            z: zero,
        }
    }
}

impl Position {
    pub fn get(&self, axis: Axis) -> Length {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: Length) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmitterState {
    pub position: Position,
    pub motion_mode: MotionMode,
    pub retract_mode: RetractMode,
    /// Code of the previous command, for modal suppression
    pub last_code: Option<String>,
    /// Next motion must carry X, Y and Z (start of run, after a tool change)
    pub force_full_coordinates: bool,
}

impl EmitterState {
    pub fn new(policy: &DialectPolicy) -> Self {
        Self {
            position: Position::default(),
            motion_mode: policy.motion_mode,
            retract_mode: policy.retract_mode,
            last_code: None,
            force_full_coordinates: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_codes() {
        assert_eq!(MotionMode::from_code("G91"), Some(MotionMode::Relative));
        assert_eq!(MotionMode::from_code("G1"), None);
        assert_eq!(RetractMode::from_code("G99"), Some(RetractMode::RPlane));
        assert_eq!(RetractMode::OldZ.code(), "G98");
    }

    #[test]
    fn test_fresh_state() {
        let state = EmitterState::new(&DialectPolicy::default());
        assert!(state.force_full_coordinates);
        assert_eq!(state.last_code, None);
        assert_eq!(state.motion_mode, MotionMode::Absolute);
        assert_eq!(state.position.get(Axis::Z).get::<millimeter>(), 0.0);
    }

    #[test]
    fn test_position_by_axis() {
        let mut position = Position::default();
        position.set(Axis::Y, Length::new::<millimeter>(4.0));
        assert_eq!(position.y.get::<millimeter>(), 4.0);
        assert_eq!(Axis::from_letter('Y'), Some(Axis::Y));
        assert_eq!(Axis::from_letter('A'), None);
    }
}
