//! Canned drilling cycles
//!
//! Controllers without G81/G82/G83 get the long form: clear the retract
//! plane, position over the hole, feed down (in pecks for G83) and
//! retract. Arithmetic runs in output units so peck depths print exactly.

use tracing::debug;
use uom::si::f64::Length;

use super::{EmitError, Emitter, MotionMode, Position, Result, RetractMode};
use crate::config::MAX_PRECISION;
use crate::toolpath::{Command, Quantity};
use crate::units;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedCycle {
    /// G81
    Drill,
    /// G82, dwell at the bottom
    DrillDwell,
    /// G83, peck and clear chips
    PeckDrill,
}

impl CannedCycle {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "G81" => Some(CannedCycle::Drill),
            "G82" => Some(CannedCycle::DrillDwell),
            "G83" => Some(CannedCycle::PeckDrill),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            CannedCycle::Drill => "G81",
            CannedCycle::DrillDwell => "G82",
            CannedCycle::PeckDrill => "G83",
        }
    }

    pub fn required(self) -> &'static [char] {
        match self {
            CannedCycle::Drill => &['X', 'Y', 'Z', 'R', 'F'],
            CannedCycle::DrillDwell => &['X', 'Y', 'Z', 'R', 'F', 'P'],
            CannedCycle::PeckDrill => &['X', 'Y', 'Z', 'R', 'F', 'Q'],
        }
    }
}

/// Hole in absolute machine coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleGeometry {
    pub x: Length,
    pub y: Length,
    pub z: Length,
    pub retract: Length,
}

impl CycleGeometry {
    /// Where the tool rests once the cycle is done
    pub fn end_position(&self) -> Position {
        Position {
            x: self.x,
            y: self.y,
            z: self.retract,
        }
    }
}

impl Emitter<'_> {
    fn require<'c>(
        &self,
        cycle: CannedCycle,
        command: &'c Command,
        letter: char,
    ) -> Result<&'c Quantity> {
        command
            .param(letter)
            .ok_or_else(|| EmitError::MissingParameter {
                code: cycle.code().to_string(),
                letter,
            })
    }

    fn required_length(&self, cycle: CannedCycle, command: &Command, letter: char) -> Result<Length> {
        let quantity = self.require(cycle, command, letter)?;
        self.length(letter, quantity)
    }

    /// Resolve X, Y, Z and R against the current state. Relative words are
    /// offsets from the current position; in old-Z mode the tool never
    /// retracts below where it started.
    pub(super) fn cycle_geometry(&self, cycle: CannedCycle, command: &Command) -> Result<CycleGeometry> {
        for &letter in cycle.required() {
            self.require(cycle, command, letter)?;
        }

        let x = self.required_length(cycle, command, 'X')?;
        let y = self.required_length(cycle, command, 'Y')?;
        let z = self.required_length(cycle, command, 'Z')?;
        let r = self.required_length(cycle, command, 'R')?;

        let start = self.state.position;
        let mut geometry = match self.state.motion_mode {
            MotionMode::Absolute => CycleGeometry { x, y, z, retract: r },
            MotionMode::Relative => CycleGeometry {
                x: start.x + x,
                y: start.y + y,
                z: start.z + z,
                retract: start.z + r,
            },
        };

        if self.state.retract_mode == RetractMode::OldZ && start.z >= geometry.retract {
            geometry.retract = start.z;
        }
        Ok(geometry)
    }

    /// Replace a drilling cycle with G0/G1 (and G4) moves. `words` is the
    /// cycle line as it would have been written, kept as a comment.
    pub(super) fn expand_cycle(
        &mut self,
        cycle: CannedCycle,
        command: &Command,
        words: &[String],
    ) -> Result<()> {
        let geometry = self.cycle_geometry(cycle, command)?;
        let feed = self.speed('F', self.require(cycle, command, 'F')?)?;
        if feed <= 0.0 {
            return Err(EmitError::InvalidParameter {
                code: cycle.code().to_string(),
                letter: 'F',
                reason: "feed rate must be positive",
            });
        }

        let digits = self.config.precision.min(MAX_PRECISION) as i32;
        let resolution = 0.5 * 10f64.powi(-digits);
        let step = match cycle {
            CannedCycle::PeckDrill => {
                let step = self.units.length(self.required_length(cycle, command, 'Q')?);
                if step <= resolution {
                    return Err(EmitError::InvalidParameter {
                        code: cycle.code().to_string(),
                        letter: 'Q',
                        reason: "peck step must be positive",
                    });
                }
                Some(step)
            }
            _ => None,
        };
        let dwell = match cycle {
            CannedCycle::DrillDwell => Some(self.count('P', self.require(cycle, command, 'P')?)?),
            _ => None,
        };

        if self.config.comments {
            self.output.emit_comment(&format!(
                "Translated {} drilling cycle to G0/G1 moves",
                cycle.code()
            ));
            self.output.emit_commented(words);
        }

        let relative = self.state.motion_mode == MotionMode::Relative;
        if relative {
            self.emit_code(MotionMode::Absolute.code(), Vec::new());
        }

        let start_z = self.units.length(self.state.position.z);
        let bottom = self.units.length(geometry.z);
        let retract = self.units.length(geometry.retract);

        if start_z < retract {
            self.emit_code("G0", vec![self.word('Z', retract)]);
        }
        self.emit_code(
            "G0",
            vec![
                self.word('X', self.units.length(geometry.x)),
                self.word('Y', self.units.length(geometry.y)),
            ],
        );
        if start_z > retract {
            self.emit_code("G0", vec![self.word('Z', start_z)]);
        }

        if let Some(step) = step {
            let mut pecks = 1;
            let mut depth = retract - step;
            while depth > bottom + resolution {
                self.feed_to(depth, feed);
                self.emit_code("G0", vec![self.word('Z', retract)]);
                pecks += 1;
                depth = retract - step * pecks as f64;
            }
        }

        self.feed_to(bottom, feed);
        if let Some(dwell) = dwell {
            self.emit_code("G4", vec![format!("P{}", dwell)]);
        }
        self.emit_code("G0", vec![self.word('Z', retract)]);

        if relative {
            self.emit_code(MotionMode::Relative.code(), Vec::new());
        }

        self.state.position = geometry.end_position();
        debug!(cycle = cycle.code(), "expanded drilling cycle");
        Ok(())
    }

    fn word(&self, letter: char, value: f64) -> String {
        format!("{}{}", letter, units::format_fixed(value, self.config.precision))
    }

    fn feed_to(&mut self, depth: f64, feed: f64) {
        let words = vec![self.word('Z', depth), self.word('F', feed)];
        self.emit_code("G1", words);
    }

    fn emit_code(&mut self, code: &str, params: Vec<String>) {
        let mut words = vec![self.policy.translate(code).to_string()];
        words.extend(params);
        self.output.emit(&words);
    }
}
