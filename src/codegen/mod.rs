//! G-code emitter
//! Walks the toolpath tree and writes every command in the target dialect

use chrono::{Local, NaiveDateTime};
use thiserror::Error;
use tracing::{debug, info, trace};
use uom::si::f64::Length;

use crate::config::Config;
use crate::post::DialectPolicy;
use crate::toolpath::{Command, ParamClass, PathNode, Quantity};
use crate::units::{self, OutputUnits};

mod cycles;
pub mod output;
mod state;

pub use crate::toolpath::Axis;
pub use cycles::CannedCycle;
pub use output::{GCodeOutput, LineNumbers};
pub use state::{EmitterState, MotionMode, Position, RetractMode};

const TOOL_CHANGE_CODES: [&str; 2] = ["M6", "M06"];
const MESSAGE_CODE: &str = "message";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmitError {
    #[error("{label} is not a path; select only paths and compounds")]
    Structural { label: String },

    #[error("{code} is missing required parameter {letter}")]
    MissingParameter { code: String, letter: char },

    #[error("{code} has invalid parameter {letter}: {reason}")]
    InvalidParameter {
        code: String,
        letter: char,
        reason: &'static str,
    },

    #[error("cannot write {letter} = {quantity} in {unit}")]
    UnitConversion {
        letter: char,
        quantity: String,
        unit: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, EmitError>;

/// One export run. State starts fresh for every emitter, so two runs
/// never share a position or a modal code.
pub struct Emitter<'a> {
    policy: &'a DialectPolicy,
    config: &'a Config,
    units: OutputUnits,
    state: EmitterState,
    output: GCodeOutput,
    timestamp: Option<NaiveDateTime>,
}

impl<'a> Emitter<'a> {
    pub fn new(policy: &'a DialectPolicy, config: &'a Config) -> Self {
        let numbers = LineNumbers::new(
            config.line_start,
            config.line_increment,
            config.line_numbers,
        );
        Self {
            policy,
            config,
            units: config.units,
            state: EmitterState::new(policy),
            output: GCodeOutput::new(numbers, &policy.separator),
            timestamp: None,
        }
    }

    /// Fixed header time instead of the wall clock
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn state(&self) -> &EmitterState {
        &self.state
    }

    pub fn generate(mut self, nodes: &[PathNode]) -> Result<String> {
        info!(
            dialect = %self.policy.name,
            operations = nodes.len(),
            "postprocessing"
        );

        self.emit_header();
        self.emit_preamble();

        for node in nodes {
            self.emit_operation(node)?;
        }

        let config = self.config;
        if config.comments {
            self.output.emit_comment("begin postamble");
        }
        self.output.emit_block(&config.postamble);

        info!(lines = self.output.lines.len(), "done postprocessing");
        Ok(self.output.to_string())
    }

    fn emit_header(&mut self) {
        if !self.config.header {
            return;
        }
        let time = self
            .timestamp
            .unwrap_or_else(|| Local::now().naive_local());
        self.output.emit_comment(&format!(
            "Exported by charly-post {}",
            env!("CARGO_PKG_VERSION")
        ));
        self.output
            .emit_comment(&format!("Post Processor: {}", self.policy.name));
        self.output.emit_comment(&format!(
            "Output Time: {}",
            time.format("%Y-%m-%d %H:%M:%S")
        ));
    }

    /// Preamble, then units and motion mode unless the preamble already
    /// selected them
    fn emit_preamble(&mut self) {
        let (policy, config) = (self.policy, self.config);
        let preamble = config.preamble.as_str();

        if config.comments {
            self.output.emit_comment("begin preamble");
        }
        self.output.emit_block(preamble);

        let units = [OutputUnits::Metric, OutputUnits::Imperial]
            .into_iter()
            .find(|&units| policy.mentions_units(preamble, units));
        match units {
            Some(units) => {
                debug!(?units, "units selected by preamble");
                self.units = units;
            }
            None => {
                let code = policy.units_code(self.units).to_string();
                self.output.emit(&[code]);
            }
        }

        let mode = [MotionMode::Absolute, MotionMode::Relative]
            .into_iter()
            .find(|mode| {
                preamble.contains(policy.translate(mode.code())) || preamble.contains(mode.code())
            });
        match mode {
            Some(mode) => self.state.motion_mode = mode,
            None => {
                let code = policy.translate(self.state.motion_mode.code()).to_string();
                self.output.emit(&[code]);
            }
        }
    }

    fn emit_operation(&mut self, node: &PathNode) -> Result<()> {
        if let PathNode::Other { label } = node {
            return Err(EmitError::Structural {
                label: label.clone(),
            });
        }

        let (policy, comments) = (self.policy, self.config.comments);
        if comments {
            self.output
                .emit_comment(&format!("begin operation: {}", node.label()));
        }
        self.output.emit_block(&policy.pre_operation);

        self.emit_node(node)?;

        if comments {
            self.output
                .emit_comment(&format!("finish operation: {}", node.label()));
        }
        self.output.emit_block(&policy.post_operation);
        Ok(())
    }

    fn emit_node(&mut self, node: &PathNode) -> Result<()> {
        let comments = self.config.comments;
        match node {
            PathNode::Compound { label, children } => {
                if comments {
                    self.output.emit_comment(&format!("compound: {}", label));
                }
                for child in children {
                    self.emit_node(child)?;
                }
            }
            PathNode::Leaf { label, commands } => {
                debug!(label = %label, commands = commands.len(), "path");
                if comments {
                    self.output.emit_comment(&format!("Path: {}", label));
                }
                self.state.last_code = None;
                for command in commands {
                    self.emit_command(command)?;
                }
            }
            PathNode::Other { label } => debug!(label = %label, "skipping node without a toolpath"),
        }
        Ok(())
    }

    fn emit_command(&mut self, command: &Command) -> Result<()> {
        let (policy, comments) = (self.policy, self.config.comments);
        let code = policy.translate(&command.code);
        let mut commented = false;

        if TOOL_CHANGE_CODES.iter().any(|c| *c == code) {
            if comments {
                self.output.emit_comment("begin toolchange");
            }
            if policy.tool_change_output {
                self.output.emit_block(&policy.tool_change);
            } else {
                commented = true;
            }
            self.state.force_full_coordinates = true;
        }

        let repeated = self.state.last_code.as_deref() == Some(code);
        let show_code = !(policy.modal_output && policy.is_modal(code) && repeated);

        let rapid = policy.is_rapid(code);
        let mut params = Vec::new();
        for &letter in &policy.parameter_order {
            if let Some(quantity) = command.param(letter) {
                if let Some(word) = self.param_word(letter, quantity, rapid)? {
                    params.push((letter, word));
                }
            }
        }

        if policy.is_motion(code) {
            if params.is_empty() {
                trace!(code, "motion without coordinates dropped");
                return Ok(());
            }
            self.track_position(command)?;
            if self.state.force_full_coordinates {
                self.complete_axes(&mut params);
                self.state.force_full_coordinates = false;
            }
        }

        // Only codes that reach the output count for modal suppression
        self.state.last_code = Some(code.to_string());

        if let Some(mode) = MotionMode::from_code(code) {
            self.state.motion_mode = mode;
        }
        if let Some(mode) = RetractMode::from_code(code) {
            self.state.retract_mode = mode;
        }

        let mut words = Vec::with_capacity(params.len() + 1);
        if show_code {
            words.push(code.to_string());
        }
        words.extend(params.into_iter().map(|(_, word)| word));

        let mut cycle_end = None;
        if let Some(cycle) = CannedCycle::from_code(&command.code) {
            if !policy.canned_cycles {
                return self.expand_cycle(cycle, command, &words);
            }
            cycle_end = Some(self.cycle_geometry(cycle, command)?.end_position());
        }

        if command.code == MESSAGE_CODE {
            if !comments {
                return Ok(());
            }
            if show_code {
                words.remove(0);
            }
            let mut parts: Vec<String> = command.text.iter().cloned().collect();
            parts.extend(words);
            self.output.emit_commented(&parts);
            return Ok(());
        }

        if commented || policy.is_suppressed(code) {
            self.output.emit_commented(&words);
        } else {
            self.output.emit(&words);
        }

        if let Some(end) = cycle_end {
            self.state.position = end;
        }
        Ok(())
    }

    /// `letter` plus its value in output units, or `None` when the word
    /// is left out (feed on rapids, zero feed)
    fn param_word(&self, letter: char, quantity: &Quantity, rapid: bool) -> Result<Option<String>> {
        let precision = self.config.precision;
        let value = match ParamClass::of(letter) {
            ParamClass::ArcCenter(axis) if self.policy.absolute_arc_centers => {
                let center = self.length(letter, quantity)? + self.state.position.get(axis);
                units::format_fixed(self.units.length(center), precision)
            }
            ParamClass::Feed => {
                if rapid {
                    return Ok(None);
                }
                let speed = self.speed(letter, quantity)?;
                if speed <= 0.0 {
                    return Ok(None);
                }
                units::format_fixed(speed, precision)
            }
            ParamClass::Count => self.count(letter, quantity)?,
            ParamClass::Angle => match quantity {
                Quantity::Angle(angle) => units::format_fixed(units::degrees(*angle), precision),
                Quantity::Scalar(value) if value.is_finite() => {
                    units::format_fixed(*value, precision)
                }
                other => {
                    return Err(EmitError::UnitConversion {
                        letter,
                        quantity: other.to_string(),
                        unit: "deg",
                    })
                }
            },
            ParamClass::ArcCenter(_) | ParamClass::Length => {
                let length = self.length(letter, quantity)?;
                units::format_fixed(self.units.length(length), precision)
            }
        };
        Ok(Some(format!("{}{}", letter, value)))
    }

    pub(crate) fn length(&self, letter: char, quantity: &Quantity) -> Result<Length> {
        match quantity {
            Quantity::Length(length) if self.units.length(*length).is_finite() => Ok(*length),
            other => Err(EmitError::UnitConversion {
                letter,
                quantity: other.to_string(),
                unit: self.units.length_label(),
            }),
        }
    }

    /// Feed rate in output units per minute
    pub(crate) fn speed(&self, letter: char, quantity: &Quantity) -> Result<f64> {
        match quantity {
            Quantity::Velocity(velocity) if self.units.speed(*velocity).is_finite() => {
                Ok(self.units.speed(*velocity))
            }
            other => Err(EmitError::UnitConversion {
                letter,
                quantity: other.to_string(),
                unit: self.units.speed_label(),
            }),
        }
    }

    pub(crate) fn count(&self, letter: char, quantity: &Quantity) -> Result<String> {
        match quantity {
            Quantity::Count(count) => Ok(count.to_string()),
            Quantity::Scalar(value) if value.is_finite() => Ok(value.to_string()),
            other => Err(EmitError::UnitConversion {
                letter,
                quantity: other.to_string(),
                unit: "a plain number",
            }),
        }
    }

    /// Cached position follows the axes the command names; relative moves
    /// are added to it so the cache always holds machine coordinates.
    fn track_position(&mut self, command: &Command) -> Result<()> {
        for axis in Axis::ALL {
            let Some(quantity) = command.param(axis.letter()) else {
                continue;
            };
            let value = self.length(axis.letter(), quantity)?;
            let target = match self.state.motion_mode {
                MotionMode::Absolute => value,
                MotionMode::Relative => self.state.position.get(axis) + value,
            };
            self.state.position.set(axis, target);
        }
        Ok(())
    }

    /// Add the X, Y and Z words a forced-full motion is missing
    fn complete_axes(&self, params: &mut Vec<(char, String)>) {
        let policy = self.policy;
        for axis in Axis::ALL {
            let letter = axis.letter();
            if params.iter().any(|(present, _)| *present == letter) {
                continue;
            }
            let value = match self.state.motion_mode {
                MotionMode::Absolute => self.units.length(self.state.position.get(axis)),
                MotionMode::Relative => 0.0,
            };
            params.push((
                letter,
                format!("{}{}", letter, units::format_fixed(value, self.config.precision)),
            ));
        }
        params.sort_by_key(|(letter, _)| policy.order_of(*letter).unwrap_or(0));
    }
}
