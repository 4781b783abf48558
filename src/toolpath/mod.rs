//! Toolpath model handed over by the CAM side
//!
//! A job is a list of [`PathNode`]s: compounds group other nodes, leaves
//! carry the commands to execute in order, and anything else (stock,
//! fixtures) is a placeholder that produces no motion.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Length, Velocity};
use uom::si::length::{centimeter, inch, meter, millimeter};
use uom::si::velocity::{inch_per_second, meter_per_second, millimeter_per_second};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantityError {
    #[error("invalid parameter name {0:?}: expected a single letter")]
    Letter(String),

    #[error("invalid number in {0:?}")]
    Number(String),

    #[error("unknown unit {unit:?} in {text:?}")]
    Unit { text: String, unit: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'X' => Some(Axis::X),
            'Y' => Some(Axis::Y),
            'Z' => Some(Axis::Z),
            _ => None,
        }
    }
}

/// How a parameter letter is treated on output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamClass {
    /// Arc center offset, relative to the given axis of the start point
    ArcCenter(Axis),
    Feed,
    Count,
    Angle,
    Length,
}

impl ParamClass {
    pub fn of(letter: char) -> Self {
        match letter {
            'I' => ParamClass::ArcCenter(Axis::X),
            'J' => ParamClass::ArcCenter(Axis::Y),
            'F' => ParamClass::Feed,
            'T' | 'H' | 'D' | 'S' | 'P' | 'L' => ParamClass::Count,
            'A' | 'B' | 'C' => ParamClass::Angle,
            _ => ParamClass::Length,
        }
    }
}

/// A parameter value tagged with its physical kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    Length(Length),
    Velocity(Velocity),
    Angle(Angle),
    Count(i64),
    Scalar(f64),
}

impl Quantity {
    pub fn mm(value: f64) -> Self {
        Quantity::Length(Length::new::<millimeter>(value))
    }

    pub fn inches(value: f64) -> Self {
        Quantity::Length(Length::new::<inch>(value))
    }

    pub fn mm_per_sec(value: f64) -> Self {
        Quantity::Velocity(Velocity::new::<millimeter_per_second>(value))
    }

    pub fn mm_per_min(value: f64) -> Self {
        Quantity::Velocity(Velocity::new::<millimeter_per_second>(value / 60.0))
    }

    pub fn degrees(value: f64) -> Self {
        Quantity::Angle(Angle::new::<degree>(value))
    }

    /// Bare number in the native unit of `letter`: mm for lengths, mm/s
    /// for feeds, degrees for rotary axes.
    pub fn native(letter: char, value: f64) -> Self {
        match ParamClass::of(letter) {
            ParamClass::Feed => Quantity::mm_per_sec(value),
            ParamClass::Angle => Quantity::degrees(value),
            ParamClass::Count if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => {
                Quantity::Count(value as i64)
            }
            ParamClass::Count => Quantity::Scalar(value),
            ParamClass::ArcCenter(_) | ParamClass::Length => Quantity::mm(value),
        }
    }

    /// Parse `"<number> [unit]"`, e.g. `"12.5 mm"`, `"1in"`, `"300 mm/min"`.
    /// Without a unit the letter's native kind applies.
    pub fn parse(letter: char, text: &str) -> Result<Self, QuantityError> {
        let text = text.trim();
        let split = text
            .find(|c: char| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')))
            .unwrap_or(text.len());
        let (number, unit) = text.split_at(split);
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| QuantityError::Number(text.to_string()))?;

        let quantity = match unit.trim() {
            "" => Quantity::native(letter, value),
            "mm" => Quantity::mm(value),
            "cm" => Quantity::Length(Length::new::<centimeter>(value)),
            "m" => Quantity::Length(Length::new::<meter>(value)),
            "in" | "inch" | "\"" => Quantity::inches(value),
            "mm/s" => Quantity::mm_per_sec(value),
            "mm/min" => Quantity::mm_per_min(value),
            "m/s" => Quantity::Velocity(Velocity::new::<meter_per_second>(value)),
            "in/s" => Quantity::Velocity(Velocity::new::<inch_per_second>(value)),
            "in/min" | "ipm" => Quantity::Velocity(Velocity::new::<inch_per_second>(value / 60.0)),
            "deg" | "°" => Quantity::degrees(value),
            "rad" => Quantity::Angle(Angle::new::<radian>(value)),
            other => {
                return Err(QuantityError::Unit {
                    text: text.to_string(),
                    unit: other.to_string(),
                })
            }
        };
        Ok(quantity)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Quantity::Length(_) => "length",
            Quantity::Velocity(_) => "velocity",
            Quantity::Angle(_) => "angle",
            Quantity::Count(_) => "count",
            Quantity::Scalar(_) => "dimensionless",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Length(v) => write!(f, "{} mm", v.get::<millimeter>()),
            Quantity::Velocity(v) => write!(f, "{} mm/s", v.get::<millimeter_per_second>()),
            Quantity::Angle(v) => write!(f, "{} deg", v.get::<degree>()),
            Quantity::Count(n) => write!(f, "{}", n),
            Quantity::Scalar(v) => write!(f, "{}", v),
        }
    }
}

/// One machine instruction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCommand")]
pub struct Command {
    pub code: String,
    pub params: BTreeMap<char, Quantity>,
    /// Free text carried by `message` commands
    pub text: Option<String>,
}

impl Command {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            params: BTreeMap::new(),
            text: None,
        }
    }

    pub fn message(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::new("message")
        }
    }

    pub fn with(mut self, letter: char, value: Quantity) -> Self {
        self.params.insert(letter, value);
        self
    }

    pub fn param(&self, letter: char) -> Option<&Quantity> {
        self.params.get(&letter)
    }
}

#[derive(Deserialize)]
struct RawCommand {
    #[serde(alias = "name")]
    code: String,
    #[serde(default, alias = "parameters")]
    params: BTreeMap<String, RawValue>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

impl TryFrom<RawCommand> for Command {
    type Error = QuantityError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let mut params = BTreeMap::new();
        for (name, value) in raw.params {
            let mut chars = name.chars();
            let letter = match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
                _ => return Err(QuantityError::Letter(name)),
            };
            let quantity = match value {
                RawValue::Number(v) => Quantity::native(letter, v),
                RawValue::Text(text) => Quantity::parse(letter, &text)?,
            };
            params.insert(letter, quantity);
        }

        Ok(Command {
            code: raw.code,
            params,
            text: raw.text,
        })
    }
}

/// Node of the toolpath tree
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PathNode {
    Compound {
        label: String,
        #[serde(default)]
        children: Vec<PathNode>,
    },
    #[serde(rename = "path")]
    Leaf {
        label: String,
        #[serde(default)]
        commands: Vec<Command>,
    },
    /// Stock, fixtures and other objects without a toolpath
    Other { label: String },
}

impl PathNode {
    pub fn compound(label: &str, children: Vec<PathNode>) -> Self {
        PathNode::Compound {
            label: label.to_string(),
            children,
        }
    }

    pub fn leaf(label: &str, commands: Vec<Command>) -> Self {
        PathNode::Leaf {
            label: label.to_string(),
            commands,
        }
    }

    pub fn other(label: &str) -> Self {
        PathNode::Other {
            label: label.to_string(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PathNode::Compound { label, .. }
            | PathNode::Leaf { label, .. }
            | PathNode::Other { label } => label,
        }
    }
}

/// Parse a job (JSON array of nodes)
pub fn from_json(json: &str) -> Result<Vec<PathNode>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Load a job from a JSON file
pub fn from_file(path: impl AsRef<Path>) -> Result<Vec<PathNode>, crate::Error> {
    let content = std::fs::read_to_string(path)?;
    Ok(from_json(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_native_kinds() {
        assert_eq!(Quantity::native('X', 2.0), Quantity::mm(2.0));
        assert_eq!(Quantity::native('I', -1.5), Quantity::mm(-1.5));
        assert_eq!(Quantity::native('F', 5.0), Quantity::mm_per_sec(5.0));
        assert_eq!(Quantity::native('A', 90.0), Quantity::degrees(90.0));
        assert_eq!(Quantity::native('T', 3.0), Quantity::Count(3));
        assert_eq!(Quantity::native('P', 0.5), Quantity::Scalar(0.5));
    }

    #[test]
    fn test_parse_with_units() {
        assert_eq!(Quantity::parse('X', "12.5 mm").unwrap(), Quantity::mm(12.5));
        assert_eq!(Quantity::parse('X', "1in").unwrap(), Quantity::inches(1.0));
        assert_eq!(Quantity::parse('Z', "-3").unwrap(), Quantity::mm(-3.0));
        assert_eq!(Quantity::parse('F', "5 mm/s").unwrap(), Quantity::mm_per_sec(5.0));
        assert_eq!(Quantity::parse('B', "45 deg").unwrap(), Quantity::degrees(45.0));
        assert_eq!(Quantity::parse('X', "1e1 mm").unwrap(), Quantity::mm(10.0));
        assert_eq!(Quantity::parse('P', "2").unwrap(), Quantity::Count(2));
        assert_eq!(Quantity::parse('X', "1.5 cm").unwrap().kind(), "length");
        assert_eq!(Quantity::parse('F', "600 mm/min").unwrap().kind(), "velocity");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Quantity::parse('X', "ten mm"),
            Err(QuantityError::Number(_))
        ));
        assert!(matches!(
            Quantity::parse('X', "10 furlong"),
            Err(QuantityError::Unit { .. })
        ));
    }

    #[test]
    fn test_tree_from_json() {
        let json = r#"[
            {
                "type": "compound",
                "label": "Job",
                "children": [
                    { "type": "other", "label": "Stock" },
                    {
                        "type": "path",
                        "label": "Profile",
                        "commands": [
                            { "name": "G0", "params": { "X": 10, "y": "1 in" } },
                            { "code": "G1", "parameters": { "Z": -2, "F": "300 mm/min" } },
                            { "name": "message", "text": "check clamps" }
                        ]
                    }
                ]
            }
        ]"#;

        let nodes = from_json(json).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].label(), "Job");

        let PathNode::Compound { children, .. } = &nodes[0] else {
            panic!("expected compound");
        };
        assert_eq!(children[0], PathNode::other("Stock"));

        let PathNode::Leaf { label, commands } = &children[1] else {
            panic!("expected path");
        };
        assert_eq!(label, "Profile");
        assert_eq!(commands[0].param('X'), Some(&Quantity::mm(10.0)));
        assert_eq!(commands[0].param('Y'), Some(&Quantity::inches(1.0)));
        assert_eq!(commands[1].code, "G1");
        assert_eq!(commands[1].param('F').map(Quantity::kind), Some("velocity"));
        assert_eq!(commands[2], Command::message("check clamps"));
    }

    #[test]
    fn test_bad_parameter_name_is_rejected() {
        let json = r#"[{ "type": "path", "label": "P", "commands": [
            { "name": "G0", "params": { "XY": 1 } }
        ]}]"#;
        let err = from_json(json).unwrap_err();
        assert!(err.to_string().contains("single letter"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{ "type": "path", "label": "Drill", "commands": [{{ "name": "G81" }}] }}]"#
        )
        .unwrap();

        let nodes = from_file(file.path()).unwrap();
        assert_eq!(nodes, vec![PathNode::leaf("Drill", vec![Command::new("G81")])]);
    }
}
