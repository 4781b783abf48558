//! Dialect policies for target controllers
//!
//! Controllers disagree on a handful of codes: which word selects units,
//! which codes they reject, which are modal, whether drilling cycles exist.
//! A [`DialectPolicy`] captures those quirks as plain data so a new
//! controller is a new policy value, not a change to the emitter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codegen::{MotionMode, RetractMode};
use crate::units::OutputUnits;

pub mod charly;
pub mod linuxcnc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectPolicy {
    /// Controller name, shown in the program header
    pub name: String,
    /// Generic code -> dialect code
    pub substitutions: BTreeMap<String, String>,
    /// Codes written as comments instead of being executed
    pub suppressed: BTreeSet<String>,
    /// Codes that need not be repeated on consecutive lines
    pub modal: BTreeSet<String>,
    pub motion: BTreeSet<String>,
    pub rapid: BTreeSet<String>,
    /// Output order of parameter words
    pub parameter_order: Vec<char>,
    pub separator: String,
    /// Text spliced in before every tool change
    pub tool_change: String,
    /// When false, tool changes are written as comments
    pub tool_change_output: bool,
    /// Drop repeated modal codes
    pub modal_output: bool,
    /// Arc centers (I/J) are written as absolute coordinates
    pub absolute_arc_centers: bool,
    pub pre_operation: String,
    pub post_operation: String,
    /// Native G81/G82/G83 support; without it cycles are expanded
    pub canned_cycles: bool,
    pub retract_mode: RetractMode,
    pub motion_mode: MotionMode,
}

impl Default for DialectPolicy {
    fn default() -> Self {
        charly::policy()
    }
}

impl DialectPolicy {
    /// Load a policy from JSON; missing fields keep the Charly defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let content = std::fs::read_to_string(path)?;
        let policy: DialectPolicy = serde_json::from_str(&content)?;
        Ok(policy)
    }

    /// Built-in preset by name, or else a JSON policy file
    pub fn resolve(name_or_path: &str) -> Result<Self, crate::Error> {
        match name_or_path.parse::<DialectKind>() {
            Ok(kind) => Ok(kind.policy()),
            Err(_) => Self::from_file(name_or_path),
        }
    }

    pub fn translate<'a>(&'a self, code: &'a str) -> &'a str {
        self.substitutions
            .get(code)
            .map(String::as_str)
            .unwrap_or(code)
    }

    pub fn is_suppressed(&self, code: &str) -> bool {
        self.suppressed.contains(code)
    }

    pub fn is_modal(&self, code: &str) -> bool {
        self.modal.contains(code)
    }

    pub fn is_motion(&self, code: &str) -> bool {
        self.motion.contains(code)
    }

    pub fn is_rapid(&self, code: &str) -> bool {
        self.rapid.contains(code)
    }

    /// Position of `letter` in the output order
    pub fn order_of(&self, letter: char) -> Option<usize> {
        self.parameter_order.iter().position(|&l| l == letter)
    }

    /// Units-select code as this controller spells it
    pub fn units_code(&self, units: OutputUnits) -> &str {
        self.translate(units.generic_code())
    }

    /// Whether `text` selects `units`, in either generic or dialect spelling
    pub fn mentions_units(&self, text: &str, units: OutputUnits) -> bool {
        text.contains(self.units_code(units)) || text.contains(units.generic_code())
    }
}

pub(crate) fn codes(list: &[&str]) -> BTreeSet<String> {
    list.iter().map(|c| c.to_string()).collect()
}

/// Built-in policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialectKind {
    #[default]
    Charly,   // Charly robot, cycles expanded
    LinuxCnc, // LinuxCNC, native cycles
}

impl DialectKind {
    pub fn policy(self) -> DialectPolicy {
        match self {
            DialectKind::Charly => charly::policy(),
            DialectKind::LinuxCnc => linuxcnc::policy(),
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialectKind::Charly => write!(f, "charly"),
            DialectKind::LinuxCnc => write!(f, "linuxcnc"),
        }
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "charly" | "charly_robot" => Ok(DialectKind::Charly),
            "linuxcnc" | "emc" => Ok(DialectKind::LinuxCnc),
            _ => Err(format!("unknown dialect: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_translate() {
        let policy = DialectKind::Charly.policy();
        assert_eq!(policy.translate("G21"), "G71");
        assert_eq!(policy.translate("G20"), "G70");
        assert_eq!(policy.translate("G1"), "G1");

        let policy = DialectKind::LinuxCnc.policy();
        assert_eq!(policy.translate("G21"), "G21");
    }

    #[test]
    fn test_units_detection() {
        let policy = DialectKind::Charly.policy();
        assert!(policy.mentions_units("G17\nG71", OutputUnits::Metric));
        assert!(policy.mentions_units("G21 G90", OutputUnits::Metric));
        assert!(policy.mentions_units("G70", OutputUnits::Imperial));
        assert!(!policy.mentions_units("G17 G90", OutputUnits::Imperial));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Charly".parse::<DialectKind>(), Ok(DialectKind::Charly));
        assert_eq!("linuxcnc".parse::<DialectKind>(), Ok(DialectKind::LinuxCnc));
        assert!("fanuc".parse::<DialectKind>().is_err());
        assert_eq!(DialectKind::LinuxCnc.to_string(), "linuxcnc");
    }

    #[test]
    fn test_partial_policy_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "name": "Shop mill", "suppressed": ["G17"], "separator": "", "canned_cycles": true }}"#
        )
        .unwrap();

        let policy = DialectPolicy::resolve(file.path().to_str().unwrap()).unwrap();
        assert_eq!(policy.name, "Shop mill");
        assert!(policy.is_suppressed("G17"));
        assert!(!policy.is_suppressed("G98"));
        assert_eq!(policy.separator, "");
        assert!(policy.canned_cycles);
        assert_eq!(policy.translate("G21"), "G71");
        assert!(policy.is_rapid("G0"));
    }

    #[test]
    fn test_resolve_unknown_file_fails() {
        assert!(matches!(
            DialectPolicy::resolve("/nonexistent/dialect.json"),
            Err(crate::Error::Io(_))
        ));
    }
}
