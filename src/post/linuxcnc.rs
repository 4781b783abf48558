//! LinuxCNC policy
//!
//! LinuxCNC speaks standard G21/G20, runs G81/G82/G83 natively and keeps
//! arc centers as offsets from the start point.

use std::collections::{BTreeMap, BTreeSet};

use crate::codegen::{MotionMode, RetractMode};
use crate::post::{codes, DialectPolicy};

pub fn policy() -> DialectPolicy {
    DialectPolicy {
        name: "LinuxCNC".to_string(),
        substitutions: BTreeMap::new(),
        suppressed: BTreeSet::new(),
        modal: codes(&["G0", "G00", "G1", "G01"]),
        motion: codes(&["G0", "G00", "G1", "G01", "G2", "G02", "G3", "G03"]),
        rapid: codes(&["G0", "G00"]),
        parameter_order: "XYZABCIJKFSTHDQRLP".chars().collect(),
        separator: " ".to_string(),
        tool_change: String::new(),
        tool_change_output: true,
        modal_output: true,
        absolute_arc_centers: false,
        pre_operation: String::new(),
        post_operation: String::new(),
        canned_cycles: true,
        retract_mode: RetractMode::OldZ,
        motion_mode: MotionMode::Absolute,
    }
}
