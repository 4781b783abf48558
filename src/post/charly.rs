//! Charly robot policy
//!
//! Charly controllers select units with G71/G70 instead of G21/G20, reject
//! work offsets, plane selection and cycle return codes, and have no canned
//! drilling cycles. G81/G82/G83 are expanded to G0/G1 moves.

use crate::codegen::{MotionMode, RetractMode};
use crate::post::{codes, DialectPolicy};

pub fn policy() -> DialectPolicy {
    DialectPolicy {
        name: "Charly Robot".to_string(),
        substitutions: [("G21", "G71"), ("G20", "G70")]
            .into_iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect(),
        suppressed: codes(&[
            "G98", "G99", "G80", "G17", "G53", "G54", "G55", "G56", "G57", "G58", "G59",
        ]),
        modal: codes(&["G0", "G00", "G1", "G01"]),
        motion: codes(&["G0", "G00", "G1", "G01", "G2", "G02", "G3", "G03"]),
        rapid: codes(&["G0", "G00"]),
        parameter_order: "XYZABIJFSTQRLP".chars().collect(),
        separator: " ".to_string(),
        tool_change: String::new(),
        tool_change_output: true,
        modal_output: true,
        absolute_arc_centers: true,
        pre_operation: String::new(),
        post_operation: String::new(),
        canned_cycles: false,
        retract_mode: RetractMode::OldZ,
        motion_mode: MotionMode::Absolute,
    }
}
