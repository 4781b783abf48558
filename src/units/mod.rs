//! Output unit systems and fixed-point number formatting
//!
//! Toolpath quantities arrive as typed `uom` values in whatever unit the CAM
//! side used. They are only reduced to bare numbers here, right before they
//! are printed in the controller's unit system.

use serde::{Deserialize, Serialize};
use uom::si::angle::degree;
use uom::si::f64::{Angle, Length, Velocity};
use uom::si::length::{inch, millimeter};
use uom::si::velocity::{inch_per_second, millimeter_per_second};

/// Unit system of the generated program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputUnits {
    #[default]
    Metric,   // mm, mm/min
    Imperial, // in, in/min
}

impl OutputUnits {
    /// Generic units-select code, before any dialect substitution
    pub fn generic_code(self) -> &'static str {
        match self {
            OutputUnits::Metric => "G21",
            OutputUnits::Imperial => "G20",
        }
    }

    pub fn length_label(self) -> &'static str {
        match self {
            OutputUnits::Metric => "mm",
            OutputUnits::Imperial => "in",
        }
    }

    pub fn speed_label(self) -> &'static str {
        match self {
            OutputUnits::Metric => "mm/min",
            OutputUnits::Imperial => "in/min",
        }
    }

    /// Length expressed in this unit system
    pub fn length(self, value: Length) -> f64 {
        match self {
            OutputUnits::Metric => value.get::<millimeter>(),
            OutputUnits::Imperial => value.get::<inch>(),
        }
    }

    /// Feed rate expressed per minute in this unit system
    pub fn speed(self, value: Velocity) -> f64 {
        let per_second = match self {
            OutputUnits::Metric => value.get::<millimeter_per_second>(),
            OutputUnits::Imperial => value.get::<inch_per_second>(),
        };
        per_second * 60.0
    }
}

pub fn degrees(value: Angle) -> f64 {
    value.get::<degree>()
}

/// Fixed-point text with `precision` decimals. Values that round to zero
/// never carry a minus sign.
pub fn format_fixed(value: f64, precision: usize) -> String {
    let text = format!("{:.*}", precision, value);
    match text.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uom::si::angle::radian;
    use uom::si::length::centimeter;

    #[test]
    fn test_metric_lengths() {
        let units = OutputUnits::Metric;
        assert_eq!(format_fixed(units.length(Length::new::<centimeter>(2.5)), 3), "25.000");
        assert_eq!(format_fixed(units.length(Length::new::<inch>(1.0)), 3), "25.400");
    }

    #[test]
    fn test_same_length_in_different_units_formats_identically() {
        for units in [OutputUnits::Metric, OutputUnits::Imperial] {
            let from_mm = format_fixed(units.length(Length::new::<millimeter>(50.8)), 4);
            let from_in = format_fixed(units.length(Length::new::<inch>(2.0)), 4);
            assert_eq!(from_mm, from_in);
        }
    }

    #[test]
    fn test_speed_is_per_minute() {
        let feed = Velocity::new::<millimeter_per_second>(5.0);
        assert_eq!(format_fixed(OutputUnits::Metric.speed(feed), 3), "300.000");

        let feed = Velocity::new::<inch_per_second>(1.0);
        assert_eq!(format_fixed(OutputUnits::Imperial.speed(feed), 2), "60.00");
    }

    #[test]
    fn test_degrees() {
        let quarter = Angle::new::<radian>(std::f64::consts::FRAC_PI_2);
        assert_eq!(format_fixed(degrees(quarter), 3), "90.000");
    }

    #[test]
    fn test_no_negative_zero() {
        assert_eq!(format_fixed(-0.0, 3), "0.000");
        assert_eq!(format_fixed(-0.0001, 3), "0.000");
        assert_eq!(format_fixed(-0.0001, 0), "0");
        assert_eq!(format_fixed(-1.26, 1), "-1.3");
        assert_eq!(format_fixed(-10.0, 3), "-10.000");
    }

    #[test]
    fn test_unit_codes() {
        assert_eq!(OutputUnits::Metric.generic_code(), "G21");
        assert_eq!(OutputUnits::Imperial.generic_code(), "G20");
        assert_eq!(OutputUnits::Imperial.speed_label(), "in/min");
    }
}
