//! Goal values, burden standards and the relative deviation the search minimises.

use core::fmt;
use core::str::FromStr;

use burden_traits::GoalValue;

use crate::config::ScalingCfg;
use crate::error::CalibrationError;

/// Burden standard a load point belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BurdenStandard {
    Iec50,
    Iec60,
    Ansi,
}

impl BurdenStandard {
    /// Source frequency the standard is calibrated at.
    pub const fn frequency_hz(self) -> f64 {
        match self {
            Self::Iec50 => 50.0,
            Self::Iec60 | Self::Ansi => 60.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Iec50 => "IEC50",
            Self::Iec60 => "IEC60",
            Self::Ansi => "ANSI",
        }
    }
}

impl FromStr for BurdenStandard {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IEC50" => Ok(Self::Iec50),
            "IEC60" => Ok(Self::Iec60),
            "ANSI" => Ok(Self::Ansi),
            _ => Err(CalibrationError::UnsupportedBurden(s.to_string())),
        }
    }
}

impl fmt::Display for BurdenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative deviation of a measurement from its goal: `actual / goal - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GoalDeviation {
    pub delta_power: f64,
    pub delta_factor: f64,
}

impl GoalDeviation {
    pub fn between(actual: GoalValue, goal: GoalValue) -> Self {
        debug_assert!(
            goal.apparent_power_va != 0.0 && goal.power_factor != 0.0,
            "goal values must be non-zero"
        );
        Self {
            delta_power: actual.apparent_power_va / goal.apparent_power_va - 1.0,
            delta_factor: actual.power_factor / goal.power_factor - 1.0,
        }
    }

    /// `|delta_power| + |delta_factor|`, the figure every strategy minimises.
    #[inline]
    pub fn total_abs_delta(&self) -> f64 {
        self.delta_power.abs() + self.delta_factor.abs()
    }
}

impl fmt::Display for GoalDeviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:+.4}% power, {:+.4}% factor",
            self.delta_power * 100.0,
            self.delta_factor * 100.0
        )
    }
}

/// Deviation of `values` from `goal`.
///
/// When the meter reports the range it actually saw, the goal power is
/// rescaled by `(measured / prepared)^2` first, since burden power follows
/// the square of the applied voltage or current.
pub fn make_deviation(
    values: GoalValue,
    goal: GoalValue,
    measured_range: Option<f64>,
    prepared_range: f64,
) -> GoalDeviation {
    let goal = match measured_range {
        Some(measured) if prepared_range > 0.0 => {
            let r = measured / prepared_range;
            goal.with_power_scaled(r * r)
        }
        _ => goal,
    };
    GoalDeviation::between(values, goal)
}

/// Nominal step goal adjusted for the standard (ANSI power factor) at unit scale.
pub fn nominal_goal(step: GoalValue, standard: BurdenStandard, scaling: &ScalingCfg) -> GoalValue {
    match standard {
        BurdenStandard::Ansi => step.with_power_scaled(scaling.ansi_power_factor),
        BurdenStandard::Iec50 | BurdenStandard::Iec60 => step,
    }
}

/// Goal the meter should read once the source applies `applied_factor`.
#[inline]
pub fn effective_goal(nominal: GoalValue, applied_factor: f64) -> GoalValue {
    nominal.with_power_scaled(applied_factor * applied_factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("IEC50", BurdenStandard::Iec50, 50.0)]
    #[case("iec60", BurdenStandard::Iec60, 60.0)]
    #[case(" ANSI ", BurdenStandard::Ansi, 60.0)]
    fn parses_standards(#[case] text: &str, #[case] expected: BurdenStandard, #[case] hz: f64) {
        let s: BurdenStandard = text.parse().unwrap();
        assert_eq!(s, expected);
        assert_eq!(s.frequency_hz(), hz);
    }

    #[test]
    fn unknown_standard_is_rejected() {
        let err = "IEC61".parse::<BurdenStandard>().unwrap_err();
        assert!(matches!(err, CalibrationError::UnsupportedBurden(ref s) if s == "IEC61"));
    }

    #[test]
    fn deviation_is_relative() {
        let d = GoalDeviation::between(GoalValue::new(26.0, 0.63), GoalValue::new(25.0, 0.70));
        assert!((d.delta_power - 0.04).abs() < 1e-12);
        assert!((d.delta_factor + 0.1).abs() < 1e-12);
        assert!((d.total_abs_delta() - 0.14).abs() < 1e-12);
    }

    #[test]
    fn measured_range_rescales_goal_power() {
        let goal = GoalValue::new(25.0, 0.7);
        // meter saw 10 % more voltage, so 21 % more power is expected
        let values = GoalValue::new(25.0 * 1.21, 0.7);
        let d = make_deviation(values, goal, Some(110.0), 100.0);
        assert!(d.total_abs_delta() < 1e-12);

        let plain = make_deviation(values, goal, None, 100.0);
        assert!((plain.delta_power - 0.21).abs() < 1e-12);
    }

    #[test]
    fn ansi_goal_gets_power_factor_and_scale() {
        let scaling = ScalingCfg::default();
        let step = GoalValue::new(12.5, 0.1);
        let nominal = nominal_goal(step, BurdenStandard::Ansi, &scaling);
        assert!((nominal.apparent_power_va - 12.8125).abs() < 1e-12);
        let eff = effective_goal(nominal, 0.1);
        assert!((eff.apparent_power_va - 0.128125).abs() < 1e-12);
        assert_eq!(eff.power_factor, 0.1);
        assert_eq!(nominal_goal(step, BurdenStandard::Iec60, &scaling), step);
    }
}
