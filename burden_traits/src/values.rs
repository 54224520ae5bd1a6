//! Electrical quantities the calibration compares: goal values and ranges.

use core::fmt;

use crate::error::ModelError;

/// Apparent power and power factor, either as a target or as a measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalValue {
    pub apparent_power_va: f64,
    pub power_factor: f64,
}

impl GoalValue {
    pub const fn new(apparent_power_va: f64, power_factor: f64) -> Self {
        Self {
            apparent_power_va,
            power_factor,
        }
    }

    /// Parse the load-step notation `"apparent_power;power_factor"`,
    /// e.g. `"25.00;0.70"`. Both values must be finite and positive.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let Some((power, factor)) = text.split_once(';') else {
            return Err(ModelError::Argument(format!(
                "load step '{text}' must look like 'apparent_power;power_factor'"
            )));
        };
        let parse_field = |name: &str, raw: &str| -> Result<f64, ModelError> {
            let v = raw.trim().parse::<f64>().map_err(|_| {
                ModelError::Argument(format!("load step {name} '{raw}' is not a number"))
            })?;
            if !v.is_finite() || v <= 0.0 {
                return Err(ModelError::Argument(format!(
                    "load step {name} must be a positive number, got {v}"
                )));
            }
            Ok(v)
        };
        if factor.contains(';') {
            return Err(ModelError::Argument(format!(
                "load step '{text}' has more than two fields"
            )));
        }
        Ok(Self {
            apparent_power_va: parse_field("apparent power", power)?,
            power_factor: parse_field("power factor", factor)?,
        })
    }

    /// Multiply the apparent power, leaving the power factor untouched.
    #[inline]
    pub fn with_power_scaled(self, k: f64) -> Self {
        Self {
            apparent_power_va: self.apparent_power_va * k,
            ..self
        }
    }
}

impl fmt::Display for GoalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2};{:.2}", self.apparent_power_va, self.power_factor)
    }
}

/// A nominal voltage or current range as configured on burden and reference
/// meter, e.g. `"200"`, `"0.5"` or `"230/3"` (phase voltage, 230/√3 V).
#[derive(Debug, Clone, PartialEq)]
pub struct NominalRange {
    text: String,
    value: f64,
}

impl NominalRange {
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        let trimmed = text.trim();
        let number = |raw: &str| -> Result<f64, ModelError> {
            raw.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v > 0.0)
                .ok_or_else(|| ModelError::Argument(format!("invalid range '{text}'")))
        };
        let value = match trimmed.split_once('/') {
            Some((base, "3")) => number(base)? / 3f64.sqrt(),
            Some(_) => {
                return Err(ModelError::Argument(format!(
                    "range '{text}' only supports the '/3' phase notation"
                )));
            }
            None => number(trimmed)?,
        };
        Ok(Self {
            text: trimmed.to_string(),
            value,
        })
    }

    /// The range as the hardware names it.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Numeric value in volts or amperes.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl fmt::Display for NominalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_load_step() {
        let g = GoalValue::parse("25.00;0.70").unwrap();
        assert_eq!(g, GoalValue::new(25.0, 0.70));
        assert_eq!(g.to_string(), "25.00;0.70");
    }

    #[rstest]
    #[case("")]
    #[case("25")]
    #[case("25;0.7;1")]
    #[case("abc;0.7")]
    #[case("25;0")]
    #[case("-1;0.7")]
    #[case("NaN;0.7")]
    fn rejects_malformed_steps(#[case] text: &str) {
        assert!(matches!(GoalValue::parse(text), Err(ModelError::Argument(_))));
    }

    #[rstest]
    #[case("200", 200.0)]
    #[case("0.5", 0.5)]
    #[case(" 230/3 ", 230.0 / 3f64.sqrt())]
    fn parses_ranges(#[case] text: &str, #[case] expected: f64) {
        let r = NominalRange::parse(text).unwrap();
        assert!((r.value() - expected).abs() < 1e-12);
        assert_eq!(r.as_str(), text.trim());
    }

    #[rstest]
    #[case("")]
    #[case("0")]
    #[case("230/2")]
    #[case("x/3")]
    fn rejects_bad_ranges(#[case] text: &str) {
        assert!(NominalRange::parse(text).is_err());
    }
}
