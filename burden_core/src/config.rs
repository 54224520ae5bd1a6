//! Runtime configuration for the calibration engine.
//!
//! These are separate from the TOML-deserialized config in `burden_config`;
//! see `conversions` for the mapping.

/// Search loop limits.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCfg {
    /// Hard cap on iterations of one run.
    pub max_steps: usize,
    /// Stop once the current total absolute deviation is below this. 0 disables.
    pub epsilon: f64,
    /// Read the burden's own measurement alongside every search step.
    pub measure_burden: bool,
}

impl Default for SearchCfg {
    fn default() -> Self {
        Self {
            max_steps: 1000,
            epsilon: 1e-4,
            measure_burden: false,
        }
    }
}

/// Goal corrections.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingCfg {
    /// Multiplies the apparent power of ANSI goals.
    pub ansi_power_factor: f64,
    /// Current burdens are searched at this fraction of their range.
    pub current_base_factor: f64,
}

impl Default for ScalingCfg {
    fn default() -> Self {
        Self {
            ansi_power_factor: 1.025,
            current_base_factor: 0.1,
        }
    }
}

/// Verification points measured after a permanent write.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationCfg {
    pub voltage_lower: f64,
    pub voltage_upper: f64,
    pub current_lower: f64,
    pub current_upper: f64,
    pub max_terminal_voltage_v: f64,
    pub supported_factors: Vec<f64>,
}

impl Default for VerificationCfg {
    fn default() -> Self {
        Self {
            voltage_lower: 0.8,
            voltage_upper: 1.2,
            current_lower: 0.01,
            current_upper: 2.0,
            max_terminal_voltage_v: 89.0,
            supported_factors: vec![0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 1.5, 2.0],
        }
    }
}

impl VerificationCfg {
    /// `(lower, upper)` scale factors for a burden kind, before clamping.
    pub const fn factors(&self, voltage_not_current: bool) -> (f64, f64) {
        if voltage_not_current {
            (self.voltage_lower, self.voltage_upper)
        } else {
            (self.current_lower, self.current_upper)
        }
    }
}
