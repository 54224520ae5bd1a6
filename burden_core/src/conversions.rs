//! `From` implementations bridging `burden_config` types to `burden_core` types.

use crate::algorithm::AlgorithmKind;
use crate::config::{ScalingCfg, SearchCfg, VerificationCfg};

impl From<burden_config::AlgorithmName> for AlgorithmKind {
    fn from(name: burden_config::AlgorithmName) -> Self {
        match name {
            burden_config::AlgorithmName::Null => Self::Null,
            burden_config::AlgorithmName::SingleStep => Self::SingleStep,
            burden_config::AlgorithmName::FineFirst => Self::FineFirst,
            burden_config::AlgorithmName::Interval => Self::Interval,
        }
    }
}

impl From<&burden_config::CalibratorCfg> for SearchCfg {
    fn from(c: &burden_config::CalibratorCfg) -> Self {
        Self {
            max_steps: c.max_steps,
            epsilon: c.epsilon,
            measure_burden: c.measure_burden,
        }
    }
}

impl From<&burden_config::ScalingCfg> for ScalingCfg {
    fn from(c: &burden_config::ScalingCfg) -> Self {
        Self {
            ansi_power_factor: c.ansi_power_factor,
            current_base_factor: c.current_base_factor,
        }
    }
}

impl From<&burden_config::VerificationCfg> for VerificationCfg {
    fn from(c: &burden_config::VerificationCfg) -> Self {
        Self {
            voltage_lower: c.voltage_lower,
            voltage_upper: c.voltage_upper,
            current_lower: c.current_lower,
            current_upper: c.current_upper,
            max_terminal_voltage_v: c.max_terminal_voltage_v,
            supported_factors: c.supported_factors.clone(),
        }
    }
}
