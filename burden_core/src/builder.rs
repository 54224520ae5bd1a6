//! Type-state builder for `Calibrator`.
//!
//! `build()` only exists once a device has been supplied; configuration
//! is validated there.

use burden_traits::BurdenDevice;

use crate::calibrator::Calibrator;
use crate::config::{ScalingCfg, SearchCfg, VerificationCfg};
use crate::error::{BuildError, Result};

/// Type-state marker: no device yet.
#[derive(Debug)]
pub struct Missing;

#[derive(Debug)]
pub struct CalibratorBuilder<D> {
    device: D,
    search: SearchCfg,
    scaling: ScalingCfg,
    verification: VerificationCfg,
}

impl Default for CalibratorBuilder<Missing> {
    fn default() -> Self {
        Self {
            device: Missing,
            search: SearchCfg::default(),
            scaling: ScalingCfg::default(),
            verification: VerificationCfg::default(),
        }
    }
}

impl CalibratorBuilder<Missing> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device<D: BurdenDevice>(self, device: D) -> CalibratorBuilder<D> {
        CalibratorBuilder {
            device,
            search: self.search,
            scaling: self.scaling,
            verification: self.verification,
        }
    }
}

impl<D> CalibratorBuilder<D> {
    #[must_use]
    pub fn with_search(mut self, search: SearchCfg) -> Self {
        self.search = search;
        self
    }

    #[must_use]
    pub fn with_scaling(mut self, scaling: ScalingCfg) -> Self {
        self.scaling = scaling;
        self
    }

    #[must_use]
    pub fn with_verification(mut self, verification: VerificationCfg) -> Self {
        self.verification = verification;
        self
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.search.max_steps = max_steps;
        self
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.search.epsilon = epsilon;
        self
    }
}

impl<D: BurdenDevice> CalibratorBuilder<D> {
    pub fn build(self) -> Result<Calibrator<D>> {
        validate(&self.search, &self.scaling, &self.verification)?;
        Ok(Calibrator::from_parts(
            self.device,
            self.search,
            self.scaling,
            self.verification,
        ))
    }
}

fn positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Single source of truth for runtime config validation.
pub(crate) fn validate(
    search: &SearchCfg,
    scaling: &ScalingCfg,
    verification: &VerificationCfg,
) -> core::result::Result<(), BuildError> {
    if search.max_steps == 0 {
        return Err(BuildError::InvalidConfig("max_steps must be >= 1"));
    }
    if !search.epsilon.is_finite() || search.epsilon < 0.0 {
        return Err(BuildError::InvalidConfig("epsilon must be finite and >= 0"));
    }
    if !positive(scaling.ansi_power_factor) {
        return Err(BuildError::InvalidConfig("ansi_power_factor must be > 0"));
    }
    if !positive(scaling.current_base_factor) || scaling.current_base_factor > 1.0 {
        return Err(BuildError::InvalidConfig(
            "current_base_factor must be in (0, 1]",
        ));
    }
    let factors = [
        verification.voltage_lower,
        verification.voltage_upper,
        verification.current_lower,
        verification.current_upper,
    ];
    if !factors.into_iter().all(positive) {
        return Err(BuildError::InvalidConfig(
            "verification factors must be > 0",
        ));
    }
    if !positive(verification.max_terminal_voltage_v) {
        return Err(BuildError::InvalidConfig(
            "max_terminal_voltage_v must be > 0",
        ));
    }
    if verification.supported_factors.is_empty()
        || !verification.supported_factors.iter().copied().all(positive)
    {
        return Err(BuildError::InvalidConfig(
            "supported_factors must be non-empty and > 0",
        ));
    }
    Ok(())
}
