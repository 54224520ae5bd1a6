//! Simulated burden and reference meter.
//!
//! `SimulatedBurden` implements [`BurdenDevice`] with a deterministic,
//! separable response model:
//!
//! - trim position of a pair is `coarse * 128 + fine`
//! - power factor rises linearly with the resistive position
//! - apparent power falls linearly with the inductive position
//! - at the configured optimum both equal the selected step's goal, scaled by
//!   the applied factor squared
pub mod error;

use std::collections::HashMap;

use burden_traits::{
    BurdenDevice, Calibration, CalibrationPair, DeviceError, GoalValue, Measurement,
    PrepareRequest, PreparedLoadpoint,
};

use crate::error::{HwError, Result};

/// Fine counts per coarse count.
const FINE_PER_COARSE: f64 = 128.0;

/// Response model of the simulated burden.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorParams {
    /// Trim setting at which the burden hits its step goal exactly.
    pub resistive_optimum: CalibrationPair,
    pub inductive_optimum: CalibrationPair,
    /// Relative power-factor change per coarse count of resistive trim.
    pub factor_slope: f64,
    /// Relative apparent-power change per coarse count of inductive trim.
    pub power_slope: f64,
    /// Ratio between the voltage/current the meter sees and the one prepared.
    pub measured_range_ratio: f64,
    /// Relative offset of the burden's own reading against the meter.
    pub burden_reading_offset: f64,
}

impl Default for SimulatorParams {
    fn default() -> Self {
        Self {
            resistive_optimum: pair(70, 64),
            inductive_optimum: pair(58, 64),
            factor_slope: 0.01,
            power_slope: 0.01,
            measured_range_ratio: 1.0,
            burden_reading_offset: 0.0,
        }
    }
}

fn pair(coarse: u8, fine: u8) -> CalibrationPair {
    CalibrationPair::new(coarse, fine).unwrap_or_else(|_| unreachable!("constant in range"))
}

#[inline]
fn position(p: CalibrationPair) -> f64 {
    f64::from(p.coarse()) * FINE_PER_COARSE + f64::from(p.fine())
}

type LoadpointKey = (String, String, String);

/// A permanent write the simulator received.
#[derive(Debug, Clone, PartialEq)]
pub struct PermanentWrite {
    pub burden: String,
    pub range: String,
    pub step: String,
    pub calibration: Calibration,
}

#[derive(Debug)]
pub struct SimulatedBurden {
    params: SimulatorParams,
    stored: HashMap<LoadpointKey, Option<Calibration>>,
    default_calibration: Option<Calibration>,
    active: bool,
    calibration_measurement: bool,
    burden: Option<String>,
    range: Option<String>,
    target: Option<GoalValue>,
    applied_factor: f64,
    prepared_range: f64,
    last_calibration: Option<Calibration>,
    prepares: Vec<PrepareRequest>,
    writes: Vec<PermanentWrite>,
    measurements: usize,
    fail_after: Option<usize>,
}

impl Default for SimulatedBurden {
    fn default() -> Self {
        Self::new(SimulatorParams::default())
    }
}

impl SimulatedBurden {
    pub fn new(params: SimulatorParams) -> Self {
        Self {
            params,
            stored: HashMap::new(),
            default_calibration: Some(Calibration::new(pair(64, 64), pair(64, 64))),
            active: false,
            calibration_measurement: false,
            burden: None,
            range: None,
            target: None,
            applied_factor: 1.0,
            prepared_range: 1.0,
            last_calibration: None,
            prepares: Vec::new(),
            writes: Vec::new(),
            measurements: 0,
            fail_after: None,
        }
    }

    /// Store a calibration (or `None` for "not calibratable") for a load point.
    pub fn with_loadpoint(
        mut self,
        burden: &str,
        range: &str,
        step: &str,
        calibration: Option<Calibration>,
    ) -> Self {
        self.stored.insert(
            (burden.to_string(), range.to_string(), step.to_string()),
            calibration,
        );
        self
    }

    /// Calibration reported for load points not in the table.
    pub fn with_default_calibration(mut self, calibration: Option<Calibration>) -> Self {
        self.default_calibration = calibration;
        self
    }

    /// Make every reference-meter read after the first `n` fail with a timeout.
    pub fn with_failure_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn params(&self) -> &SimulatorParams {
        &self.params
    }

    /// Every `prepare` request received, in order.
    pub fn prepares(&self) -> &[PrepareRequest] {
        &self.prepares
    }

    pub fn permanent_writes(&self) -> &[PermanentWrite] {
        &self.writes
    }

    /// Number of reference-meter reads served.
    pub fn measurement_count(&self) -> usize {
        self.measurements
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn calibration_measurement_enabled(&self) -> bool {
        self.calibration_measurement
    }

    /// Burden and range last selected, if any.
    pub fn selection(&self) -> (Option<&str>, Option<&str>) {
        (self.burden.as_deref(), self.range.as_deref())
    }

    /// Noise-free reading the model produces for `calibration` at `target`,
    /// before the applied factor and range ratio.
    pub fn response(&self, calibration: &Calibration, target: GoalValue) -> GoalValue {
        let p = &self.params;
        let dr = (position(calibration.resistive) - position(p.resistive_optimum)) / FINE_PER_COARSE;
        let di = (position(calibration.inductive) - position(p.inductive_optimum)) / FINE_PER_COARSE;
        let power_factor = (target.power_factor * (1.0 + p.factor_slope * dr)).clamp(1e-6, 1.0);
        let apparent_power_va = (target.apparent_power_va * (1.0 - p.power_slope * di)).max(1e-9);
        GoalValue::new(apparent_power_va, power_factor)
    }

    fn read(&mut self, calibration: &Calibration) -> Result<Measurement> {
        if !self.active {
            return Err(HwError::Inactive);
        }
        let target = self.target.ok_or(HwError::NoStepSelected)?;
        if let Some(n) = self.fail_after
            && self.measurements >= n
        {
            return Err(HwError::Timeout);
        }
        self.measurements += 1;
        let ratio = self.params.measured_range_ratio;
        let k = self.applied_factor * self.applied_factor * ratio * ratio;
        let values = self.response(calibration, target).with_power_scaled(k);
        tracing::trace!(
            calibration = %calibration,
            apparent_power_va = values.apparent_power_va,
            power_factor = values.power_factor,
            "simulated reference reading"
        );
        Ok(Measurement {
            values,
            measured_range: Some(self.prepared_range * ratio),
        })
    }
}

impl BurdenDevice for SimulatedBurden {
    fn get_calibration(
        &mut self,
        burden: &str,
        range: &str,
        step: &str,
    ) -> std::result::Result<Option<Calibration>, DeviceError> {
        let key = (burden.to_string(), range.to_string(), step.to_string());
        Ok(match self.stored.get(&key) {
            Some(stored) => *stored,
            None => self.default_calibration,
        })
    }

    fn measure(&mut self, calibration: &Calibration) -> std::result::Result<Measurement, DeviceError> {
        let m = self.read(calibration)?;
        self.last_calibration = Some(*calibration);
        Ok(m)
    }

    fn measure_burden(&mut self) -> std::result::Result<Measurement, DeviceError> {
        let calibration = self
            .last_calibration
            .or(self.default_calibration)
            .ok_or(HwError::NoStepSelected)?;
        let mut m = self.read(&calibration)?;
        let k = 1.0 + self.params.burden_reading_offset;
        m.values = GoalValue::new(m.values.apparent_power_va * k, m.values.power_factor);
        m.measured_range = None;
        Ok(m)
    }

    fn prepare(
        &mut self,
        request: &PrepareRequest,
    ) -> std::result::Result<PreparedLoadpoint, DeviceError> {
        self.prepares.push(request.clone());
        self.applied_factor = request.scale_factor;
        self.prepared_range = request.range.value() * request.scale_factor;
        if request.activate {
            self.active = true;
        }
        tracing::debug!(
            range = %request.range,
            scale_factor = request.scale_factor,
            frequency_hz = request.frequency_hz,
            "simulated loadpoint prepared"
        );
        Ok(PreparedLoadpoint {
            applied_factor: self.applied_factor,
            prepared_range: self.prepared_range,
        })
    }

    fn set_permanent_calibration(
        &mut self,
        burden: &str,
        range: &str,
        step: &str,
        calibration: &Calibration,
    ) -> std::result::Result<(), DeviceError> {
        self.stored.insert(
            (burden.to_string(), range.to_string(), step.to_string()),
            Some(*calibration),
        );
        self.writes.push(PermanentWrite {
            burden: burden.to_string(),
            range: range.to_string(),
            step: step.to_string(),
            calibration: *calibration,
        });
        Ok(())
    }

    fn cancel_calibration(&mut self) -> std::result::Result<(), DeviceError> {
        self.calibration_measurement = false;
        Ok(())
    }

    fn set_calibration_measurement(&mut self, enabled: bool) -> std::result::Result<(), DeviceError> {
        self.calibration_measurement = enabled;
        Ok(())
    }

    fn activate(&mut self, on: bool) -> std::result::Result<(), DeviceError> {
        self.active = on;
        Ok(())
    }

    fn select_burden(&mut self, burden: &str) -> std::result::Result<(), DeviceError> {
        self.burden = Some(burden.to_string());
        Ok(())
    }

    fn select_range(&mut self, range: &str) -> std::result::Result<(), DeviceError> {
        self.range = Some(range.to_string());
        Ok(())
    }

    fn select_step(&mut self, step: &str) -> std::result::Result<(), DeviceError> {
        let target =
            GoalValue::parse(step).map_err(|e| HwError::InvalidStep(e.to_string()))?;
        self.target = Some(target);
        Ok(())
    }
}
