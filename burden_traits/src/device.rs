//! The burden + reference-meter collaborator the calibration engine drives.
//!
//! Methods block until the hardware answers. Errors are boxed at this
//! boundary; the engine maps them to its own typed errors.

use crate::calibration::Calibration;
use crate::values::{GoalValue, NominalRange};

/// Error type crossing the device boundary.
pub type DeviceError = Box<dyn std::error::Error + Send + Sync>;

/// One reference-meter reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub values: GoalValue,
    /// Voltage or current the meter actually saw, when it reports one.
    pub measured_range: Option<f64>,
}

/// Parameters for putting the source into a load point.
#[derive(Debug, Clone, PartialEq)]
pub struct PrepareRequest {
    pub voltage_not_current: bool,
    pub range: NominalRange,
    /// Fraction of the nominal range to generate (1.0 = 100 %).
    pub scale_factor: f64,
    pub frequency_hz: f64,
    pub choose_best_range: bool,
    pub nominal_power_va: f64,
    pub activate: bool,
}

impl PrepareRequest {
    /// Terminal voltage this request implies for the nominal burden power.
    ///
    /// Voltage burdens see the generated voltage directly; current burdens
    /// develop `S / I` across their terminals.
    pub fn implied_voltage(&self) -> f64 {
        if self.voltage_not_current {
            self.range.value() * self.scale_factor
        } else {
            let power = self.nominal_power_va * self.scale_factor * self.scale_factor;
            power / (self.range.value() * self.scale_factor)
        }
    }
}

/// What the source actually applied after `prepare`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedLoadpoint {
    pub applied_factor: f64,
    /// Voltage or current the source was set to.
    pub prepared_range: f64,
}

pub trait BurdenDevice {
    /// Stored calibration for a load point; `None` when it is not calibratable.
    fn get_calibration(
        &mut self,
        burden: &str,
        range: &str,
        step: &str,
    ) -> Result<Option<Calibration>, DeviceError>;

    /// Apply `calibration` temporarily and read the reference meter.
    fn measure(&mut self, calibration: &Calibration) -> Result<Measurement, DeviceError>;

    /// Read the burden's own measurement (reporting only).
    fn measure_burden(&mut self) -> Result<Measurement, DeviceError>;

    fn prepare(&mut self, request: &PrepareRequest) -> Result<PreparedLoadpoint, DeviceError>;

    fn set_permanent_calibration(
        &mut self,
        burden: &str,
        range: &str,
        step: &str,
        calibration: &Calibration,
    ) -> Result<(), DeviceError>;

    /// Abort any calibration the burden is currently running.
    fn cancel_calibration(&mut self) -> Result<(), DeviceError>;
    fn set_calibration_measurement(&mut self, enabled: bool) -> Result<(), DeviceError>;
    fn activate(&mut self, on: bool) -> Result<(), DeviceError>;
    fn select_burden(&mut self, burden: &str) -> Result<(), DeviceError>;
    fn select_range(&mut self, range: &str) -> Result<(), DeviceError>;
    fn select_step(&mut self, step: &str) -> Result<(), DeviceError>;
}

impl<T: BurdenDevice + ?Sized> BurdenDevice for Box<T> {
    fn get_calibration(
        &mut self,
        burden: &str,
        range: &str,
        step: &str,
    ) -> Result<Option<Calibration>, DeviceError> {
        (**self).get_calibration(burden, range, step)
    }
    fn measure(&mut self, calibration: &Calibration) -> Result<Measurement, DeviceError> {
        (**self).measure(calibration)
    }
    fn measure_burden(&mut self) -> Result<Measurement, DeviceError> {
        (**self).measure_burden()
    }
    fn prepare(&mut self, request: &PrepareRequest) -> Result<PreparedLoadpoint, DeviceError> {
        (**self).prepare(request)
    }
    fn set_permanent_calibration(
        &mut self,
        burden: &str,
        range: &str,
        step: &str,
        calibration: &Calibration,
    ) -> Result<(), DeviceError> {
        (**self).set_permanent_calibration(burden, range, step, calibration)
    }
    fn cancel_calibration(&mut self) -> Result<(), DeviceError> {
        (**self).cancel_calibration()
    }
    fn set_calibration_measurement(&mut self, enabled: bool) -> Result<(), DeviceError> {
        (**self).set_calibration_measurement(enabled)
    }
    fn activate(&mut self, on: bool) -> Result<(), DeviceError> {
        (**self).activate(on)
    }
    fn select_burden(&mut self, burden: &str) -> Result<(), DeviceError> {
        (**self).select_burden(burden)
    }
    fn select_range(&mut self, range: &str) -> Result<(), DeviceError> {
        (**self).select_range(range)
    }
    fn select_step(&mut self, step: &str) -> Result<(), DeviceError> {
        (**self).select_step(step)
    }
}
