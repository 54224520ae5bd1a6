//! Test and helper mocks for burden_core.

use burden_traits::{
    BurdenDevice, Calibration, DeviceError, GoalValue, Measurement, PrepareRequest,
    PreparedLoadpoint,
};

/// A device whose reference reading is a closure of the applied calibration.
///
/// The closure returns the reading at unit scale; `measure` multiplies the
/// apparent power by the prepared factor squared. No range is reported.
pub struct FnDevice<F> {
    model: F,
    stored: Option<Calibration>,
    applied_factor: f64,
    prepared_range: f64,
    last: Option<Calibration>,
    pub prepares: Vec<PrepareRequest>,
    pub writes: Vec<Calibration>,
    pub measurements: usize,
}

impl<F: FnMut(&Calibration) -> GoalValue> FnDevice<F> {
    pub fn new(stored: Option<Calibration>, model: F) -> Self {
        Self {
            model,
            stored,
            applied_factor: 1.0,
            prepared_range: 0.0,
            last: None,
            prepares: Vec::new(),
            writes: Vec::new(),
            measurements: 0,
        }
    }

    fn read(&mut self, calibration: &Calibration) -> Measurement {
        self.measurements += 1;
        let k = self.applied_factor * self.applied_factor;
        Measurement {
            values: (self.model)(calibration).with_power_scaled(k),
            measured_range: None,
        }
    }
}

impl<F: FnMut(&Calibration) -> GoalValue> BurdenDevice for FnDevice<F> {
    fn get_calibration(
        &mut self,
        _burden: &str,
        _range: &str,
        _step: &str,
    ) -> Result<Option<Calibration>, DeviceError> {
        Ok(self.stored)
    }

    fn measure(&mut self, calibration: &Calibration) -> Result<Measurement, DeviceError> {
        self.last = Some(*calibration);
        Ok(self.read(calibration))
    }

    fn measure_burden(&mut self) -> Result<Measurement, DeviceError> {
        let c = self
            .last
            .ok_or_else(|| DeviceError::from("nothing measured yet"))?;
        Ok(self.read(&c))
    }

    fn prepare(&mut self, request: &PrepareRequest) -> Result<PreparedLoadpoint, DeviceError> {
        self.prepares.push(request.clone());
        self.applied_factor = request.scale_factor;
        self.prepared_range = request.range.value() * request.scale_factor;
        Ok(PreparedLoadpoint {
            applied_factor: self.applied_factor,
            prepared_range: self.prepared_range,
        })
    }

    fn set_permanent_calibration(
        &mut self,
        _burden: &str,
        _range: &str,
        _step: &str,
        calibration: &Calibration,
    ) -> Result<(), DeviceError> {
        self.stored = Some(*calibration);
        self.writes.push(*calibration);
        Ok(())
    }

    fn cancel_calibration(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn set_calibration_measurement(&mut self, _enabled: bool) -> Result<(), DeviceError> {
        Ok(())
    }

    fn activate(&mut self, _on: bool) -> Result<(), DeviceError> {
        Ok(())
    }

    fn select_burden(&mut self, _burden: &str) -> Result<(), DeviceError> {
        Ok(())
    }

    fn select_range(&mut self, _range: &str) -> Result<(), DeviceError> {
        Ok(())
    }

    fn select_step(&mut self, _step: &str) -> Result<(), DeviceError> {
        Ok(())
    }
}
