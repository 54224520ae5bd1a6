use burden_traits::Calibration;

use super::CalibrationAlgorithm;
use crate::context::CalibrationContext;
use crate::error::Result;
use crate::step::CalibrationStep;

/// Measures the stored calibration once and never moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCalibrator;

impl CalibrationAlgorithm for NullCalibrator {
    fn create_initial_calibration(&self, hardware: Calibration) -> Calibration {
        hardware
    }

    fn iterate(&mut self, _ctx: &mut dyn CalibrationContext) -> Result<Option<CalibrationStep>> {
        Ok(None)
    }

    fn continue_after_cycle_detection(&mut self) -> bool {
        false
    }
}
