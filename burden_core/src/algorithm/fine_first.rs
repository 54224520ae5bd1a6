use burden_traits::{Calibration, CalibrationPair};

use super::CalibrationAlgorithm;
use crate::context::{CalibrationContext, Dimension};
use crate::error::{CalibrationError, Result};
use crate::step::CalibrationStep;

/// Fine moves tried per pair, largest first.
const FINE_MAGNITUDES: [i16; 5] = [20, 10, 5, 2, 1];
/// Fine trim set after a coarse move.
const FINE_CENTER: u8 = 64;
/// Fine trims outside `FINE_LOW..=FINE_HIGH` skip the fine search unless
/// coarse sits at its own limit.
const FINE_LOW: u8 = 10;
const FINE_HIGH: u8 = 120;

/// Fine trim first with shrinking magnitudes, one coarse count as fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct FineFirstCalibrator;

/// Fine search is pointless near the fine limits while coarse can still move.
fn fine_search_allowed(pair: CalibrationPair) -> bool {
    (pair.coarse() == 0 || pair.fine() >= FINE_LOW)
        && (pair.coarse() == burden_traits::TRIM_MAX || pair.fine() <= FINE_HIGH)
}

impl FineFirstCalibrator {
    fn improve(
        ctx: &mut dyn CalibrationContext,
        dim: Dimension,
        baseline: &CalibrationStep,
    ) -> Result<Option<CalibrationStep>> {
        let dir = dim.direction(&baseline.deviation);
        if dir == 0 {
            return Ok(None);
        }
        let current = ctx.current_calibration();
        let pair = dim.pair(&current);

        if fine_search_allowed(pair) {
            for magnitude in FINE_MAGNITUDES {
                let Some(moved) = pair.change_fine(dir * magnitude) else {
                    continue;
                };
                let step = ctx.measure(dim.with_pair(current, moved))?;
                if step.improves_on(baseline) {
                    return Ok(Some(step));
                }
                ctx.record_rejected(step);
            }
        }

        let Some(moved) = pair.change_coarse(dir, false) else {
            return Ok(None);
        };
        let moved = moved.with_fine(FINE_CENTER).map_err(CalibrationError::from)?;
        let step = ctx.measure(dim.with_pair(current, moved))?;
        if step.improves_on(baseline) {
            return Ok(Some(step));
        }
        ctx.record_rejected(step);
        Ok(None)
    }
}

impl CalibrationAlgorithm for FineFirstCalibrator {
    fn create_initial_calibration(&self, hardware: Calibration) -> Calibration {
        hardware
    }

    fn iterate(&mut self, ctx: &mut dyn CalibrationContext) -> Result<Option<CalibrationStep>> {
        let baseline = ctx.last_step().clone();
        for dim in Dimension::by_magnitude(&baseline.deviation) {
            if let Some(step) = Self::improve(ctx, dim, &baseline)? {
                return Ok(Some(step));
            }
        }
        Ok(None)
    }

    fn continue_after_cycle_detection(&mut self) -> bool {
        true
    }
}
