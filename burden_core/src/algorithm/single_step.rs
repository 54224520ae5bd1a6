use burden_traits::Calibration;

use super::CalibrationAlgorithm;
use crate::context::{CalibrationContext, Dimension};
use crate::error::Result;
use crate::step::CalibrationStep;

/// Greedy one-count descent.
///
/// Per iteration, the pair with the larger deviation component goes first.
/// While a pair's coarse trim is free, a single coarse count is probed; the
/// first probe that fails to improve fixes that coarse trim for the rest of
/// the run. Then a single fine count is tried. The first strictly better
/// step is returned.
#[derive(Debug, Clone, Default)]
pub struct SingleStepCalibrator {
    resistive_coarse_fixed: bool,
    inductive_coarse_fixed: bool,
    cycles: u32,
}

impl SingleStepCalibrator {
    pub fn coarse_fixed(&self, dim: Dimension) -> bool {
        match dim {
            Dimension::Resistive => self.resistive_coarse_fixed,
            Dimension::Inductive => self.inductive_coarse_fixed,
        }
    }

    fn fix_coarse(&mut self, dim: Dimension) {
        if !self.coarse_fixed(dim) {
            tracing::debug!(?dim, "coarse trim fixed");
        }
        match dim {
            Dimension::Resistive => self.resistive_coarse_fixed = true,
            Dimension::Inductive => self.inductive_coarse_fixed = true,
        }
    }

    fn improve(
        &mut self,
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

        if !self.coarse_fixed(dim) {
            if let Some(moved) = pair.change_coarse(dir, false) {
                let step = ctx.measure(dim.with_pair(current, moved))?;
                if step.improves_on(baseline) {
                    return Ok(Some(step));
                }
            }
            // failed coarse probes are not kept in the log
            self.fix_coarse(dim);
        }

        let Some(moved) = pair.change_fine(dir) else {
            return Ok(None);
        };
        let step = ctx.measure(dim.with_pair(current, moved))?;
        if step.improves_on(baseline) {
            return Ok(Some(step));
        }
        ctx.record_rejected(step);
        Ok(None)
    }
}

impl CalibrationAlgorithm for SingleStepCalibrator {
    fn create_initial_calibration(&self, hardware: Calibration) -> Calibration {
        hardware
    }

    fn iterate(&mut self, ctx: &mut dyn CalibrationContext) -> Result<Option<CalibrationStep>> {
        let baseline = ctx.last_step().clone();
        for dim in Dimension::by_magnitude(&baseline.deviation) {
            if let Some(step) = self.improve(ctx, dim, &baseline)? {
                return Ok(Some(step));
            }
        }
        Ok(None)
    }

    /// The first cycle fixes both coarse trims and continues; the second stops.
    fn continue_after_cycle_detection(&mut self) -> bool {
        self.cycles += 1;
        if self.cycles > 1 {
            return false;
        }
        self.fix_coarse(Dimension::Resistive);
        self.fix_coarse(Dimension::Inductive);
        true
    }
}
