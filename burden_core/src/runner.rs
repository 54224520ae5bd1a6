//! Full load-point calibration: search, permanent write, verification.

use std::sync::atomic::{AtomicBool, Ordering};

use burden_traits::{BurdenDevice, Calibration};
use eyre::WrapErr;

use crate::calibrator::{CalibrationRequest, Calibrator, PreparedRun};
use crate::context::measure_step;
use crate::error::{CalibrationError, Report, Result};
use crate::goal::effective_goal;
use crate::hw_error::device_error;
use crate::status::StepReport;
use crate::step::CalibrationStep;

/// Reduce an upper verification factor so the burden's terminal voltage
/// `nominal_power_va * factor / range` stays at or below `max_voltage`.
///
/// The replacement is the largest supported factor that fits. When none
/// fits, the exact bound is returned.
pub fn clamp_upper_factor(
    requested: f64,
    nominal_power_va: f64,
    range: f64,
    max_voltage: f64,
    supported: &[f64],
) -> f64 {
    let voltage = nominal_power_va * requested / range;
    if voltage <= max_voltage {
        return requested;
    }
    let bound = max_voltage * range / nominal_power_va;
    supported
        .iter()
        .copied()
        .filter(|f| *f <= bound)
        .fold(None, |best: Option<f64>, f| Some(best.map_or(f, |b| b.max(f))))
        .unwrap_or(bound)
}

impl<D: BurdenDevice> Calibrator<D> {
    /// Search, write the best calibration permanently, then measure it at
    /// the lower and upper verification points.
    ///
    /// Cancellation before the write leaves the stored calibration untouched.
    pub fn calibrate_step(
        &mut self,
        voltage_not_current: bool,
        request: &CalibrationRequest,
        cancel: &AtomicBool,
    ) -> Result<StepReport> {
        let outcome = self.run(voltage_not_current, request, cancel)?;
        if cancel.load(Ordering::Relaxed) {
            return Err(Report::new(CalibrationError::Cancelled));
        }
        let missing = || Report::new(CalibrationError::State("no completed search".into()));
        let run = self.prepared.clone().ok_or_else(missing)?;
        let mut nominal = self.best_step().cloned().ok_or_else(missing)?;
        let calibration = *nominal.calibration().ok_or_else(missing)?;
        nominal.factor = Some(run.applied_factor);

        self.device
            .set_permanent_calibration(&request.burden, &request.range, &request.step, &calibration)
            .map_err(device_error)
            .wrap_err("write permanent calibration")?;
        tracing::info!(
            burden = %request.burden,
            range = %request.range,
            step = %request.step,
            calibration = %calibration,
            "calibration written"
        );

        let (lower, upper) = self.verification.factors(voltage_not_current);
        let upper = if voltage_not_current {
            upper
        } else {
            let clamped = clamp_upper_factor(
                upper,
                run.nominal_goal.apparent_power_va,
                run.range.value(),
                self.verification.max_terminal_voltage_v,
                &self.verification.supported_factors,
            );
            if clamped < upper {
                tracing::info!(requested = upper, used = clamped, "upper verification factor reduced");
            }
            clamped
        };
        let lower = self.verify_at(&run, calibration, lower)?;
        let upper = self.verify_at(&run, calibration, upper)?;

        Ok(StepReport {
            outcome,
            calibration,
            nominal,
            lower,
            upper,
        })
    }

    fn verify_at(
        &mut self,
        run: &PreparedRun,
        calibration: Calibration,
        factor: f64,
    ) -> Result<CalibrationStep> {
        let prepared = self
            .device
            .prepare(&run.request(factor, true))
            .map_err(device_error)
            .wrap_err_with(|| format!("prepare verification point at {factor}"))?;
        let goal = effective_goal(run.nominal_goal, prepared.applied_factor);
        let mut step = measure_step(
            &mut self.device,
            calibration,
            goal,
            prepared.prepared_range,
            true,
        )?;
        step.factor = Some(prepared.applied_factor);
        tracing::debug!(
            factor = prepared.applied_factor,
            delta_power = step.deviation.delta_power,
            delta_factor = step.deviation.delta_factor,
            "verification point measured"
        );
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const FACTORS: [f64; 8] = [0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 1.5, 2.0];

    #[rstest]
    // 25 VA at 0.5 A: 2.0 would mean 100 V, 1.78 is the bound
    #[case(2.0, 25.0, 0.5, 1.5)]
    // 2.0 at 5 A is 10 V, no clamp
    #[case(2.0, 25.0, 5.0, 2.0)]
    // exactly at the limit
    #[case(2.0, 44.5, 1.0, 2.0)]
    // 100 VA at 0.1 A: bound 0.089
    #[case(2.0, 100.0, 0.1, 0.05)]
    fn clamps_to_largest_supported_factor(
        #[case] requested: f64,
        #[case] power: f64,
        #[case] range: f64,
        #[case] expected: f64,
    ) {
        let f = clamp_upper_factor(requested, power, range, 89.0, &FACTORS);
        assert_eq!(f, expected);
        assert!(power * f / range <= 89.0 + 1e-9);
    }

    #[test]
    fn falls_back_to_the_bound_when_nothing_fits() {
        let f = clamp_upper_factor(2.0, 10_000.0, 0.1, 89.0, &FACTORS);
        assert!((f - 0.00089).abs() < 1e-12);
    }
}
