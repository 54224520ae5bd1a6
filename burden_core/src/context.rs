//! What a search strategy may ask of the running calibration.

use burden_traits::{BurdenDevice, Calibration, CalibrationPair, GoalValue};
use eyre::WrapErr;

use crate::error::Result;
use crate::goal::{GoalDeviation, make_deviation};
use crate::hw_error::device_error;
use crate::session::Session;
use crate::step::CalibrationStep;

/// Services the orchestrator offers a strategy during one iteration.
pub trait CalibrationContext {
    /// Apply `calibration` temporarily and measure it against the effective goal.
    fn measure(&mut self, calibration: Calibration) -> Result<CalibrationStep>;

    /// The current accepted step.
    fn last_step(&self) -> &CalibrationStep;

    fn current_calibration(&self) -> Calibration;

    fn effective_goal(&self) -> GoalValue;

    /// Deviation of the current accepted step.
    fn deviation(&self) -> GoalDeviation {
        self.last_step().deviation
    }

    /// Keep a measured but discarded step in the run log.
    fn record_rejected(&mut self, step: CalibrationStep);

    /// Forget visited calibrations, so earlier settings may be measured again.
    fn clear_cycle_memory(&mut self);
}

/// One of the two trim pairs.
///
/// The resistive pair moves the power factor, the inductive pair the
/// apparent power.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Resistive,
    Inductive,
}

impl Dimension {
    pub fn pair(self, calibration: &Calibration) -> CalibrationPair {
        match self {
            Self::Resistive => calibration.resistive,
            Self::Inductive => calibration.inductive,
        }
    }

    pub fn with_pair(self, calibration: Calibration, pair: CalibrationPair) -> Calibration {
        match self {
            Self::Resistive => calibration.with_resistive(pair),
            Self::Inductive => calibration.with_inductive(pair),
        }
    }

    /// Deviation component this pair corrects.
    pub fn component(self, deviation: &GoalDeviation) -> f64 {
        match self {
            Self::Resistive => deviation.delta_factor,
            Self::Inductive => deviation.delta_power,
        }
    }

    /// Sign of the trim move that reduces this pair's component; 0 when on target.
    ///
    /// Raising the resistive trim raises the power factor; raising the
    /// inductive trim lowers the apparent power.
    pub fn direction(self, deviation: &GoalDeviation) -> i16 {
        let c = self.component(deviation);
        if c == 0.0 || c.is_nan() {
            return 0;
        }
        match self {
            Self::Resistive if c > 0.0 => -1,
            Self::Resistive => 1,
            Self::Inductive if c > 0.0 => 1,
            Self::Inductive => -1,
        }
    }

    /// Both pairs, the one with the larger deviation component first.
    pub fn by_magnitude(deviation: &GoalDeviation) -> [Self; 2] {
        if deviation.delta_power.abs() > deviation.delta_factor.abs() {
            [Self::Inductive, Self::Resistive]
        } else {
            [Self::Resistive, Self::Inductive]
        }
    }
}

/// Context handed to strategies by `Calibrator::run`.
pub(crate) struct SearchContext<'a, D> {
    pub device: &'a mut D,
    pub session: &'a mut Session,
    pub effective_goal: GoalValue,
    pub prepared_range: f64,
    pub measure_burden: bool,
}

/// Measure `calibration` and compute its deviation from `goal`.
pub(crate) fn measure_step<D: BurdenDevice>(
    device: &mut D,
    calibration: Calibration,
    goal: GoalValue,
    prepared_range: f64,
    measure_burden: bool,
) -> Result<CalibrationStep> {
    let m = device
        .measure(&calibration)
        .map_err(device_error)
        .wrap_err_with(|| format!("measure {calibration}"))?;
    let deviation = make_deviation(m.values, goal, m.measured_range, prepared_range);
    let mut step = CalibrationStep::accepted(calibration, m, deviation);
    if measure_burden {
        let b = device
            .measure_burden()
            .map_err(device_error)
            .wrap_err("measure burden")?;
        step.burden_values = Some(b.values);
        step.burden_deviation = Some(make_deviation(
            b.values,
            goal,
            b.measured_range,
            prepared_range,
        ));
    }
    tracing::debug!(
        calibration = %calibration,
        deviation = %deviation,
        total = deviation.total_abs_delta(),
        "measured"
    );
    Ok(step)
}

impl<D: BurdenDevice> CalibrationContext for SearchContext<'_, D> {
    fn measure(&mut self, calibration: Calibration) -> Result<CalibrationStep> {
        measure_step(
            self.device,
            calibration,
            self.effective_goal,
            self.prepared_range,
            self.measure_burden,
        )
    }

    fn last_step(&self) -> &CalibrationStep {
        self.session.current()
    }

    fn current_calibration(&self) -> Calibration {
        self.session.current_calibration()
    }

    fn effective_goal(&self) -> GoalValue {
        self.effective_goal
    }

    fn record_rejected(&mut self, step: CalibrationStep) {
        tracing::trace!(total = step.total_abs_delta(), "step rejected");
        self.session.push_rejected(step);
    }

    fn clear_cycle_memory(&mut self) {
        self.session.clear_visited();
    }
}
