//! One measured point of a calibration search.

use burden_traits::{Calibration, GoalValue, Measurement};

use crate::goal::GoalDeviation;

/// Whether a measured step became part of the search path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Accepted(Calibration),
    /// Measured but discarded: not better, or a repeat of an earlier setting.
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationStep {
    pub outcome: StepOutcome,
    pub values: GoalValue,
    pub measured_range: Option<f64>,
    pub deviation: GoalDeviation,
    /// Burden-side reading, reporting only.
    pub burden_values: Option<GoalValue>,
    pub burden_deviation: Option<GoalDeviation>,
    /// Scale factor the source applied; stamped on the final step of a run.
    pub factor: Option<f64>,
    /// Ordinal within the run; `None` for rejected and verification steps.
    pub iteration: Option<usize>,
}

impl CalibrationStep {
    pub fn accepted(calibration: Calibration, measurement: Measurement, deviation: GoalDeviation) -> Self {
        Self {
            outcome: StepOutcome::Accepted(calibration),
            values: measurement.values,
            measured_range: measurement.measured_range,
            deviation,
            burden_values: None,
            burden_deviation: None,
            factor: None,
            iteration: None,
        }
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        match &self.outcome {
            StepOutcome::Accepted(c) => Some(c),
            StepOutcome::Rejected => None,
        }
    }

    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, StepOutcome::Accepted(_))
    }

    #[inline]
    pub fn total_abs_delta(&self) -> f64 {
        self.deviation.total_abs_delta()
    }

    /// Strictly lower total absolute deviation than `other`.
    #[inline]
    pub fn improves_on(&self, other: &Self) -> bool {
        self.total_abs_delta() < other.total_abs_delta()
    }

    #[must_use]
    pub fn into_rejected(mut self) -> Self {
        self.outcome = StepOutcome::Rejected;
        self.iteration = None;
        self
    }
}
