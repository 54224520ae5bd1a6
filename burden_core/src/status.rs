//! How a calibration run ended.

use burden_traits::Calibration;

use crate::goal::GoalDeviation;
use crate::step::CalibrationStep;

/// Why the search loop stopped. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Total deviation fell below the configured epsilon.
    Converged,
    /// The strategy had nothing left to try.
    NoFurtherStep,
    /// A repeated calibration was proposed and the strategy chose to stop.
    CycleDetected,
    /// `max_steps` iterations ran out.
    StepLimit,
}

impl Termination {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::NoFurtherStep => "no-further-step",
            Self::CycleDetected => "cycle-detected",
            Self::StepLimit => "step-limit",
        }
    }
}

/// Result of `Calibrator::run`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub termination: Termination,
    /// Steps recorded, accepted and rejected.
    pub steps: usize,
    pub calibration: Calibration,
    pub deviation: GoalDeviation,
    /// Scale factor the source applied during the search.
    pub applied_factor: f64,
}

/// Result of `Calibrator::calibrate_step`: the written calibration and its
/// three verification measurements.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub outcome: RunOutcome,
    /// Calibration written permanently.
    pub calibration: Calibration,
    pub nominal: CalibrationStep,
    pub lower: CalibrationStep,
    pub upper: CalibrationStep,
}
