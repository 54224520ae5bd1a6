//! Search strategies over the four trim registers.
//!
//! A strategy proposes the next accepted step; the orchestrator in
//! `Calibrator::run` owns the step log, cycle detection and termination.

mod fine_first;
mod interval;
mod null;
mod single_step;

use core::fmt;
use core::str::FromStr;

use burden_traits::Calibration;

use crate::context::CalibrationContext;
use crate::error::{CalibrationError, Result};
use crate::step::CalibrationStep;

pub use fine_first::FineFirstCalibrator;
pub use interval::{IntervalCalibrator, IntervalPhase};
pub use null::NullCalibrator;
pub use single_step::SingleStepCalibrator;

pub trait CalibrationAlgorithm {
    /// Calibration to measure as step 0, derived from what the hardware reports.
    fn create_initial_calibration(&self, hardware: Calibration) -> Calibration;

    /// Propose the next step, or `None` when the strategy has nothing left to try.
    ///
    /// The returned step has already been measured through `ctx`.
    fn iterate(&mut self, ctx: &mut dyn CalibrationContext) -> Result<Option<CalibrationStep>>;

    /// Called when a proposed calibration was already visited. `true` keeps
    /// searching from the best step so far, `false` ends the run.
    fn continue_after_cycle_detection(&mut self) -> bool;
}

/// Identifier of a search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlgorithmKind {
    Null,
    #[default]
    SingleStep,
    FineFirst,
    Interval,
}

impl AlgorithmKind {
    pub const ALL: [Self; 4] = [Self::Null, Self::SingleStep, Self::FineFirst, Self::Interval];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::SingleStep => "single-step",
            Self::FineFirst => "fine-first",
            Self::Interval => "interval",
        }
    }
}

impl FromStr for AlgorithmKind {
    type Err = CalibrationError;

    /// Case-insensitive; `-`, `_` and spaces are ignored, so `SingleStep`,
    /// `single-step` and `single_step` all resolve.
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "null" | "none" => Ok(Self::Null),
            "singlestep" => Ok(Self::SingleStep),
            "finefirst" => Ok(Self::FineFirst),
            "interval" | "bisect" => Ok(Self::Interval),
            _ => Err(CalibrationError::Argument(format!(
                "unknown calibration algorithm '{s}' (expected one of: null, single-step, fine-first, interval)"
            ))),
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy with fresh per-run state.
#[derive(Debug, Clone)]
pub enum Algorithm {
    Null(NullCalibrator),
    SingleStep(SingleStepCalibrator),
    FineFirst(FineFirstCalibrator),
    Interval(IntervalCalibrator),
}

impl Algorithm {
    pub fn new(kind: AlgorithmKind) -> Self {
        match kind {
            AlgorithmKind::Null => Self::Null(NullCalibrator),
            AlgorithmKind::SingleStep => Self::SingleStep(SingleStepCalibrator::default()),
            AlgorithmKind::FineFirst => Self::FineFirst(FineFirstCalibrator),
            AlgorithmKind::Interval => Self::Interval(IntervalCalibrator::default()),
        }
    }

    pub const fn kind(&self) -> AlgorithmKind {
        match self {
            Self::Null(_) => AlgorithmKind::Null,
            Self::SingleStep(_) => AlgorithmKind::SingleStep,
            Self::FineFirst(_) => AlgorithmKind::FineFirst,
            Self::Interval(_) => AlgorithmKind::Interval,
        }
    }

    fn inner(&mut self) -> &mut dyn CalibrationAlgorithm {
        match self {
            Self::Null(a) => a,
            Self::SingleStep(a) => a,
            Self::FineFirst(a) => a,
            Self::Interval(a) => a,
        }
    }
}

impl CalibrationAlgorithm for Algorithm {
    fn create_initial_calibration(&self, hardware: Calibration) -> Calibration {
        match self {
            Self::Null(a) => a.create_initial_calibration(hardware),
            Self::SingleStep(a) => a.create_initial_calibration(hardware),
            Self::FineFirst(a) => a.create_initial_calibration(hardware),
            Self::Interval(a) => a.create_initial_calibration(hardware),
        }
    }

    fn iterate(&mut self, ctx: &mut dyn CalibrationContext) -> Result<Option<CalibrationStep>> {
        self.inner().iterate(ctx)
    }

    fn continue_after_cycle_detection(&mut self) -> bool {
        self.inner().continue_after_cycle_detection()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("null", AlgorithmKind::Null)]
    #[case("SingleStep", AlgorithmKind::SingleStep)]
    #[case("single-step", AlgorithmKind::SingleStep)]
    #[case("FINE_FIRST", AlgorithmKind::FineFirst)]
    #[case("interval", AlgorithmKind::Interval)]
    fn resolves_identifiers(#[case] text: &str, #[case] kind: AlgorithmKind) {
        assert_eq!(text.parse::<AlgorithmKind>().unwrap(), kind);
        assert_eq!(Algorithm::new(kind).kind(), kind);
    }

    #[test]
    fn unknown_identifier_is_an_argument_error() {
        let err = "gradient".parse::<AlgorithmKind>().unwrap_err();
        assert!(err.is_argument());
        assert!(err.to_string().contains("gradient"));
    }

    #[test]
    fn display_round_trips() {
        for kind in AlgorithmKind::ALL {
            assert_eq!(kind.to_string().parse::<AlgorithmKind>().unwrap(), kind);
        }
    }
}
