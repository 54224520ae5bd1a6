use burden_traits::{Calibration, CalibrationPair, ModelError};

use super::CalibrationAlgorithm;
use crate::context::{CalibrationContext, Dimension};
use crate::error::{CalibrationError, Report, Result};
use crate::step::CalibrationStep;

/// First step of every phase; steps then halve down to 1.
const START_WIDTH: i16 = 64;
const CENTER: u8 = 64;

/// Phases of the interval search, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalPhase {
    ResistiveCoarse,
    ResistiveFine,
    ImpedanceCoarse,
    ImpedanceFine,
    /// Terminal: nothing further to try.
    Adjust,
}

impl IntervalPhase {
    const fn next(self) -> Self {
        match self {
            Self::ResistiveCoarse => Self::ResistiveFine,
            Self::ResistiveFine => Self::ImpedanceCoarse,
            Self::ImpedanceCoarse => Self::ImpedanceFine,
            Self::ImpedanceFine | Self::Adjust => Self::Adjust,
        }
    }

    const fn dimension(self) -> Option<Dimension> {
        match self {
            Self::ResistiveCoarse | Self::ResistiveFine => Some(Dimension::Resistive),
            Self::ImpedanceCoarse | Self::ImpedanceFine => Some(Dimension::Inductive),
            Self::Adjust => None,
        }
    }

    const fn is_coarse(self) -> bool {
        matches!(self, Self::ResistiveCoarse | Self::ImpedanceCoarse)
    }
}

/// Bisection over one register at a time: resistive coarse, resistive fine,
/// inductive coarse, inductive fine.
///
/// Each phase moves its register by 32, 16, ... 1 in the direction the
/// current deviation asks for, accepting every step. A register left at 1
/// gets one last probe at 0. A phase ends early once its deviation
/// component is exactly zero.
#[derive(Debug, Clone)]
pub struct IntervalCalibrator {
    phase: IntervalPhase,
    width: i16,
}

impl Default for IntervalCalibrator {
    fn default() -> Self {
        Self {
            phase: IntervalPhase::ResistiveCoarse,
            width: START_WIDTH,
        }
    }
}

fn checked(pair: core::result::Result<CalibrationPair, ModelError>) -> Result<CalibrationPair> {
    pair.map_err(|e| Report::new(CalibrationError::from(e)))
}

impl IntervalCalibrator {
    pub fn phase(&self) -> IntervalPhase {
        self.phase
    }

    /// Next bisection candidate within the current phase.
    fn next_candidate(&mut self, dim: Dimension, ctx: &dyn CalibrationContext) -> Option<Calibration> {
        let dir = dim.direction(&ctx.deviation());
        if dir == 0 {
            return None;
        }
        let coarse = self.phase.is_coarse();
        let current = ctx.current_calibration();
        let pair = dim.pair(&current);
        let shift = |delta: i16| {
            if coarse {
                pair.change_coarse(delta, true)
            } else {
                pair.change_fine(delta)
            }
        };

        while self.width > 1 {
            self.width /= 2;
            if let Some(moved) = shift(dir * self.width) {
                return Some(dim.with_pair(current, moved));
            }
        }
        if self.width == 1 {
            self.width = 0;
            let value = if coarse { pair.coarse() } else { pair.fine() };
            if value == 1 && dir < 0 {
                return shift(-1).map(|moved| dim.with_pair(current, moved));
            }
        }
        None
    }

    /// Calibration measured when a phase starts.
    fn phase_baseline(&self, current: Calibration) -> Result<Option<Calibration>> {
        let (dim, pair) = match self.phase {
            IntervalPhase::ResistiveCoarse => {
                (Dimension::Resistive, CalibrationPair::new(CENTER, 0))
            }
            IntervalPhase::ResistiveFine => (Dimension::Resistive, current.resistive.with_fine(CENTER)),
            IntervalPhase::ImpedanceCoarse => {
                (Dimension::Inductive, CalibrationPair::new(CENTER, 0))
            }
            IntervalPhase::ImpedanceFine => (Dimension::Inductive, current.inductive.with_fine(CENTER)),
            IntervalPhase::Adjust => return Ok(None),
        };
        Ok(Some(dim.with_pair(current, checked(pair)?)))
    }
}

impl CalibrationAlgorithm for IntervalCalibrator {
    fn create_initial_calibration(&self, hardware: Calibration) -> Calibration {
        // (64, 0) is always a valid pair
        CalibrationPair::new(CENTER, 0).map_or(hardware, |p| hardware.with_resistive(p))
    }

    fn iterate(&mut self, ctx: &mut dyn CalibrationContext) -> Result<Option<CalibrationStep>> {
        loop {
            let Some(dim) = self.phase.dimension() else {
                return Ok(None);
            };
            if let Some(candidate) = self.next_candidate(dim, ctx) {
                return ctx.measure(candidate).map(Some);
            }

            self.phase = self.phase.next();
            self.width = START_WIDTH;
            ctx.clear_cycle_memory();
            tracing::debug!(phase = ?self.phase, "interval phase");
            if let Some(baseline) = self.phase_baseline(ctx.current_calibration())? {
                return ctx.measure(baseline).map(Some);
            }
        }
    }

    fn continue_after_cycle_detection(&mut self) -> bool {
        true
    }
}
