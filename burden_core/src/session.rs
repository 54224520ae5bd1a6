//! Per-run record of measured steps, the current best point and cycle memory.

use std::collections::HashSet;

use burden_traits::Calibration;

use crate::step::CalibrationStep;

#[derive(Debug, Clone)]
pub struct Session {
    steps: Vec<CalibrationStep>,
    /// Index of the current accepted step.
    current: usize,
    current_calibration: Calibration,
    visited: HashSet<Calibration>,
}

impl Session {
    /// Start a session from the measured step 0.
    pub(crate) fn start(calibration: Calibration, mut first: CalibrationStep) -> Self {
        first.iteration = Some(0);
        let mut visited = HashSet::new();
        visited.insert(calibration);
        Self {
            steps: vec![first],
            current: 0,
            current_calibration: calibration,
            visited,
        }
    }

    pub fn steps(&self) -> &[CalibrationStep] {
        &self.steps
    }

    pub fn current(&self) -> &CalibrationStep {
        &self.steps[self.current]
    }

    #[inline]
    pub fn current_calibration(&self) -> Calibration {
        self.current_calibration
    }

    pub fn has_visited(&self, calibration: &Calibration) -> bool {
        self.visited.contains(calibration)
    }

    /// Append an accepted step and make it current.
    ///
    /// Steps without a calibration are appended as rejected instead.
    pub(crate) fn push_accepted(&mut self, mut step: CalibrationStep, iteration: usize) {
        let Some(calibration) = step.calibration().copied() else {
            self.push_rejected(step);
            return;
        };
        step.iteration = Some(iteration);
        self.visited.insert(calibration);
        self.steps.push(step);
        self.current = self.steps.len() - 1;
        self.current_calibration = calibration;
    }

    pub(crate) fn push_rejected(&mut self, step: CalibrationStep) {
        self.steps.push(step.into_rejected());
    }

    pub(crate) fn clear_visited(&mut self) {
        self.visited.clear();
    }

    /// Make the accepted step with the smallest total deviation current.
    /// Ties keep the earliest step.
    pub(crate) fn select_best(&mut self) {
        if let Some((index, calibration)) = self.best() {
            self.current = index;
            self.current_calibration = calibration;
        }
    }

    /// Accepted step with the smallest total deviation.
    pub fn best_step(&self) -> &CalibrationStep {
        self.best().map_or_else(|| self.current(), |(i, _)| &self.steps[i])
    }

    fn best(&self) -> Option<(usize, Calibration)> {
        let mut best: Option<(usize, Calibration, f64)> = None;
        for (i, step) in self.steps.iter().enumerate() {
            let Some(c) = step.calibration() else { continue };
            let total = step.total_abs_delta();
            if best.is_none_or(|(_, _, b)| total < b) {
                best = Some((i, *c, total));
            }
        }
        best.map(|(i, c, _)| (i, c))
    }

    /// Record the applied scale factor on the current step.
    pub(crate) fn stamp_factor(&mut self, factor: f64) {
        self.steps[self.current].factor = Some(factor);
    }
}
