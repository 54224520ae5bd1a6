//! The search orchestrator.
//!
//! `Calibrator::run` prepares the load point, measures the seed calibration
//! and then repeatedly asks the selected strategy for the next step, keeping
//! the step log, cycle memory and termination policy to itself.

use std::sync::atomic::{AtomicBool, Ordering};

use burden_traits::{
    BurdenDevice, Calibration, GoalValue, NominalRange, PrepareRequest, PreparedLoadpoint,
};
use eyre::WrapErr;

use crate::algorithm::{Algorithm, AlgorithmKind, CalibrationAlgorithm};
use crate::config::{ScalingCfg, SearchCfg, VerificationCfg};
use crate::context::{SearchContext, measure_step};
use crate::error::{CalibrationError, Report, Result};
use crate::goal::{BurdenStandard, effective_goal, nominal_goal};
use crate::hw_error::device_error;
use crate::session::Session;
use crate::status::{RunOutcome, Termination};
use crate::step::CalibrationStep;

/// Which load point to calibrate and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationRequest {
    /// Burden standard: `IEC50`, `IEC60` or `ANSI`.
    pub burden: String,
    /// Nominal range, e.g. `"100"` or `"230/3"`.
    pub range: String,
    /// Load step, `"apparent_power;power_factor"`.
    pub step: String,
    /// Strategy identifier, see [`AlgorithmKind`].
    pub algorithm: String,
}

impl CalibrationRequest {
    pub fn new(burden: impl Into<String>, range: impl Into<String>, step: impl Into<String>) -> Self {
        Self {
            burden: burden.into(),
            range: range.into(),
            step: step.into(),
            algorithm: AlgorithmKind::default().as_str().to_string(),
        }
    }

    #[must_use]
    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = algorithm.into();
        self
    }
}

/// Source settings of the last prepared run, reused for verification.
#[derive(Debug, Clone)]
pub(crate) struct PreparedRun {
    pub voltage_not_current: bool,
    pub range: NominalRange,
    pub frequency_hz: f64,
    /// Step goal after standard corrections, at unit scale.
    pub nominal_goal: GoalValue,
    pub applied_factor: f64,
}

impl PreparedRun {
    pub fn request(&self, scale_factor: f64, choose_best_range: bool) -> PrepareRequest {
        PrepareRequest {
            voltage_not_current: self.voltage_not_current,
            range: self.range.clone(),
            scale_factor,
            frequency_hz: self.frequency_hz,
            choose_best_range,
            nominal_power_va: self.nominal_goal.apparent_power_va,
            activate: true,
        }
    }
}

pub struct Calibrator<D> {
    pub(crate) device: D,
    pub(crate) search: SearchCfg,
    pub(crate) scaling: ScalingCfg,
    pub(crate) verification: VerificationCfg,
    pub(crate) session: Option<Session>,
    goal: Option<GoalValue>,
    effective_goal: Option<GoalValue>,
    pub(crate) prepared: Option<PreparedRun>,
}

impl<D> core::fmt::Debug for Calibrator<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Calibrator")
            .field("search", &self.search)
            .field("goal", &self.goal)
            .field("effective_goal", &self.effective_goal)
            .field("steps", &self.steps().len())
            .finish_non_exhaustive()
    }
}

impl<D> Calibrator<D> {
    pub(crate) const fn from_parts(
        device: D,
        search: SearchCfg,
        scaling: ScalingCfg,
        verification: VerificationCfg,
    ) -> Self {
        Self {
            device,
            search,
            scaling,
            verification,
            session: None,
            goal: None,
            effective_goal: None,
            prepared: None,
        }
    }

    /// Steps of the last run, in measurement order.
    pub fn steps(&self) -> &[CalibrationStep] {
        self.session.as_ref().map(Session::steps).unwrap_or_default()
    }

    /// The current accepted step of the last run.
    pub fn last_step(&self) -> Option<&CalibrationStep> {
        self.session.as_ref().map(Session::current)
    }

    pub fn current_calibration(&self) -> Option<Calibration> {
        self.session.as_ref().map(Session::current_calibration)
    }

    /// Accepted step with the lowest total deviation in the last run.
    pub fn best_step(&self) -> Option<&CalibrationStep> {
        self.session.as_ref().map(Session::best_step)
    }

    /// Step goal of the last run, as parsed.
    pub fn goal(&self) -> Option<GoalValue> {
        self.goal
    }

    /// Goal the reference meter is compared against during the search.
    pub fn effective_goal(&self) -> Option<GoalValue> {
        self.effective_goal
    }

    pub fn search_cfg(&self) -> &SearchCfg {
        &self.search
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }
}

impl<D: BurdenDevice> Calibrator<D> {
    /// Calibrator with default configuration.
    pub fn new(device: D) -> Self {
        Self::from_parts(
            device,
            SearchCfg::default(),
            ScalingCfg::default(),
            VerificationCfg::default(),
        )
    }

    /// Search for the calibration that brings the burden closest to its goal.
    ///
    /// Nothing is written permanently; see `calibrate_step` for that.
    /// Setting `cancel` aborts before the next iteration with
    /// `CalibrationError::Cancelled`.
    pub fn run(
        &mut self,
        voltage_not_current: bool,
        request: &CalibrationRequest,
        cancel: &AtomicBool,
    ) -> Result<RunOutcome> {
        self.session = None;

        let step_goal = GoalValue::parse(&request.step)
            .map_err(CalibrationError::from)
            .wrap_err("parse load step")?;
        let hardware = self
            .device
            .get_calibration(&request.burden, &request.range, &request.step)
            .map_err(device_error)
            .wrap_err("read stored calibration")?
            .ok_or_else(|| {
                Report::new(CalibrationError::NotCalibratable {
                    burden: request.burden.clone(),
                    range: request.range.clone(),
                    step: request.step.clone(),
                })
            })?;
        let kind: AlgorithmKind = request.algorithm.parse()?;
        let standard: BurdenStandard = request.burden.parse()?;
        let range = NominalRange::parse(&request.range)
            .map_err(CalibrationError::from)
            .wrap_err("parse range")?;

        let nominal = nominal_goal(step_goal, standard, &self.scaling);
        let scale = if voltage_not_current {
            1.0
        } else {
            self.scaling.current_base_factor
        };
        let mut run = PreparedRun {
            voltage_not_current,
            range,
            frequency_hz: standard.frequency_hz(),
            nominal_goal: nominal,
            applied_factor: scale,
        };
        let prepared = self.prepare_loadpoint(request, &run.request(scale, false))?;
        run.applied_factor = prepared.applied_factor;
        let effective = effective_goal(nominal, prepared.applied_factor);
        self.goal = Some(step_goal);
        self.effective_goal = Some(effective);
        self.prepared = Some(run);

        let mut algorithm = Algorithm::new(kind);
        let seed = algorithm.create_initial_calibration(hardware);
        tracing::info!(
            burden = %standard,
            range = %request.range,
            step = %request.step,
            algorithm = %kind,
            seed = %seed,
            goal_va = effective.apparent_power_va,
            goal_pf = effective.power_factor,
            "calibration started"
        );
        let first = measure_step(
            &mut self.device,
            seed,
            effective,
            prepared.prepared_range,
            self.search.measure_burden,
        )?;
        let session = self.session.insert(Session::start(seed, first));

        let mut termination = Termination::StepLimit;
        for iteration in 1..=self.search.max_steps {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(iteration, "calibration cancelled");
                return Err(Report::new(CalibrationError::Cancelled));
            }
            if session.current().total_abs_delta() < self.search.epsilon {
                termination = Termination::Converged;
                break;
            }

            let mut ctx = SearchContext {
                device: &mut self.device,
                session: &mut *session,
                effective_goal: effective,
                prepared_range: prepared.prepared_range,
                measure_burden: self.search.measure_burden,
            };
            let Some(step) = algorithm.iterate(&mut ctx)? else {
                termination = Termination::NoFurtherStep;
                break;
            };
            let Some(candidate) = step.calibration().copied() else {
                session.push_rejected(step);
                continue;
            };

            if session.has_visited(&candidate) {
                tracing::warn!(iteration, calibration = %candidate, "calibration revisited");
                if !algorithm.continue_after_cycle_detection() {
                    termination = Termination::CycleDetected;
                    break;
                }
                session.select_best();
                session.push_rejected(step);
                continue;
            }

            tracing::debug!(
                iteration,
                calibration = %candidate,
                delta_power = step.deviation.delta_power,
                delta_factor = step.deviation.delta_factor,
                "step accepted"
            );
            session.push_accepted(step, iteration);
        }
        if termination == Termination::StepLimit {
            // the final iteration may itself have landed inside epsilon
            if session.current().total_abs_delta() < self.search.epsilon {
                termination = Termination::Converged;
            } else {
                tracing::warn!(max_steps = self.search.max_steps, "step limit reached");
            }
        }

        session.stamp_factor(prepared.applied_factor);
        let current = session.current();
        let outcome = RunOutcome {
            termination,
            steps: session.steps().len(),
            calibration: session.current_calibration(),
            deviation: current.deviation,
            applied_factor: prepared.applied_factor,
        };
        tracing::info!(
            termination = termination.as_str(),
            steps = outcome.steps,
            calibration = %outcome.calibration,
            total = outcome.deviation.total_abs_delta(),
            "calibration finished"
        );
        Ok(outcome)
    }

    /// Reset the burden, prepare the source and switch the load point on.
    fn prepare_loadpoint(
        &mut self,
        request: &CalibrationRequest,
        prepare: &PrepareRequest,
    ) -> Result<PreparedLoadpoint> {
        let dev = &mut self.device;
        dev.cancel_calibration()
            .map_err(device_error)
            .wrap_err("cancel running calibration")?;
        dev.set_calibration_measurement(false)
            .map_err(device_error)
            .wrap_err("disable calibration measurement")?;
        dev.activate(false)
            .map_err(device_error)
            .wrap_err("switch burden off")?;
        let prepared = dev
            .prepare(prepare)
            .map_err(device_error)
            .wrap_err("prepare loadpoint")?;
        dev.select_burden(&request.burden)
            .map_err(device_error)
            .wrap_err("select burden")?;
        dev.select_range(&request.range)
            .map_err(device_error)
            .wrap_err("select range")?;
        dev.select_step(&request.step)
            .map_err(device_error)
            .wrap_err("select step")?;
        dev.activate(true)
            .map_err(device_error)
            .wrap_err("switch burden on")?;
        Ok(prepared)
    }
}
