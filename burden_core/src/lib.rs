#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Burden auto-calibration engine (hardware-agnostic).
//!
//! All hardware interaction goes through `burden_traits::BurdenDevice`.
//!
//! ## Architecture
//!
//! - **Goal model**: burden standards, effective goal, relative deviation (`goal`)
//! - **Step log**: measured steps, current best point, cycle memory (`step`, `session`)
//! - **Strategies**: `Null`, `SingleStep`, `FineFirst`, `Interval` (`algorithm`)
//! - **Orchestrator**: `Calibrator::run` drives a strategy to termination
//! - **Runner**: `Calibrator::calibrate_step` writes the result and verifies it
//!
//! ## Trim positions
//!
//! Each trim pair has a coarse and a fine register in `[0, 127]`. Strategies
//! move one register at a time and compare candidates by total absolute
//! deviation, `|delta_power| + |delta_factor|`.

pub mod algorithm;
pub mod builder;
pub mod calibrator;
pub mod config;
pub mod context;
pub mod conversions;
pub mod error;
pub mod goal;
pub mod hw_error;
pub mod mocks;
pub mod runner;
pub mod session;
pub mod status;
pub mod step;

pub use algorithm::{Algorithm, AlgorithmKind, CalibrationAlgorithm};
pub use builder::{CalibratorBuilder, Missing};
pub use calibrator::{CalibrationRequest, Calibrator};
pub use config::{ScalingCfg, SearchCfg, VerificationCfg};
pub use context::{CalibrationContext, Dimension};
pub use error::{BuildError, CalibrationError, Report, Result};
pub use goal::{BurdenStandard, GoalDeviation, make_deviation};
pub use runner::clamp_upper_factor;
pub use session::Session;
pub use status::{RunOutcome, StepReport, Termination};
pub use step::{CalibrationStep, StepOutcome};
