//! Value types and the hardware contract shared by the calibration stack.
//!
//! Everything that crosses the boundary between the calibration engine and a
//! burden driver lives here, so drivers and simulators can be written against
//! this crate alone.

pub mod calibration;
pub mod device;
pub mod error;
pub mod values;

pub use calibration::{Calibration, CalibrationPair, TRIM_MAX};
pub use device::{BurdenDevice, DeviceError, Measurement, PrepareRequest, PreparedLoadpoint};
pub use error::ModelError;
pub use values::{GoalValue, NominalRange};
