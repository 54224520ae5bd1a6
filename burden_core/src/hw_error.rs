//! Maps `Box<dyn Error>` from the device boundary to typed `CalibrationError`.
//!
//! `burden_traits::BurdenDevice` returns boxed errors; this module converts
//! them to our typed enum, with an optional feature-gated path for
//! `burden_hardware::HwError` downcasting.

use burden_traits::DeviceError;

use crate::error::{CalibrationError, Report};

/// Map a device-boundary error to a typed `CalibrationError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> CalibrationError {
    #[cfg(feature = "hardware-errors")]
    {
        use burden_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => CalibrationError::Timeout,
                other => CalibrationError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        CalibrationError::Timeout
    } else {
        CalibrationError::Hardware(s)
    }
}

/// Typed report for an error returned by a `BurdenDevice` call.
pub(crate) fn device_error(e: DeviceError) -> Report {
    Report::new(map_hw_error(&*e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Plain(&'static str);
    impl std::fmt::Display for Plain {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }
    impl std::error::Error for Plain {}

    #[test]
    fn string_fallback_detects_timeouts() {
        assert_eq!(
            map_hw_error(&Plain("serial Timeout after 2s")),
            CalibrationError::Timeout
        );
        assert_eq!(
            map_hw_error(&Plain("bus error")),
            CalibrationError::Hardware("bus error".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_simulator_errors() {
        use burden_hardware::error::HwError;
        assert_eq!(map_hw_error(&HwError::Timeout), CalibrationError::Timeout);
        assert_eq!(
            map_hw_error(&HwError::Inactive),
            CalibrationError::HardwareFault("burden is switched off".into())
        );
    }
}
