//! Human-readable error descriptions, exit codes and structured JSON errors.

use burden_core::error::{BuildError, CalibrationError};
use thiserror::Error;

/// Input problems detected by the CLI before the engine runs.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("invalid load-point table: {0}")]
    Loadpoints(String),
}

pub const EXIT_GENERIC: i32 = 1;
pub const EXIT_CANCELLED: i32 = 2;
pub const EXIT_ARGUMENT: i32 = 3;
pub const EXIT_HARDWARE: i32 = 4;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid calibrator settings ({msg}).\nLikely causes: Out-of-range values in the [calibrator], [scaling] or [verification] sections.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. An empty file yields the defaults."
            ),
            CliError::Loadpoints(msg) if msg.contains("must have headers") => {
                "Invalid headers in load-point CSV. Expected 'burden,range,step,calibration'."
                    .to_string()
            }
            CliError::Loadpoints(msg) => format!(
                "What happened: The load-point table could not be read ({msg}).\nLikely causes: A malformed range, step or calibration cell.\nHow to fix: Fix the reported row; calibrations look like 1;0x71;0x2f;0x33;0x00;0.0000 or 0."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<CalibrationError>() {
        return match ce {
            CalibrationError::Timeout => "What happened: The reference meter did not answer in time.\nLikely causes: Source not switched on, meter disconnected or busy.\nHow to fix: Check the source and meter connections, then start a new run.".to_string(),
            CalibrationError::Cancelled => "What happened: Calibration was cancelled.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Nothing was written; start a new run when ready.".to_string(),
            CalibrationError::NotCalibratable { burden, range, step } => format!(
                "What happened: Load point {burden} / {range} / {step} is not calibratable.\nLikely causes: The burden reports no calibration (\"0\") for it.\nHow to fix: Pick another load point or enable it in the load-point table."
            ),
            CalibrationError::UnsupportedBurden(b) => format!(
                "What happened: Unsupported burden '{b}'.\nLikely causes: Typo in --burden.\nHow to fix: Use IEC50, IEC60 or ANSI."
            ),
            CalibrationError::Hardware(msg) | CalibrationError::HardwareFault(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: Burden switched off, no step selected or a communication fault.\nHow to fix: Run `burden self-check`, then retry with --log-level=debug."
            ),
            other if other.is_argument() => format!(
                "What happened: {other}.\nLikely causes: Malformed --range, --step or --algorithm value.\nHow to fix: Ranges look like 100 or 230/3, steps like 25.00;0.70."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 2 cancelled, 3 argument or validation, 4 hardware, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() || err.downcast_ref::<CliError>().is_some() {
        return EXIT_ARGUMENT;
    }
    match err.downcast_ref::<CalibrationError>() {
        Some(CalibrationError::Cancelled) => EXIT_CANCELLED,
        Some(CalibrationError::NotCalibratable { .. }) => EXIT_ARGUMENT,
        Some(e) if e.is_argument() => EXIT_ARGUMENT,
        Some(
            CalibrationError::Hardware(_)
            | CalibrationError::HardwareFault(_)
            | CalibrationError::Timeout,
        ) => EXIT_HARDWARE,
        _ => EXIT_GENERIC,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "InvalidConfig";
    }
    if let Some(ce) = err.downcast_ref::<CliError>() {
        return match ce {
            CliError::Config(_) => "InvalidConfig",
            CliError::Loadpoints(_) => "InvalidLoadpoints",
        };
    }
    match err.downcast_ref::<CalibrationError>() {
        Some(CalibrationError::Argument(_) | CalibrationError::Model(_)) => "Argument",
        Some(CalibrationError::UnsupportedBurden(_)) => "UnsupportedBurden",
        Some(CalibrationError::NotCalibratable { .. }) => "NotCalibratable",
        Some(CalibrationError::Hardware(_)) => "Hardware",
        Some(CalibrationError::HardwareFault(_)) => "HardwareFault",
        Some(CalibrationError::Timeout) => "Timeout",
        Some(CalibrationError::Cancelled) => "Cancelled",
        Some(CalibrationError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CalibrationError::Cancelled, EXIT_CANCELLED, "Cancelled")]
    #[case(CalibrationError::Timeout, EXIT_HARDWARE, "Timeout")]
    #[case(CalibrationError::HardwareFault("x".into()), EXIT_HARDWARE, "HardwareFault")]
    #[case(CalibrationError::UnsupportedBurden("IEC61".into()), EXIT_ARGUMENT, "UnsupportedBurden")]
    #[case(CalibrationError::State("x".into()), EXIT_GENERIC, "State")]
    fn typed_errors_map_to_stable_codes(
        #[case] e: CalibrationError,
        #[case] code: i32,
        #[case] reason: &str,
    ) {
        let report = eyre::Report::new(e).wrap_err("run calibration");
        assert_eq!(exit_code_for_error(&report), code);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], reason);
        assert_eq!(v["exit_code"], code);
    }

    #[rstest]
    fn header_errors_get_a_short_hint() {
        let report = eyre::Report::new(CliError::Loadpoints(
            "load-point CSV must have headers 'burden,range,step,calibration', got: a,b".into(),
        ));
        assert!(humanize(&report).starts_with("Invalid headers"));
        assert_eq!(exit_code_for_error(&report), EXIT_ARGUMENT);
    }

    #[rstest]
    fn untyped_errors_fall_back_to_generic() {
        let report = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&report), EXIT_GENERIC);
        assert!(humanize(&report).contains("Original: boom"));
    }
}
