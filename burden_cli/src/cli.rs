//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "burden", version, about = "Burden auto-calibration CLI")]
pub struct Cli {
    /// Path to config TOML (typed); built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Optional load-point CSV seeding the simulator (strict header)
    #[arg(long, value_name = "FILE")]
    pub loadpoints: Option<PathBuf>,

    /// Print results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Load point selection shared by the calibration commands.
#[derive(Args, Debug, Clone)]
pub struct LoadpointArgs {
    /// Burden standard: IEC50, IEC60 or ANSI
    #[arg(long)]
    pub burden: String,
    /// Nominal range, e.g. 100 or 230/3
    #[arg(long)]
    pub range: String,
    /// Load step as "apparent_power;power_factor", e.g. "25.00;0.70"
    #[arg(long)]
    pub step: String,
    /// Search strategy (null|single-step|fine-first|interval); overrides [calibrator] algorithm
    #[arg(long, value_name = "NAME")]
    pub algorithm: Option<String>,
    /// Calibrate a current burden instead of a voltage burden
    #[arg(long, action = ArgAction::SetTrue)]
    pub current: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search for the best calibration of one load point (nothing is written)
    Calibrate(LoadpointArgs),
    /// Search, write the result permanently and verify it at the lower and upper points
    CalibrateStep(LoadpointArgs),
    /// Parse and pretty-print a calibration string
    Decode {
        /// Calibration text, e.g. "1;0x71;0x2f;0x33;0x00;0.0000" or "0"
        text: String,
    },
    /// Validate config and simulator wiring
    SelfCheck,
}
