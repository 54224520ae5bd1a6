#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and load-point tables for the burden calibration system.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; an empty file yields the defaults.
//! - The load-point CSV loader enforces headers and checks every
//!   calibration and step string before the simulator sees it.
use burden_traits::{Calibration, GoalValue, NominalRange, TRIM_MAX};
use serde::Deserialize;

/// Load-point CSV schema.
///
/// Expected headers:
/// burden,range,step,calibration
///
/// Example:
/// burden,range,step,calibration
/// IEC50,100,25.00;0.70,1;0x71;0x2f;0x33;0x00;0.0000
/// ANSI,120,12.50;0.10,0
#[derive(Debug, Deserialize, Clone)]
pub struct LoadpointRow {
    pub burden: String,
    pub range: String,
    pub step: String,
    pub calibration: String,
}

/// A validated load-point row. `calibration` is `None` for load points that
/// are not calibratable.
#[derive(Debug, Clone, PartialEq)]
pub struct Loadpoint {
    pub burden: String,
    pub range: String,
    pub step: String,
    pub calibration: Option<Calibration>,
}

impl TryFrom<LoadpointRow> for Loadpoint {
    type Error = eyre::Report;

    fn try_from(row: LoadpointRow) -> Result<Self, Self::Error> {
        NominalRange::parse(&row.range).map_err(|e| eyre::eyre!("range: {e}"))?;
        GoalValue::parse(&row.step).map_err(|e| eyre::eyre!("step: {e}"))?;
        let calibration =
            Calibration::parse(&row.calibration).map_err(|e| eyre::eyre!("calibration: {e}"))?;
        Ok(Self {
            burden: row.burden,
            range: row.range,
            step: row.step,
            calibration,
        })
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmName {
    Null,
    #[default]
    #[serde(alias = "single_step", alias = "SingleStep")]
    SingleStep,
    #[serde(alias = "fine_first", alias = "FineFirst")]
    FineFirst,
    Interval,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CalibratorCfg {
    /// Default search strategy when the command line names none.
    pub algorithm: AlgorithmName,
    /// Cap on search iterations per run.
    pub max_steps: usize,
    /// Stop once the total absolute deviation drops below this (0 disables).
    pub epsilon: f64,
    /// Also read the burden's own measurement on every search step.
    pub measure_burden: bool,
}

impl Default for CalibratorCfg {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmName::SingleStep,
            max_steps: 1000,
            epsilon: 1e-4,
            measure_burden: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScalingCfg {
    /// Apparent-power correction applied to ANSI goals.
    pub ansi_power_factor: f64,
    /// Fraction of the nominal range current burdens are calibrated at.
    pub current_base_factor: f64,
}

impl Default for ScalingCfg {
    fn default() -> Self {
        Self {
            ansi_power_factor: 1.025,
            current_base_factor: 0.1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VerificationCfg {
    pub voltage_lower: f64,
    pub voltage_upper: f64,
    pub current_lower: f64,
    pub current_upper: f64,
    /// Upper verification factors implying more than this are reduced.
    pub max_terminal_voltage_v: f64,
    /// Scale factors the source can generate.
    pub supported_factors: Vec<f64>,
}

impl Default for VerificationCfg {
    fn default() -> Self {
        Self {
            voltage_lower: 0.8,
            voltage_upper: 1.2,
            current_lower: 0.01,
            current_upper: 2.0,
            max_terminal_voltage_v: 89.0,
            supported_factors: vec![0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 1.5, 2.0],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorCfg {
    /// Relative apparent-power change per coarse count of inductive trim.
    pub power_slope: f64,
    /// Relative power-factor change per coarse count of resistive trim.
    pub factor_slope: f64,
    /// `[coarse, fine]` where the simulated burden hits its goal.
    pub resistive_optimum: [u8; 2],
    pub inductive_optimum: [u8; 2],
    /// Measured / prepared range, to mimic a source that misses its setpoint.
    pub measured_range_ratio: f64,
    /// Relative error of the burden's own reading.
    pub burden_reading_offset: f64,
    /// Stored calibration for load points missing from the CSV table.
    pub default_calibration: String,
}

impl Default for SimulatorCfg {
    fn default() -> Self {
        Self {
            power_slope: 0.01,
            factor_slope: 0.01,
            resistive_optimum: [70, 64],
            inductive_optimum: [58, 64],
            measured_range_ratio: 1.0,
            burden_reading_offset: 0.0,
            default_calibration: "1;0x40;0x40;0x40;0x40;0.0000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub calibrator: CalibratorCfg,
    pub scaling: ScalingCfg,
    pub verification: VerificationCfg,
    pub simulator: SimulatorCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_loadpoint_csv(path: &std::path::Path) -> eyre::Result<Vec<Loadpoint>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open load-point CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["burden", "range", "step", "calibration"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "load-point CSV must have headers 'burden,range,step,calibration', got: {}",
            actual.join(",")
        );
    }

    let mut out = Vec::new();
    for (idx, rec) in rdr.deserialize::<LoadpointRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        let lp = Loadpoint::try_from(row)
            .map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        out.push(lp);
    }
    Ok(out)
}

fn positive(name: &str, v: f64) -> eyre::Result<()> {
    if !(v.is_finite() && v > 0.0) {
        eyre::bail!("{name} must be a finite number > 0, got {v}");
    }
    Ok(())
}

fn trim_pair(name: &str, p: [u8; 2]) -> eyre::Result<()> {
    if p[0] > TRIM_MAX || p[1] > TRIM_MAX {
        eyre::bail!("{name} values must be in [0, {TRIM_MAX}], got {:?}", p);
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Calibrator
        if self.calibrator.max_steps == 0 {
            eyre::bail!("calibrator.max_steps must be >= 1");
        }
        if self.calibrator.max_steps > 100_000 {
            eyre::bail!("calibrator.max_steps is unreasonably large (>100000)");
        }
        if !self.calibrator.epsilon.is_finite() || self.calibrator.epsilon < 0.0 {
            eyre::bail!("calibrator.epsilon must be a finite number >= 0");
        }

        // Scaling
        positive("scaling.ansi_power_factor", self.scaling.ansi_power_factor)?;
        positive("scaling.current_base_factor", self.scaling.current_base_factor)?;
        if self.scaling.current_base_factor > 1.0 {
            eyre::bail!("scaling.current_base_factor must be in (0.0, 1.0]");
        }

        // Verification
        let v = &self.verification;
        positive("verification.voltage_lower", v.voltage_lower)?;
        positive("verification.voltage_upper", v.voltage_upper)?;
        positive("verification.current_lower", v.current_lower)?;
        positive("verification.current_upper", v.current_upper)?;
        if v.voltage_lower >= v.voltage_upper {
            eyre::bail!("verification.voltage_lower must be < verification.voltage_upper");
        }
        if v.current_lower >= v.current_upper {
            eyre::bail!("verification.current_lower must be < verification.current_upper");
        }
        positive("verification.max_terminal_voltage_v", v.max_terminal_voltage_v)?;
        if v.supported_factors.is_empty() {
            eyre::bail!("verification.supported_factors must not be empty");
        }
        for f in &v.supported_factors {
            positive("verification.supported_factors entries", *f)?;
        }

        // Simulator
        let s = &self.simulator;
        positive("simulator.power_slope", s.power_slope)?;
        positive("simulator.factor_slope", s.factor_slope)?;
        if s.power_slope >= 1.0 {
            eyre::bail!("simulator.power_slope must be < 1.0");
        }
        trim_pair("simulator.resistive_optimum", s.resistive_optimum)?;
        trim_pair("simulator.inductive_optimum", s.inductive_optimum)?;
        positive("simulator.measured_range_ratio", s.measured_range_ratio)?;
        if !s.burden_reading_offset.is_finite() || s.burden_reading_offset <= -1.0 {
            eyre::bail!("simulator.burden_reading_offset must be a finite number > -1.0");
        }
        Calibration::parse(&s.default_calibration)
            .map_err(|e| eyre::eyre!("simulator.default_calibration: {e}"))?;

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly; got '{rot}'");
        }

        Ok(())
    }
}
