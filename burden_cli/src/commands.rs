//! Command execution: config mapping, simulator assembly, result output.

use std::sync::atomic::AtomicBool;
use std::time::{SystemTime, UNIX_EPOCH};

use burden_config::{Config, Loadpoint, SimulatorCfg};
use burden_core::{
    AlgorithmKind, CalibrationRequest, Calibrator, CalibratorBuilder, CalibrationStep, RunOutcome,
    ScalingCfg, SearchCfg, StepReport, VerificationCfg,
};
use burden_hardware::{SimulatedBurden, SimulatorParams};
use burden_traits::{Calibration, CalibrationPair};
use eyre::WrapErr;
use serde_json::{Value, json};

use crate::cli::LoadpointArgs;

/// Test hook: make the simulated meter time out after this many reads.
const FAIL_AFTER_ENV: &str = "BURDEN_TEST_SIM_FAIL_AFTER";

fn pair(name: &str, p: [u8; 2]) -> eyre::Result<CalibrationPair> {
    CalibrationPair::new(p[0], p[1]).wrap_err_with(|| format!("simulator.{name}"))
}

pub fn simulator_params(cfg: &SimulatorCfg) -> eyre::Result<SimulatorParams> {
    Ok(SimulatorParams {
        resistive_optimum: pair("resistive_optimum", cfg.resistive_optimum)?,
        inductive_optimum: pair("inductive_optimum", cfg.inductive_optimum)?,
        factor_slope: cfg.factor_slope,
        power_slope: cfg.power_slope,
        measured_range_ratio: cfg.measured_range_ratio,
        burden_reading_offset: cfg.burden_reading_offset,
    })
}

/// Simulated burden seeded from the config and the optional load-point table.
pub fn build_simulator(cfg: &Config, loadpoints: &[Loadpoint]) -> eyre::Result<SimulatedBurden> {
    let default_calibration = Calibration::parse(&cfg.simulator.default_calibration)
        .wrap_err("simulator.default_calibration")?;
    let mut sim = SimulatedBurden::new(simulator_params(&cfg.simulator)?)
        .with_default_calibration(default_calibration);
    for lp in loadpoints {
        sim = sim.with_loadpoint(&lp.burden, &lp.range, &lp.step, lp.calibration);
    }
    if let Ok(raw) = std::env::var(FAIL_AFTER_ENV)
        && let Ok(n) = raw.parse::<usize>()
    {
        tracing::warn!(reads = n, "simulated meter will time out");
        sim = sim.with_failure_after(n);
    }
    Ok(sim)
}

pub fn build_calibrator(
    cfg: &Config,
    sim: SimulatedBurden,
) -> eyre::Result<Calibrator<SimulatedBurden>> {
    // Builder/config mapping: From impls live in burden_core::conversions
    let search: SearchCfg = (&cfg.calibrator).into();
    let scaling: ScalingCfg = (&cfg.scaling).into();
    let verification: VerificationCfg = (&cfg.verification).into();
    CalibratorBuilder::new()
        .with_device(sim)
        .with_search(search)
        .with_scaling(scaling)
        .with_verification(verification)
        .build()
}

fn request(cfg: &Config, args: &LoadpointArgs) -> CalibrationRequest {
    let algorithm = args.algorithm.clone().unwrap_or_else(|| {
        AlgorithmKind::from(cfg.calibrator.algorithm)
            .as_str()
            .to_string()
    });
    CalibrationRequest::new(&args.burden, &args.range, &args.step).with_algorithm(algorithm)
}

fn timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn outcome_json(req: &CalibrationRequest, voltage_not_current: bool, o: &RunOutcome) -> Value {
    json!({
        "timestamp": timestamp(),
        "burden": req.burden,
        "range": req.range,
        "step": req.step,
        "kind": if voltage_not_current { "voltage" } else { "current" },
        "algorithm": req.algorithm,
        "termination": o.termination.as_str(),
        "steps": o.steps,
        "calibration": o.calibration.to_string(),
        "delta_power": o.deviation.delta_power,
        "delta_factor": o.deviation.delta_factor,
        "applied_factor": o.applied_factor,
    })
}

fn point_json(step: &CalibrationStep) -> Value {
    json!({
        "factor": step.factor,
        "delta_power": step.deviation.delta_power,
        "delta_factor": step.deviation.delta_factor,
        "burden_delta_power": step.burden_deviation.map(|d| d.delta_power),
        "burden_delta_factor": step.burden_deviation.map(|d| d.delta_factor),
    })
}

fn print_outcome(o: &RunOutcome) {
    println!("Termination: {}", o.termination.as_str());
    println!("Steps: {}", o.steps);
    println!("Calibration: {}", o.calibration);
    println!(
        "  resistive {}  inductive {}",
        o.calibration.resistive, o.calibration.inductive
    );
    println!("Deviation: {}", o.deviation);
}

pub fn run_calibrate(
    cfg: &Config,
    calibrator: &mut Calibrator<SimulatedBurden>,
    args: &LoadpointArgs,
    json: bool,
    cancel: &AtomicBool,
) -> eyre::Result<()> {
    let req = request(cfg, args);
    let voltage = !args.current;
    let outcome = calibrator.run(voltage, &req, cancel)?;
    if json {
        println!("{}", outcome_json(&req, voltage, &outcome));
    } else {
        print_outcome(&outcome);
        println!("calibration complete (not written)");
    }
    Ok(())
}

pub fn run_calibrate_step(
    cfg: &Config,
    calibrator: &mut Calibrator<SimulatedBurden>,
    args: &LoadpointArgs,
    json: bool,
    cancel: &AtomicBool,
) -> eyre::Result<()> {
    let req = request(cfg, args);
    let voltage = !args.current;
    let report: StepReport = calibrator.calibrate_step(voltage, &req, cancel)?;
    if json {
        let mut v = outcome_json(&req, voltage, &report.outcome);
        v["written"] = json!(report.calibration.to_string());
        v["nominal"] = point_json(&report.nominal);
        v["lower"] = point_json(&report.lower);
        v["upper"] = point_json(&report.upper);
        println!("{v}");
    } else {
        print_outcome(&report.outcome);
        println!("Written: {}", report.calibration);
        for (label, step) in [
            ("nominal", &report.nominal),
            ("lower", &report.lower),
            ("upper", &report.upper),
        ] {
            println!(
                "  {label:<7} x{:<5} {}",
                step.factor.unwrap_or_default(),
                step.deviation
            );
        }
        println!("calibration complete");
    }
    Ok(())
}

pub fn run_decode(text: &str, json: bool) -> eyre::Result<()> {
    let decoded = Calibration::parse(text)
        .map_err(burden_core::CalibrationError::from)
        .wrap_err_with(|| format!("decode '{text}'"))?;
    match (decoded, json) {
        (Some(c), true) => println!(
            "{}",
            json!({
                "enabled": true,
                "resistive": { "coarse": c.resistive.coarse(), "fine": c.resistive.fine() },
                "inductive": { "coarse": c.inductive.coarse(), "fine": c.inductive.fine() },
                "canonical": c.to_string(),
            })
        ),
        (Some(c), false) => {
            println!("enabled");
            println!(
                "  resistive coarse={} fine={}",
                c.resistive.coarse(),
                c.resistive.fine()
            );
            println!(
                "  inductive coarse={} fine={}",
                c.inductive.coarse(),
                c.inductive.fine()
            );
        }
        (None, true) => println!("{}", json!({ "enabled": false })),
        (None, false) => println!("disabled (not calibratable)"),
    }
    Ok(())
}

/// Measure the first calibratable load point once with the null strategy.
pub fn run_self_check(
    calibrator: &mut Calibrator<SimulatedBurden>,
    loadpoints: &[Loadpoint],
    json: bool,
) -> eyre::Result<()> {
    let (burden, range, step) = loadpoints
        .iter()
        .find(|lp| lp.calibration.is_some())
        .map_or(("IEC50", "100", "25.00;0.70"), |lp| {
            (lp.burden.as_str(), lp.range.as_str(), lp.step.as_str())
        });
    let req = CalibrationRequest::new(burden, range, step)
        .with_algorithm(AlgorithmKind::Null.as_str());
    let outcome = calibrator
        .run(true, &req, &AtomicBool::new(false))
        .wrap_err("self-check measurement")?;
    if json {
        println!(
            "{}",
            json!({
                "ok": true,
                "loadpoints": loadpoints.len(),
                "calibration": outcome.calibration.to_string(),
            })
        );
    } else {
        println!("config ok, {} load point(s)", loadpoints.len());
        println!("simulator ok: {burden} / {range} / {step} reads {}", outcome.deviation);
        println!("OK");
    }
    Ok(())
}
