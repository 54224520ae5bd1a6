//! `burden`: calibrate simulated burden load points from the command line.

mod cli;
mod commands;
mod error_fmt;
mod logging;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use burden_config::{Config, Loadpoint};
use clap::Parser;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{CliError, exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            println!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn load_config(path: Option<&Path>) -> eyre::Result<Config> {
    let cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| CliError::Config(format!("read {}: {e}", p.display())))?;
            burden_config::load_toml(&text)
                .map_err(|e| CliError::Config(format!("{}: {e}", p.display())))?
        }
        None => Config::default(),
    };
    cfg.validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(cfg)
}

fn load_loadpoints(path: Option<&Path>) -> eyre::Result<Vec<Loadpoint>> {
    path.map_or_else(
        || Ok(Vec::new()),
        |p| {
            burden_config::load_loadpoint_csv(p)
                .map_err(|e| CliError::Loadpoints(e.to_string()).into())
        },
    )
}

fn run(cli: Cli) -> eyre::Result<()> {
    // decode needs neither config nor hardware
    if let Commands::Decode { text } = &cli.cmd {
        return commands::run_decode(text, cli.json);
    }

    let cfg = load_config(cli.config.as_deref())?;
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    logging::init_tracing(cli.json, level, &cfg.logging)?;
    let loadpoints = load_loadpoints(cli.loadpoints.as_deref())?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&shutdown);
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let sim = commands::build_simulator(&cfg, &loadpoints)?;
    let mut calibrator = commands::build_calibrator(&cfg, sim)?;
    tracing::debug!(?calibrator, loadpoints = loadpoints.len(), "calibrator ready");

    match &cli.cmd {
        Commands::Calibrate(args) => {
            commands::run_calibrate(&cfg, &mut calibrator, args, cli.json, &shutdown)
        }
        Commands::CalibrateStep(args) => {
            commands::run_calibrate_step(&cfg, &mut calibrator, args, cli.json, &shutdown)
        }
        Commands::SelfCheck => commands::run_self_check(&mut calibrator, &loadpoints, cli.json),
        Commands::Decode { .. } => Ok(()),
    }
}
