use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Build a minimal valid TOML config for the simulator
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[calibrator]
algorithm = "single-step"
max_steps = 500
epsilon = 1e-4

[simulator]
resistive_optimum = [70, 64]
inductive_optimum = [58, 64]

[logging]
level = "warn"
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

const LOADPOINT: [&str; 6] = ["--burden", "IEC50", "--range", "100", "--step", "25.00;0.70"];

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["calibrate", "--burden", "IEC50", "--range", "100", "--step", "25.00;0.70"], 0, "not written", "stdout")]
#[case(&["calibrate", "--burden", "IEC50"], 2, "required", "stderr")]
#[case(&["calibrate", "--burden", "IEC61", "--range", "100", "--step", "25.00;0.70"], 3, "Unsupported burden", "stderr")]
#[case(&["calibrate", "--burden", "IEC50", "--range", "100/2", "--step", "25.00;0.70"], 3, "phase notation", "stderr")]
#[case(&["calibrate", "--burden", "IEC50", "--range", "100", "--step", "25.00;0.70", "--algorithm", "gradient"], 3, "gradient", "stderr")]
#[case(&["decode", "1;0x71;0x2f;0x33;0x00;0.0000"], 0, "resistive coarse=113 fine=47", "stdout")]
#[case(&["decode", "0"], 0, "disabled", "stdout")]
#[case(&["decode", "1;0x80;0x2f;0x33;0x00;0.0000"], 3, "resistive coarse value 128 out of range", "stderr")]
#[case(&["self-check"], 0, "OK", "stdout")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("burden").unwrap();

    // Always include a valid config to avoid relying on built-in defaults
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn cli_reports_bad_loadpoint_header() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let bad_csv = dir.path().join("loadpoints.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "burden,range,value").unwrap();
    writeln!(f, "IEC50,100,25.00;0.70").unwrap();

    let mut cmd = Command::cargo_bin("burden").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--loadpoints")
        .arg(&bad_csv)
        .arg("self-check");

    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid headers"));
}

#[rstest]
fn disabled_loadpoint_is_not_calibratable() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("loadpoints.csv");
    let mut f = fs::File::create(&csv).unwrap();
    writeln!(f, "burden,range,step,calibration").unwrap();
    writeln!(f, "IEC50,100,25.00;0.70,0").unwrap();
    writeln!(f, "IEC60,120,12.50;0.10,1;0x71;0x2f;0x33;0x00;0.0000").unwrap();

    let mut cmd = Command::cargo_bin("burden").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .arg("--loadpoints")
        .arg(&csv)
        .arg("calibrate")
        .args(LOADPOINT);

    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("is not calibratable"));
}

#[rstest]
fn invalid_config_is_a_validation_error() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("cfg.toml");
    fs::write(&cfg, "[calibrator]\nmax_steps = 0\n").unwrap();

    let mut cmd = Command::cargo_bin("burden").unwrap();
    cmd.arg("--config").arg(&cfg).arg("self-check");
    cmd.assert()
        .code(3)
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains("calibrator.max_steps"));
}

#[rstest]
fn meter_timeout_bubbles_to_cli() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("burden").unwrap();
    cmd.env("BURDEN_TEST_SIM_FAIL_AFTER", "2");
    cmd.arg("--config")
        .arg(&cfg)
        .arg("calibrate-step")
        .args(LOADPOINT);
    cmd.assert().code(4).stderr(predicate::str::contains(
        "What happened: The reference meter did not answer in time",
    ));
}

#[rstest]
fn file_sink_is_created() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("burden.log");
    let cfg = dir.path().join("cfg.toml");
    fs::write(
        &cfg,
        format!(
            "[logging]\nfile = {:?}\nlevel = \"info\"\nrotation = \"never\"\n",
            log.display().to_string()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("burden").unwrap();
    cmd.arg("--config").arg(&cfg).arg("calibrate").args(LOADPOINT);
    cmd.assert().success();

    // lines are flushed by the background worker; the file itself is created up front
    assert!(log.exists());
}
