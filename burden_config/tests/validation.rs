use burden_config::{AlgorithmName, Config, load_toml};
use rstest::rstest;

#[test]
fn empty_file_yields_valid_defaults() {
    let cfg = load_toml("").expect("parse TOML");
    cfg.validate().expect("defaults are valid");
    assert_eq!(cfg.calibrator.algorithm, AlgorithmName::SingleStep);
    assert_eq!(cfg.calibrator.max_steps, 1000);
    assert_eq!(cfg.scaling.ansi_power_factor, 1.025);
    assert_eq!(cfg.scaling.current_base_factor, 0.1);
    assert_eq!(cfg.verification.max_terminal_voltage_v, 89.0);
    assert_eq!(cfg.verification.supported_factors.len(), 8);
}

#[test]
fn parses_a_full_file() {
    let toml = r#"
[calibrator]
algorithm = "interval"
max_steps = 200
epsilon = 0.0005

[scaling]
ansi_power_factor = 1.025
current_base_factor = 0.2

[verification]
current_upper = 1.5
supported_factors = [0.1, 0.5, 1.0, 1.5]

[simulator]
resistive_optimum = [80, 10]
inductive_optimum = [40, 100]
measured_range_ratio = 1.02

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.calibrator.algorithm, AlgorithmName::Interval);
    assert_eq!(cfg.calibrator.max_steps, 200);
    assert_eq!(cfg.simulator.resistive_optimum, [80, 10]);
    assert_eq!(cfg.verification.voltage_upper, 1.2);
}

#[rstest]
#[case("single-step", AlgorithmName::SingleStep)]
#[case("SingleStep", AlgorithmName::SingleStep)]
#[case("fine_first", AlgorithmName::FineFirst)]
#[case("null", AlgorithmName::Null)]
fn algorithm_names(#[case] name: &str, #[case] expected: AlgorithmName) {
    let cfg = load_toml(&format!("[calibrator]\nalgorithm = \"{name}\"\n")).expect("parse TOML");
    assert_eq!(cfg.calibrator.algorithm, expected);
}

#[test]
fn unknown_algorithm_fails_to_parse() {
    assert!(load_toml("[calibrator]\nalgorithm = \"gradient\"\n").is_err());
}

#[rstest]
#[case("[calibrator]\nmax_steps = 0", "calibrator.max_steps must be >= 1")]
#[case("[calibrator]\nepsilon = -1.0", "calibrator.epsilon")]
#[case("[scaling]\ncurrent_base_factor = 1.5", "scaling.current_base_factor must be in")]
#[case("[scaling]\nansi_power_factor = 0.0", "scaling.ansi_power_factor must be")]
#[case("[verification]\nvoltage_lower = 1.3", "voltage_lower must be <")]
#[case("[verification]\nsupported_factors = []", "supported_factors must not be empty")]
#[case("[verification]\nmax_terminal_voltage_v = -89.0", "max_terminal_voltage_v")]
#[case("[simulator]\nresistive_optimum = [128, 0]", "simulator.resistive_optimum")]
#[case("[simulator]\npower_slope = 1.0", "simulator.power_slope must be < 1.0")]
#[case("[simulator]\ndefault_calibration = \"1;0x80;0;0;0;0\"", "simulator.default_calibration")]
#[case("[logging]\nrotation = \"weekly\"", "logging.rotation")]
fn rejects_out_of_range_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg: Config = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        err.to_string().contains(needle),
        "error '{err}' does not mention '{needle}'"
    );
}
