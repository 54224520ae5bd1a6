use burden_core::error::BuildError;
use burden_core::{CalibratorBuilder, SearchCfg, VerificationCfg};
use burden_hardware::SimulatedBurden;
use rstest::rstest;

fn build_err(builder: CalibratorBuilder<SimulatedBurden>) -> &'static str {
    let err = builder.build().expect_err("config should be rejected");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => msg,
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

fn builder() -> CalibratorBuilder<SimulatedBurden> {
    CalibratorBuilder::new().with_device(SimulatedBurden::default())
}

#[rstest]
fn zero_step_limit_is_rejected() {
    assert_eq!(build_err(builder().with_max_steps(0)), "max_steps must be >= 1");
}

#[rstest]
#[case(-1e-3)]
#[case(f64::NAN)]
fn bad_epsilon_is_rejected(#[case] epsilon: f64) {
    let msg = build_err(builder().with_epsilon(epsilon));
    assert!(msg.starts_with("epsilon"), "{msg}");
}

#[rstest]
fn empty_supported_factors_are_rejected() {
    let verification = VerificationCfg {
        supported_factors: Vec::new(),
        ..VerificationCfg::default()
    };
    let msg = build_err(builder().with_verification(verification));
    assert!(msg.contains("supported_factors"), "{msg}");
}

#[rstest]
fn zero_epsilon_disables_convergence_check() {
    let c = builder()
        .with_search(SearchCfg {
            epsilon: 0.0,
            ..SearchCfg::default()
        })
        .build()
        .expect("epsilon 0 is valid");
    assert_eq!(c.search_cfg().epsilon, 0.0);
}
