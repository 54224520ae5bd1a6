use std::sync::atomic::AtomicBool;

use burden_core::{
    AlgorithmKind, CalibrationRequest, Calibrator, Dimension, GoalDeviation, Termination,
    make_deviation,
};
use burden_hardware::{SimulatedBurden, SimulatorParams};
use burden_traits::{CalibrationPair, GoalValue};
use proptest::prelude::*;

prop_compose! {
    fn pair_strategy()(coarse in 0u8..=127, fine in 0u8..=127) -> CalibrationPair {
        CalibrationPair::new(coarse, fine).unwrap()
    }
}

fn kind_strategy() -> impl Strategy<Value = AlgorithmKind> {
    prop::sample::select(AlgorithmKind::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn accepted_steps_only_ever_improve(
        resistive in pair_strategy(),
        inductive in pair_strategy(),
        kind in kind_strategy(),
        voltage in any::<bool>(),
    ) {
        let params = SimulatorParams {
            resistive_optimum: resistive,
            inductive_optimum: inductive,
            ..SimulatorParams::default()
        };
        let mut c = Calibrator::new(SimulatedBurden::new(params));
        let req = CalibrationRequest::new("IEC50", "100", "25.00;0.70").with_algorithm(kind.as_str());
        let outcome = c.run(voltage, &req, &AtomicBool::new(false)).unwrap();

        prop_assert_ne!(outcome.termination, Termination::StepLimit);
        prop_assert_eq!(outcome.steps, c.steps().len());

        let accepted: Vec<f64> = c
            .steps()
            .iter()
            .filter(|s| s.is_accepted())
            .map(|s| s.total_abs_delta())
            .collect();
        match kind {
            AlgorithmKind::SingleStep | AlgorithmKind::FineFirst => {
                prop_assert!(accepted.windows(2).all(|w| w[1] < w[0]));
            }
            // bisection takes every step; seed plus at most seven per phase and three baselines
            AlgorithmKind::Interval => {
                prop_assert_eq!(outcome.termination, Termination::NoFurtherStep);
                prop_assert!(c.steps().len() <= 32, "{} steps", c.steps().len());
            }
            AlgorithmKind::Null => prop_assert_eq!(c.steps().len(), 1),
        }
        let best = c.best_step().unwrap().total_abs_delta();
        prop_assert!(best <= c.steps()[0].total_abs_delta());
    }

    #[test]
    fn reading_on_target_has_zero_deviation(
        power in 0.001f64..1000.0,
        factor in 0.01f64..1.0,
    ) {
        let goal = GoalValue::new(power, factor);
        let d = GoalDeviation::between(goal, goal);
        prop_assert_eq!(d.delta_power, 0.0);
        prop_assert_eq!(d.delta_factor, 0.0);
        prop_assert_eq!(d.total_abs_delta(), 0.0);
    }

    #[test]
    fn equal_overshoot_and_undershoot_mirror_each_other(
        power in 0.1f64..100.0,
        factor in 0.05f64..1.0,
        e in 1e-6f64..0.5,
    ) {
        let goal = GoalValue::new(power, factor);
        let over = GoalDeviation::between(GoalValue::new(power * (1.0 + e), factor * (1.0 + e)), goal);
        let under = GoalDeviation::between(GoalValue::new(power * (1.0 - e), factor * (1.0 - e)), goal);

        for (got, want) in [
            (over.delta_power, e),
            (over.delta_factor, e),
            (under.delta_power, -e),
            (under.delta_factor, -e),
        ] {
            prop_assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        prop_assert!(over.delta_power > 0.0 && under.delta_power < 0.0);
        prop_assert!(over.delta_factor > 0.0 && under.delta_factor < 0.0);
    }

    #[test]
    fn deviation_sign_follows_the_reading(
        power in 0.1f64..100.0,
        factor in 0.05f64..1.0,
        k_power in 0.5f64..1.5,
        k_factor in 0.5f64..1.5,
    ) {
        let goal = GoalValue::new(power, factor);
        let actual = GoalValue::new(power * k_power, factor * k_factor);
        let d = GoalDeviation::between(actual, goal);
        if d.delta_power > 0.0 {
            prop_assert!(actual.apparent_power_va > goal.apparent_power_va);
        }
        if d.delta_factor < 0.0 {
            prop_assert!(actual.power_factor < goal.power_factor);
        }

        // resistive trim opposes the power-factor error, inductive follows the power error
        let r = Dimension::Resistive.direction(&d);
        let i = Dimension::Inductive.direction(&d);
        if d.delta_factor != 0.0 {
            prop_assert_eq!(f64::from(r), -d.delta_factor.signum());
        }
        if d.delta_power != 0.0 {
            prop_assert_eq!(f64::from(i), d.delta_power.signum());
        }
    }

    #[test]
    fn matching_range_leaves_the_goal_alone(
        power in 0.1f64..100.0,
        factor in 0.05f64..1.0,
        range in 0.1f64..500.0,
    ) {
        let goal = GoalValue::new(power, factor);
        let values = GoalValue::new(power * 1.01, factor);
        prop_assert_eq!(
            make_deviation(values, goal, Some(range), range),
            make_deviation(values, goal, None, range)
        );
    }
}
