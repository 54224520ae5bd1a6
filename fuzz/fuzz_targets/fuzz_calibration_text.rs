#![no_main]
use burden_traits::{Calibration, GoalValue, NominalRange};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // An accepted calibration must survive its own canonical text form.
    if let Ok(Some(c)) = Calibration::parse(data) {
        let again = Calibration::parse(&c.to_string());
        assert_eq!(again, Ok(Some(c)));
    }
    let _ = GoalValue::parse(data);
    if let Ok(r) = NominalRange::parse(data) {
        assert!(r.value().is_finite() && r.value() > 0.0);
    }
});
