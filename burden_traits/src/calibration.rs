//! Coarse/fine trim settings and their textual hardware encoding.
//!
//! Wire form: `"1;0xRC;0xRF;0xIC;0xIF;offset"` for an enabled calibration,
//! `"0"` for a load point without calibration.

use core::fmt;

use crate::error::ModelError;

/// Largest value a coarse or fine trim register accepts.
pub const TRIM_MAX: u8 = 127;

/// One trim channel: a coarse and a fine register, both in `0..=TRIM_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalibrationPair {
    coarse: u8,
    fine: u8,
}

impl CalibrationPair {
    pub fn new(coarse: u8, fine: u8) -> Result<Self, ModelError> {
        Ok(Self {
            coarse: check_trim("coarse", coarse)?,
            fine: check_trim("fine", fine)?,
        })
    }

    #[inline]
    pub fn coarse(&self) -> u8 {
        self.coarse
    }

    #[inline]
    pub fn fine(&self) -> u8 {
        self.fine
    }

    /// Same coarse value with the fine register replaced.
    pub fn with_fine(self, fine: u8) -> Result<Self, ModelError> {
        Self::new(self.coarse, fine)
    }

    /// Move the coarse register by `delta`.
    ///
    /// Returns `None` ("no movement possible") when `delta == 0`, or when the
    /// target leaves `0..=127` and `clip` is false. With `clip`, the target
    /// saturates at the boundary, so a move past a rail the pair already sits
    /// on returns the pair unchanged.
    pub fn change_coarse(self, delta: i16, clip: bool) -> Option<Self> {
        shift_trim(self.coarse, delta, clip).map(|coarse| Self { coarse, ..self })
    }

    /// Move the fine register by `delta`; never clips.
    pub fn change_fine(self, delta: i16) -> Option<Self> {
        shift_trim(self.fine, delta, false).map(|fine| Self { fine, ..self })
    }
}

impl fmt::Display for CalibrationPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.coarse, self.fine)
    }
}

#[inline]
fn check_trim(field: &'static str, value: u8) -> Result<u8, ModelError> {
    if value > TRIM_MAX {
        return Err(ModelError::Range { field, value });
    }
    Ok(value)
}

fn shift_trim(value: u8, delta: i16, clip: bool) -> Option<u8> {
    if delta == 0 {
        return None;
    }
    let max = i16::from(TRIM_MAX);
    let mut target = i16::from(value).saturating_add(delta);
    if clip {
        target = target.clamp(0, max);
    } else if !(0..=max).contains(&target) {
        return None;
    }
    u8::try_from(target).ok()
}

/// Full burden calibration: a resistive and an inductive trim pair.
///
/// Value-equal and hashable so the search can remember which settings it
/// already visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Calibration {
    pub resistive: CalibrationPair,
    pub inductive: CalibrationPair,
}

impl Calibration {
    pub fn new(resistive: CalibrationPair, inductive: CalibrationPair) -> Self {
        Self {
            resistive,
            inductive,
        }
    }

    /// Build from four raw register values, validating each.
    pub fn from_registers(
        resistive_coarse: u8,
        resistive_fine: u8,
        inductive_coarse: u8,
        inductive_fine: u8,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            resistive: CalibrationPair::new(resistive_coarse, resistive_fine)?,
            inductive: CalibrationPair::new(inductive_coarse, inductive_fine)?,
        })
    }

    pub fn with_resistive(self, resistive: CalibrationPair) -> Self {
        Self { resistive, ..self }
    }

    pub fn with_inductive(self, inductive: CalibrationPair) -> Self {
        Self { inductive, ..self }
    }

    /// Decode the hardware text form.
    ///
    /// - `"0"` (or a six-field record with enable flag `0`) yields `Ok(None)`.
    /// - `"1;0x71;0x2f;0x33;0x00;0.0000"` yields the enabled calibration.
    ///
    /// Wrong field counts and unknown flags are argument errors, bad hex or
    /// offset text is a format error, register values above 127 are range
    /// errors.
    pub fn parse(text: &str) -> Result<Option<Self>, ModelError> {
        let fields: Vec<&str> = text.split(';').map(str::trim).collect();
        match fields.as_slice() {
            ["0"] => Ok(None),
            [flag, rc, rf, ic, inf, offset] => {
                match *flag {
                    "0" => return Ok(None),
                    "1" => {}
                    other => {
                        return Err(ModelError::Argument(format!(
                            "calibration enable flag must be 0 or 1, got '{other}'"
                        )));
                    }
                }
                let calibration = Self {
                    resistive: CalibrationPair {
                        coarse: parse_register("resistive coarse", rc)?,
                        fine: parse_register("resistive fine", rf)?,
                    },
                    inductive: CalibrationPair {
                        coarse: parse_register("inductive coarse", ic)?,
                        fine: parse_register("inductive fine", inf)?,
                    },
                };
                offset.parse::<f64>().map_err(|_| {
                    ModelError::Format(format!("calibration offset '{offset}' is not a number"))
                })?;
                Ok(Some(calibration))
            }
            _ => Err(ModelError::Argument(format!(
                "calibration text must have 1 or 6 ';'-separated fields, got {} in '{text}'",
                fields.len()
            ))),
        }
    }
}

fn parse_register(field: &'static str, text: &str) -> Result<u8, ModelError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .ok_or_else(|| ModelError::Format(format!("{field} '{text}' lacks the 0x prefix")))?;
    if digits.is_empty() || digits.len() > 2 {
        return Err(ModelError::Format(format!(
            "{field} '{text}' is not a one-byte hex value"
        )));
    }
    let value = u8::from_str_radix(digits, 16)
        .map_err(|_| ModelError::Format(format!("{field} '{text}' is not valid hex")))?;
    check_trim(field, value)
}

impl fmt::Display for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "1;0x{:02x};0x{:02x};0x{:02x};0x{:02x};0.0000",
            self.resistive.coarse,
            self.resistive.fine,
            self.inductive.coarse,
            self.inductive.fine
        )
    }
}

impl core::str::FromStr for Calibration {
    type Err = ModelError;

    /// Strict variant of [`Calibration::parse`]: a disabled load point is an
    /// argument error here.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)?.ok_or_else(|| {
            ModelError::Argument("load point has no calibration (\"0\")".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn pair(c: u8, f: u8) -> CalibrationPair {
        CalibrationPair::new(c, f).unwrap()
    }

    #[test]
    fn zero_delta_is_no_change() {
        let p = pair(64, 64);
        assert_eq!(p.change_coarse(0, false), None);
        assert_eq!(p.change_coarse(0, true), None);
        assert_eq!(p.change_fine(0), None);
    }

    #[rstest]
    #[case(127, 1)]
    #[case(0, -1)]
    fn unclipped_coarse_stops_at_boundary(#[case] coarse: u8, #[case] delta: i16) {
        assert_eq!(pair(coarse, 10).change_coarse(delta, false), None);
        assert_eq!(pair(10, coarse).change_fine(delta), None);
    }

    #[test]
    fn clipped_coarse_saturates() {
        assert_eq!(pair(120, 5).change_coarse(64, true), Some(pair(127, 5)));
        assert_eq!(pair(20, 5).change_coarse(-64, true), Some(pair(0, 5)));
        assert_eq!(pair(120, 5).change_coarse(64, false), None);
    }

    #[rstest]
    #[case(127, 1)]
    #[case(127, 64)]
    #[case(0, -1)]
    #[case(0, -64)]
    fn clipped_coarse_on_the_rail_stays_put(#[case] coarse: u8, #[case] delta: i16) {
        let p = pair(coarse, 5);
        assert_eq!(p.change_coarse(delta, true), Some(p));
        assert_eq!(p.change_coarse(delta, false), None);
    }

    #[test]
    fn large_unclipped_moves_inside_range() {
        assert_eq!(pair(64, 64).change_fine(-20), Some(pair(64, 44)));
        assert_eq!(pair(64, 110).change_fine(20), None);
    }

    #[test]
    fn parses_reference_record() {
        let c = Calibration::parse("1;0x71;0x2f;0x33;0x00;0.0000")
            .unwrap()
            .unwrap();
        assert_eq!(c.resistive, pair(113, 47));
        assert_eq!(c.inductive, pair(51, 0));
        assert_eq!(c.to_string(), "1;0x71;0x2f;0x33;0x00;0.0000");
    }

    #[rstest]
    #[case("0")]
    #[case(" 0 ")]
    #[case("0;0x00;0x00;0x00;0x00;0.0000")]
    fn disabled_load_points(#[case] text: &str) {
        assert_eq!(Calibration::parse(text).unwrap(), None);
    }

    #[rstest]
    #[case("")]
    #[case("1")]
    #[case("1;0x71;0x2f;0x33;0x00")]
    #[case("1;0x71;0x2f;0x33;0x00;0.0000;7")]
    #[case("2;0x71;0x2f;0x33;0x00;0.0000")]
    fn argument_errors(#[case] text: &str) {
        assert!(matches!(
            Calibration::parse(text),
            Err(ModelError::Argument(_))
        ));
    }

    #[rstest]
    #[case("1;71;0x2f;0x33;0x00;0.0000")]
    #[case("1;0xzz;0x2f;0x33;0x00;0.0000")]
    #[case("1;0x;0x2f;0x33;0x00;0.0000")]
    #[case("1;0x100;0x2f;0x33;0x00;0.0000")]
    #[case("1;0x71;0x2f;0x33;0x00;abc")]
    fn format_errors(#[case] text: &str) {
        assert!(matches!(Calibration::parse(text), Err(ModelError::Format(_))));
    }

    #[rstest]
    #[case("1;0x80;0x2f;0x33;0x00;0.0000", "resistive coarse", 128)]
    #[case("1;0x71;0xff;0x33;0x00;0.0000", "resistive fine", 255)]
    #[case("1;0x71;0x2f;0x80;0x00;0.0000", "inductive coarse", 128)]
    #[case("1;0x71;0x2f;0x33;0x9a;0.0000", "inductive fine", 154)]
    fn range_errors_name_the_register(
        #[case] text: &str,
        #[case] field: &'static str,
        #[case] value: u8,
    ) {
        let err = Calibration::parse(text).unwrap_err();
        assert_eq!(err, ModelError::Range { field, value });
        assert!(err.to_string().starts_with(field));
    }

    #[test]
    fn pair_construction_reports_the_bare_register() {
        assert_eq!(
            CalibrationPair::new(128, 0).unwrap_err(),
            ModelError::Range {
                field: "coarse",
                value: 128
            }
        );
    }

    #[test]
    fn from_str_rejects_disabled() {
        assert!("0".parse::<Calibration>().is_err());
        assert!("1;0x01;0x02;0x03;0x04;0.0000".parse::<Calibration>().is_ok());
    }

    proptest! {
        #[test]
        fn construction_in_range_round_trips(c in 0u8..=127, f in 0u8..=127) {
            let p = CalibrationPair::new(c, f).unwrap();
            prop_assert_eq!((p.coarse(), p.fine()), (c, f));
        }

        #[test]
        fn construction_above_range_fails(c in 128u8..=255, f in 0u8..=127) {
            let is_range_err = matches!(CalibrationPair::new(c, f), Err(ModelError::Range { .. }));
            prop_assert!(is_range_err);
            let is_range_err = matches!(CalibrationPair::new(f, c), Err(ModelError::Range { .. }));
            prop_assert!(is_range_err);
        }

        #[test]
        fn clipped_moves_stay_in_range(c in 0u8..=127, delta in -300i16..=300) {
            match pair(c, 0).change_coarse(delta, true) {
                Some(p) => {
                    prop_assert!(p.coarse() <= TRIM_MAX);
                    let expected = (i16::from(c) + delta).clamp(0, i16::from(TRIM_MAX));
                    prop_assert_eq!(i16::from(p.coarse()), expected);
                }
                None => prop_assert_eq!(delta, 0),
            }
        }

        #[test]
        fn text_form_round_trips(rc in 0u8..=127, rf in 0u8..=127, ic in 0u8..=127, inf in 0u8..=127) {
            let c = Calibration::from_registers(rc, rf, ic, inf).unwrap();
            prop_assert_eq!(Calibration::parse(&c.to_string()).unwrap(), Some(c));
        }
    }
}
