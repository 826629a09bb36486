//! Step-size rounding for exchange price and quantity filters.
//!
//! The exchange only accepts prices and quantities that are exact multiples
//! of a per-symbol increment. Rounding works on the reciprocal-scaled value
//! so the decimal steps used in practice (1e-2 down to 1e-8) divide cleanly.

use crate::Result;
use crate::error::TickSyncError;

/// Smallest increment handled anywhere in the protocol.
pub const MIN_STEP: f64 = 0.000_000_01;

/// Rounds `value` to the nearest multiple of `step`, half away from zero.
///
/// # Errors
///
/// Returns [`TickSyncError::InvalidStepSize`] if `step` is zero or negative.
pub fn round_to_step(value: f64, step: f64) -> Result<f64> {
    if step <= 0.0 {
        return Err(TickSyncError::InvalidStepSize(step));
    }

    let scale = 1.0 / step;
    Ok((value * scale).round() / scale)
}

/// Rounds `value` at the smallest supported increment (1e-8).
pub fn round8(value: f64) -> f64 {
    let scale = 1.0 / MIN_STEP;
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_tick_size() {
        assert_eq!(round_to_step(100.004, 0.01).unwrap(), 100.00);
        assert_eq!(round_to_step(100.006, 0.01).unwrap(), 100.01);
        assert_eq!(round_to_step(0.123_456_789, 0.000_001).unwrap(), 0.123_457);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // Exactly representable halves; decimal halves like 100.005 sit just
        // below .5 in binary and land on the nearer side instead.
        assert_eq!(round_to_step(2.5, 1.0).unwrap(), 3.0);
        assert_eq!(round_to_step(-2.5, 1.0).unwrap(), -3.0);
        assert_eq!(round_to_step(1.25, 0.5).unwrap(), 1.5);
    }

    #[test]
    fn rounding_is_idempotent() {
        for step in [0.01, 0.001, 0.000_01, MIN_STEP] {
            for value in [0.0, 1.234_567_89, 99.999_999, 12345.678_9, -3.141_59] {
                let once = round_to_step(value, step).unwrap();
                let twice = round_to_step(once, step).unwrap();
                assert_eq!(once, twice, "value {value} step {step}");
            }
        }
    }

    #[test]
    fn result_is_multiple_of_step() {
        let step = 0.01;
        for value in [0.005, 7.123_4, 100.004, 250.999] {
            let rounded = round_to_step(value, step).unwrap();
            let units = (rounded / step).round();
            assert!((rounded - units * step).abs() < 1e-9, "value {value}");
        }
    }

    #[test]
    fn rejects_zero_step() {
        let err = round_to_step(100.0, 0.0).unwrap_err();
        assert!(matches!(err, TickSyncError::InvalidStepSize(_)));
    }

    #[test]
    fn rejects_negative_step() {
        let err = round_to_step(100.0, -0.01).unwrap_err();
        assert!(matches!(err, TickSyncError::InvalidStepSize(_)));
    }

    #[test]
    fn round8_keeps_eight_decimals() {
        assert_eq!(round8(0.123_456_784_9), 0.123_456_78);
        assert_eq!(round8(0.123_456_786), 0.123_456_79);
        assert_eq!(round8(42.0), 42.0);
    }
}
