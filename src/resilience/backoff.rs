//! Exponential backoff.

use std::time::Duration;

/// Multiplier actually applied: NaN and values below 1.0 fall back to 1.0.
pub fn effective_multiplier(multiplier: f64) -> f64 {
    if multiplier >= 1.0 {
        multiplier
    } else {
        1.0
    }
}

/// Calculate the delay to wait after the attempt with zero-based index `attempt`.
///
/// `delay = base * multiplier^attempt`, saturating at [`Duration::MAX`].
/// Whole-number multipliers are computed in integer arithmetic so the result
/// is exact; fractional ones go through `f64`. No jitter is applied.
pub fn calculate_backoff(attempt: u32, base: Duration, multiplier: f64) -> Duration {
    if base.is_zero() {
        return Duration::ZERO;
    }

    let multiplier = effective_multiplier(multiplier);

    if multiplier.fract() == 0.0 && multiplier <= u32::MAX as f64 {
        return (multiplier as u32)
            .checked_pow(attempt)
            .and_then(|factor| base.checked_mul(factor))
            .unwrap_or(Duration::MAX);
    }

    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let factor = multiplier.powi(exponent);
    Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let base = Duration::from_millis(1000);
        assert_eq!(calculate_backoff(0, base, 2.0), Duration::from_millis(1000));
        assert_eq!(calculate_backoff(1, base, 2.0), Duration::from_millis(2000));
        assert_eq!(calculate_backoff(2, base, 2.0), Duration::from_millis(4000));
        assert_eq!(calculate_backoff(3, base, 2.0), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_exact_at_high_attempts() {
        let base = Duration::from_millis(333);
        for attempt in 0..32 {
            let expected = base.checked_mul(2u32.pow(attempt)).unwrap();
            assert_eq!(calculate_backoff(attempt, base, 2.0), expected, "attempt {}", attempt);
        }
    }

    #[test]
    fn test_backoff_custom_multiplier() {
        let base = Duration::from_millis(100);
        assert_eq!(calculate_backoff(2, base, 3.0), Duration::from_millis(900));
        assert_eq!(calculate_backoff(5, base, 1.0), base);
        assert_eq!(
            calculate_backoff(2, Duration::from_secs(1), 1.5),
            Duration::from_millis(2250)
        );
    }

    #[test]
    fn test_invalid_multiplier_means_constant_delay() {
        let base = Duration::from_millis(100);
        for multiplier in [f64::NAN, -2.0, 0.0, 0.5] {
            assert_eq!(calculate_backoff(3, base, multiplier), base);
        }
    }

    #[test]
    fn test_backoff_saturates() {
        assert_eq!(calculate_backoff(u32::MAX, Duration::from_secs(1), 2.0), Duration::MAX);
        assert_eq!(calculate_backoff(64, Duration::from_secs(1), 2.0), Duration::MAX);
        assert_eq!(calculate_backoff(5000, Duration::from_secs(1), 1.5), Duration::MAX);
    }

    #[test]
    fn test_zero_base_never_waits() {
        assert_eq!(calculate_backoff(4, Duration::ZERO, 2.0), Duration::ZERO);
    }
}
