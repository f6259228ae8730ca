// src/utils/score.rs

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Share of correct answers as a percentage, rounded to two decimals.
///
/// A zero `total` yields `0.0` rather than NaN.
pub fn percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(f64::from(score) / f64::from(total) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(5, 5), 100.0);
        assert_eq!(percentage(0, 4), 0.0);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        assert_eq!(percentage(0, 0), 0.0);
    }
}
