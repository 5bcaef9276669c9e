//! Capital Recovery Factor (spec §4.12).

/// `CRF(r,n) = r(1+r)^n / ((1+r)^n - 1)`; degenerates to `1/n` as `r -> 0`
/// to avoid a `0/0` division.
pub fn capital_recovery_factor(discount_rate: f64, lifetime_years: f64) -> f64 {
    if discount_rate.abs() < 1e-9 {
        return 1.0 / lifetime_years;
    }
    let growth = (1.0 + discount_rate).powf(lifetime_years);
    discount_rate * growth / (growth - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_value() {
        let crf = capital_recovery_factor(0.04, 25.0);
        assert!((crf - 0.06401).abs() < 1e-4);
    }

    #[test]
    fn zero_rate_is_straight_line() {
        let crf = capital_recovery_factor(0.0, 20.0);
        assert!((crf - 0.05).abs() < 1e-9);
    }

    #[test]
    fn near_zero_rate_behaves_like_zero() {
        let crf = capital_recovery_factor(1e-10, 20.0);
        assert!((crf - 0.05).abs() < 1e-6);
    }
}
