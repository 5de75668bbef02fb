//! Intrinsic-value sub-models shared by the strategy scorers.
//!
//! Every function returns `None` when its estimate is undefined for the given
//! inputs instead of producing a meaningless number.

/// Net current asset value: current assets minus total liabilities.
pub fn net_current_asset_value(current_assets: f64, total_liabilities: f64) -> f64 {
    current_assets - total_liabilities
}

/// Graham number `sqrt(22.5 * EPS * BVPS)`, defined only for positive EPS and
/// book value per share.
pub fn graham_number(eps: f64, book_value_per_share: f64) -> Option<f64> {
    if eps > 0.0 && book_value_per_share > 0.0 {
        Some((22.5 * eps * book_value_per_share).sqrt())
    } else {
        None
    }
}

/// Proportional gap between an estimate and the current price (or market cap).
pub fn margin_of_safety(estimate: f64, current: f64) -> Option<f64> {
    if current > 0.0 {
        Some((estimate - current) / current)
    } else {
        None
    }
}

/// Fixed assumptions for the free-cash-flow DCF
#[derive(Debug, Clone, Copy)]
pub struct DcfAssumptions {
    pub growth_rate: f64,
    pub discount_rate: f64,
    pub terminal_multiple: f64,
    pub projection_years: i32,
}

impl Default for DcfAssumptions {
    fn default() -> Self {
        Self {
            growth_rate: 0.06,
            discount_rate: 0.10,
            terminal_multiple: 15.0,
            projection_years: 5,
        }
    }
}

/// Present value of `free_cash_flow` grown for `projection_years`, plus a
/// terminal value of `terminal_multiple` times the final projected cash flow,
/// all discounted back at `discount_rate`. Undefined for non-positive FCF.
pub fn discounted_cash_flow(free_cash_flow: f64, assumptions: &DcfAssumptions) -> Option<f64> {
    if free_cash_flow <= 0.0 {
        return None;
    }

    let growth = 1.0_f64 + assumptions.growth_rate;
    let discount = 1.0_f64 + assumptions.discount_rate;
    let years = assumptions.projection_years;

    let projected: f64 = (1..=years)
        .map(|year| free_cash_flow * growth.powi(year) / discount.powi(year))
        .sum();
    let terminal_value =
        free_cash_flow * growth.powi(years) * assumptions.terminal_multiple / discount.powi(years);

    Some(projected + terminal_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_graham_number() {
        // sqrt(22.5 * 2 * 20) = 30
        assert_relative_eq!(graham_number(2.0, 20.0).unwrap(), 30.0, epsilon = 1e-9);
        assert!(graham_number(0.0, 20.0).is_none());
        assert!(graham_number(2.0, -1.0).is_none());
    }

    #[test]
    fn test_margin_of_safety() {
        assert_relative_eq!(margin_of_safety(150.0, 100.0).unwrap(), 0.5, epsilon = 1e-12);
        assert!(margin_of_safety(150.0, 0.0).is_none());
    }

    #[test]
    fn test_dcf_undefined_for_non_positive_fcf() {
        let assumptions = DcfAssumptions::default();
        assert!(discounted_cash_flow(0.0, &assumptions).is_none());
        assert!(discounted_cash_flow(-5.0, &assumptions).is_none());
    }

    #[test]
    fn test_dcf_matches_hand_computation() {
        let assumptions = DcfAssumptions::default();
        let fcf = 100.0;
        let mut expected = 0.0;
        for year in 1..=5 {
            expected += fcf * 1.06_f64.powi(year) / 1.10_f64.powi(year);
        }
        expected += fcf * 1.06_f64.powi(5) * 15.0 / 1.10_f64.powi(5);

        let value = discounted_cash_flow(fcf, &assumptions).unwrap();
        assert_relative_eq!(value, expected, epsilon = 1e-9);
        // Roughly 17x the starting cash flow under these assumptions
        assert!(value > 1650.0 && value < 1750.0);
    }
}
