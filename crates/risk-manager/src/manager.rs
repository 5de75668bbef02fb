use analysis_core::PriceBar;

use crate::models::*;

/// Position ceilings from portfolio composition. Pure: no I/O, no clock.
#[derive(Debug, Clone, Default)]
pub struct RiskManager {
    params: RiskParameters,
}

impl RiskManager {
    pub fn new(params: RiskParameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> &RiskParameters {
        &self.params
    }

    /// Ceiling for adding to `ticker`: the configured share of portfolio
    /// value, less what is already held, capped by available cash.
    pub fn position_limit(&self, ticker: &str, portfolio: &Portfolio, current_price: f64) -> RiskAnalysis {
        let portfolio_value = portfolio.total_value();
        let current_position = portfolio.position_value(ticker);
        let position_limit = portfolio_value * (self.params.max_position_size_percent / 100.0);
        let remaining_limit = position_limit - current_position;
        let max_position = remaining_limit.min(portfolio.cash).max(0.0);

        RiskAnalysis {
            ticker: ticker.to_string(),
            remaining_position_limit: max_position,
            current_price,
            reasoning: RiskReasoning {
                portfolio_value,
                current_position,
                position_limit,
                remaining_limit,
                available_cash: portfolio.cash,
            },
        }
    }

    /// Same as [`position_limit`](Self::position_limit) priced at the latest
    /// close. `None` when there are no bars.
    pub fn assess(&self, ticker: &str, portfolio: &Portfolio, prices: &[PriceBar]) -> Option<RiskAnalysis> {
        let current_price = latest_close(prices)?;
        Some(self.position_limit(ticker, portfolio, current_price))
    }
}

/// Close of the most recent bar regardless of input order
pub fn latest_close(prices: &[PriceBar]) -> Option<f64> {
    prices.iter().max_by_key(|bar| bar.time).map(|bar| bar.close)
}
