use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskParameters {
    /// Ceiling for any single position as a percentage of portfolio value
    pub max_position_size_percent: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            max_position_size_percent: 20.0,
        }
    }
}

/// Open share counts for one ticker
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub long: f64,
    pub short: f64,
}

/// Cash plus per-ticker cost basis. Position values are taken at cost, not
/// marked to market.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Portfolio {
    pub cash: f64,
    pub cost_basis: BTreeMap<String, f64>,
    pub positions: BTreeMap<String, Position>,
    pub margin_requirement: f64,
}

impl Portfolio {
    pub fn with_cash(cash: f64) -> Self {
        Self {
            cash,
            ..Default::default()
        }
    }

    pub fn total_value(&self) -> f64 {
        self.cash + self.cost_basis.values().sum::<f64>()
    }

    pub fn position_value(&self, ticker: &str) -> f64 {
        self.cost_basis.get(ticker).copied().unwrap_or(0.0)
    }

    /// Every ticker with a cost basis or open shares. A ticker known only by
    /// cost basis still shows up, with zero share counts.
    pub fn holdings(&self) -> BTreeMap<String, Holding> {
        let mut holdings: BTreeMap<String, Holding> = BTreeMap::new();
        for (ticker, cost) in &self.cost_basis {
            holdings.entry(ticker.clone()).or_default().cost_basis = *cost;
        }
        for (ticker, position) in &self.positions {
            let holding = holdings.entry(ticker.clone()).or_default();
            holding.long = position.long;
            holding.short = position.short;
        }
        holdings
    }
}

/// What the portfolio manager is told is held for one ticker
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub long: f64,
    pub short: f64,
    pub cost_basis: f64,
}

/// Every intermediate figure behind a position ceiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReasoning {
    pub portfolio_value: f64,
    pub current_position: f64,
    pub position_limit: f64,
    pub remaining_limit: f64,
    pub available_cash: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAnalysis {
    pub ticker: String,
    /// Largest additional position value allowed, never negative
    pub remaining_position_limit: f64,
    pub current_price: f64,
    pub reasoning: RiskReasoning,
}
