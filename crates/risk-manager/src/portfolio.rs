use analysis_core::Signal;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Portfolio, RiskAnalysis};

const PORTFOLIO_PROMPT: &str = r#"You are a portfolio manager making final trading decisions based on multiple tickers.

Trading Rules:
- For long positions:
  * Only buy if you have available cash
  * Only sell if you currently hold long shares of that ticker
  * Sell quantity must be <= current long position shares
  * Buy quantity must be <= max_shares for that ticker

- For short positions:
  * Only short if you have available margin (50% of position value required)
  * Only cover if you currently have short shares of that ticker
  * Cover quantity must be <= current short position shares
  * Short quantity must respect margin requirements

- The max_shares values are pre-calculated to respect position limits
- Consider both long and short opportunities based on signals
- Maintain appropriate risk management with both long and short exposure

Available Actions:
- "buy": Open or add to long position
- "sell": Close or reduce long position
- "short": Open or add to short position
- "cover": Close or reduce short position
- "hold": No action

Inputs:
- signals_by_ticker: dictionary of ticker -> signals
- max_shares: maximum shares allowed per ticker
- portfolio_cash: current cash in portfolio
- portfolio_positions: current positions (both long and short)
- current_prices: current prices for each ticker
- margin_requirement: current margin requirement for short positions"#;

/// One analyst's vote as seen by the portfolio manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSignal {
    pub signal: Signal,
    pub confidence: Option<f64>,
}

/// Inputs for the final trading decision on one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioDecisionContext {
    pub ticker: String,
    pub current_price: f64,
    pub max_shares: u64,
    pub signals: BTreeMap<String, AgentSignal>,
    pub prompt: String,
    pub user_message: String,
}

/// Whole shares affordable within the remaining position limit.
pub fn max_shares(remaining_limit: f64, price: f64) -> u64 {
    if price <= 0.0 || remaining_limit <= 0.0 {
        return 0;
    }
    let limit = Decimal::from_f64(remaining_limit).unwrap_or_default();
    let price = Decimal::from_f64(price).unwrap_or(Decimal::ONE);
    (limit / price).floor().to_u64().unwrap_or(0)
}

pub fn build_decision_context(
    portfolio: &Portfolio,
    risk: &RiskAnalysis,
    signals: BTreeMap<String, AgentSignal>,
) -> PortfolioDecisionContext {
    let ticker = risk.ticker.as_str();
    let max_shares = max_shares(risk.remaining_position_limit, risk.current_price);

    let mut signals_by_ticker = BTreeMap::new();
    signals_by_ticker.insert(ticker, &signals);
    let mut current_prices = BTreeMap::new();
    current_prices.insert(ticker, risk.current_price);
    let mut max_shares_by_ticker = BTreeMap::new();
    max_shares_by_ticker.insert(ticker, max_shares);

    let user_message = format!(
        r#"Based on the team's analysis, make your trading decisions for each ticker.

Here are the signals by ticker:
{}

Current Prices:
{}

Maximum Shares Allowed For Purchases:
{}

Portfolio Cash: {:.2}
Current Positions: {}
Current Margin Requirement: {:.2}

Output strictly in JSON with the following structure:
{{
  "decisions": {{
    "{}": {{
      "action": "buy/sell/short/cover/hold",
      "quantity": integer,
      "confidence": float between 0 and 100,
      "reasoning": "string"
    }}
  }}
}}"#,
        to_json(&signals_by_ticker),
        to_json(&current_prices),
        to_json(&max_shares_by_ticker),
        portfolio.cash,
        to_json(&portfolio.holdings()),
        portfolio.margin_requirement,
        ticker,
    );

    PortfolioDecisionContext {
        ticker: ticker.to_string(),
        current_price: risk.current_price,
        max_shares,
        signals,
        prompt: PORTFOLIO_PROMPT.to_string(),
        user_message,
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
