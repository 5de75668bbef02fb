use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Daily OHLCV price bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One reporting period's ratios. Lists of snapshots are ordered newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub ticker: String,
    pub report_period: NaiveDate,
    pub period: String,
    pub currency: String,
    pub market_cap: Option<f64>,
    pub enterprise_value: Option<f64>,
    pub price_to_earnings_ratio: Option<f64>,
    pub price_to_book_ratio: Option<f64>,
    pub price_to_sales_ratio: Option<f64>,
    pub return_on_equity: Option<f64>,
    pub return_on_assets: Option<f64>,
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub debt_to_assets: Option<f64>,
    pub revenue_growth: Option<f64>,
    pub earnings_growth: Option<f64>,
    pub book_value_growth: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub free_cash_flow_per_share: Option<f64>,
}

/// One reporting period's statement fields. Only the fields requested from
/// the data source are populated; everything else stays `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    pub ticker: String,
    pub report_period: NaiveDate,
    pub period: String,
    pub currency: String,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub earnings_per_share: Option<f64>,
    pub book_value_per_share: Option<f64>,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
    pub current_assets: Option<f64>,
    pub current_liabilities: Option<f64>,
    pub dividends_and_other_cash_distributions: Option<f64>,
    pub outstanding_shares: Option<f64>,
    pub operating_margin: Option<f64>,
    pub gross_margin: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub free_cash_flow: Option<f64>,
}

/// Insider transaction; `transaction_shares` is negative for disposals
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InsiderTrade {
    pub ticker: String,
    pub issuer: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    pub transaction_date: Option<String>,
    pub transaction_shares: Option<f64>,
    pub transaction_price_per_share: Option<f64>,
    pub transaction_value: Option<f64>,
    pub filing_date: String,
}

/// News article with an optional sentiment label
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyNewsItem {
    pub ticker: String,
    pub title: String,
    pub author: Option<String>,
    pub source: Option<String>,
    pub date: String,
    pub url: Option<String>,
    pub sentiment: Option<String>,
}

/// Categorical investment signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

impl Signal {
    /// Proportional threshold rule shared by every level that emits a signal:
    /// bullish at >= 70% of the maximum, bearish at <= 30%, neutral between.
    /// Compared in tenths so integer scores never hit float rounding.
    pub fn from_score(score: u32, max_score: u32) -> Self {
        let score = u64::from(score) * 10;
        let max = u64::from(max_score);
        if score >= 7 * max {
            Signal::Bullish
        } else if score <= 3 * max {
            Signal::Bearish
        } else {
            Signal::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Bullish => "bullish",
            Signal::Bearish => "bearish",
            Signal::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored output of a strategy or one of its sub-analyses.
///
/// Built once by the scorer and handed to the caller; the signal is always
/// derived from `(score, max_score)` via [`Signal::from_score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u32,
    pub max_score: u32,
    pub signal: Signal,
    pub details: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sub_analyses: BTreeMap<String, ScoreResult>,
}

impl ScoreResult {
    /// Leaf result. The score is clamped to `max_score`.
    pub fn new(score: u32, max_score: u32, details: Vec<String>) -> Self {
        let score = score.min(max_score);
        Self {
            score,
            max_score,
            signal: Signal::from_score(score, max_score),
            details,
            metrics: BTreeMap::new(),
            sub_analyses: BTreeMap::new(),
        }
    }

    /// Zero-score result carrying a single diagnostic.
    pub fn insufficient(max_score: u32, detail: impl Into<String>) -> Self {
        Self::new(0, max_score, vec![detail.into()])
    }

    /// Strategy-level result: score is the sum of the sub-analysis scores,
    /// details are the sub-analysis details prefixed with their names.
    pub fn aggregate(max_score: u32, sub_analyses: Vec<(&str, ScoreResult)>) -> Self {
        let score: u32 = sub_analyses.iter().map(|(_, sub)| sub.score).sum();
        let details = sub_analyses
            .iter()
            .flat_map(|(name, sub)| sub.details.iter().map(move |d| format!("[{}] {}", name, d)))
            .collect();
        let mut result = Self::new(score, max_score, details);
        result.sub_analyses = sub_analyses
            .into_iter()
            .map(|(name, sub)| (name.to_string(), sub))
            .collect();
        result
    }

    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        if value.is_finite() {
            self.metrics.insert(name.to_string(), value);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_thresholds() {
        assert_eq!(Signal::from_score(11, 15), Signal::Bullish);
        assert_eq!(Signal::from_score(10, 15), Signal::Neutral);
        assert_eq!(Signal::from_score(5, 15), Signal::Neutral);
        assert_eq!(Signal::from_score(4, 15), Signal::Bearish);
        assert_eq!(Signal::from_score(7, 10), Signal::Bullish);
        assert_eq!(Signal::from_score(3, 10), Signal::Bearish);
    }

    #[test]
    fn test_signal_serializes_lowercase() {
        let json = serde_json::to_string(&Signal::Bearish).unwrap();
        assert_eq!(json, "\"bearish\"");
    }

    #[test]
    fn test_new_clamps_to_max() {
        let result = ScoreResult::new(9, 4, vec!["x".to_string()]);
        assert_eq!(result.score, 4);
        assert_eq!(result.signal, Signal::Bullish);
    }

    #[test]
    fn test_aggregate_sums_sub_scores() {
        let a = ScoreResult::new(3, 4, vec!["a".to_string()]);
        let b = ScoreResult::insufficient(5, "no data");
        let total = ScoreResult::aggregate(9, vec![("alpha", a), ("beta", b)]);

        assert_eq!(total.score, 3);
        assert_eq!(total.max_score, 9);
        assert_eq!(total.signal, Signal::Neutral);
        assert_eq!(total.sub_analyses.len(), 2);
        assert_eq!(total.details, vec!["[alpha] a", "[beta] no data"]);
    }

    #[test]
    fn test_non_finite_metrics_are_dropped() {
        let result = ScoreResult::new(0, 1, vec![]).with_metric("nan", f64::NAN);
        assert!(result.metrics.is_empty());
    }
}
