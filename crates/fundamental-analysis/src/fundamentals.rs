use analysis_core::{MetricsSnapshot, Signal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One categorical vote with the metric values behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSignal {
    pub signal: Signal,
    pub details: String,
}

/// Majority vote over the four fundamentals sub-signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsReport {
    pub signal: Signal,
    /// 0-100
    pub confidence: f64,
    pub reasoning: BTreeMap<String, SubSignal>,
}

const SUB_SIGNAL_COUNT: usize = 4;

/// Scores the most recent snapshot (index 0) on profitability, growth,
/// financial health and price multiples, then takes a majority vote.
pub fn analyze_fundamentals(metrics: &[MetricsSnapshot]) -> FundamentalsReport {
    let Some(latest) = metrics.first() else {
        let mut reasoning = BTreeMap::new();
        reasoning.insert(
            "data".to_string(),
            SubSignal {
                signal: Signal::Neutral,
                details: "No financial metrics available".to_string(),
            },
        );
        return FundamentalsReport {
            signal: Signal::Neutral,
            confidence: 0.0,
            reasoning,
        };
    };

    let sub_signals = [
        ("profitability_signal", profitability(latest)),
        ("growth_signal", growth(latest)),
        ("financial_health_signal", financial_health(latest)),
        ("price_ratios_signal", price_ratios(latest)),
    ];

    let bullish = sub_signals.iter().filter(|(_, s)| s.signal == Signal::Bullish).count();
    let bearish = sub_signals.iter().filter(|(_, s)| s.signal == Signal::Bearish).count();

    let signal = match bullish.cmp(&bearish) {
        std::cmp::Ordering::Greater => Signal::Bullish,
        std::cmp::Ordering::Less => Signal::Bearish,
        std::cmp::Ordering::Equal => Signal::Neutral,
    };
    let confidence = (100.0 * bullish.max(bearish) as f64 / SUB_SIGNAL_COUNT as f64).round();

    FundamentalsReport {
        signal,
        confidence,
        reasoning: sub_signals
            .into_iter()
            .map(|(name, sub)| (name.to_string(), sub))
            .collect(),
    }
}

fn passes_above(value: Option<f64>, threshold: f64) -> bool {
    value.is_some_and(|v| v > threshold)
}

/// Two or more passes is bullish, none is bearish.
fn signal_from_passes(passes: usize) -> Signal {
    match passes {
        0 => Signal::Bearish,
        1 => Signal::Neutral,
        _ => Signal::Bullish,
    }
}

fn fmt_pct(label: &str, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}: {:.2}%", label, v * 100.0),
        None => format!("{}: N/A", label),
    }
}

fn fmt_ratio(label: &str, value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}: {:.2}", label, v),
        None => format!("{}: N/A", label),
    }
}

fn profitability(m: &MetricsSnapshot) -> SubSignal {
    let passes = [
        passes_above(m.return_on_equity, 0.15),
        passes_above(m.net_margin, 0.20),
        passes_above(m.operating_margin, 0.15),
    ]
    .into_iter()
    .filter(|&p| p)
    .count();

    SubSignal {
        signal: signal_from_passes(passes),
        details: [
            fmt_pct("ROE", m.return_on_equity),
            fmt_pct("Net Margin", m.net_margin),
            fmt_pct("Op Margin", m.operating_margin),
        ]
        .join(", "),
    }
}

fn growth(m: &MetricsSnapshot) -> SubSignal {
    let passes = [
        passes_above(m.revenue_growth, 0.10),
        passes_above(m.earnings_growth, 0.10),
        passes_above(m.book_value_growth, 0.10),
    ]
    .into_iter()
    .filter(|&p| p)
    .count();

    SubSignal {
        signal: signal_from_passes(passes),
        details: [
            fmt_pct("Revenue Growth", m.revenue_growth),
            fmt_pct("Earnings Growth", m.earnings_growth),
            fmt_pct("Book Value Growth", m.book_value_growth),
        ]
        .join(", "),
    }
}

fn financial_health(m: &MetricsSnapshot) -> SubSignal {
    let strong_fcf_conversion = match (m.free_cash_flow_per_share, m.earnings_per_share) {
        (Some(fcf), Some(eps)) => fcf > eps * 0.8,
        _ => false,
    };
    let passes = [
        passes_above(m.current_ratio, 1.5),
        m.debt_to_equity.is_some_and(|d| d < 0.5),
        strong_fcf_conversion,
    ]
    .into_iter()
    .filter(|&p| p)
    .count();

    SubSignal {
        signal: signal_from_passes(passes),
        details: [
            fmt_ratio("Current Ratio", m.current_ratio),
            fmt_ratio("D/E", m.debt_to_equity),
            fmt_ratio("FCF/Share", m.free_cash_flow_per_share),
            fmt_ratio("EPS", m.earnings_per_share),
        ]
        .join(", "),
    }
}

/// Expensive multiples vote bearish, so the pass mapping is inverted.
fn price_ratios(m: &MetricsSnapshot) -> SubSignal {
    let expensive = [
        passes_above(m.price_to_earnings_ratio, 25.0),
        passes_above(m.price_to_book_ratio, 3.0),
        passes_above(m.price_to_sales_ratio, 5.0),
    ]
    .into_iter()
    .filter(|&p| p)
    .count();

    let signal = match expensive {
        0 => Signal::Bullish,
        1 => Signal::Neutral,
        _ => Signal::Bearish,
    };

    SubSignal {
        signal,
        details: [
            fmt_ratio("P/E", m.price_to_earnings_ratio),
            fmt_ratio("P/B", m.price_to_book_ratio),
            fmt_ratio("P/S", m.price_to_sales_ratio),
        ]
        .join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::metrics;
    use approx::assert_relative_eq;

    #[test]
    fn test_profitability_only_snapshot() {
        let snapshot = MetricsSnapshot {
            return_on_equity: Some(0.20),
            net_margin: Some(0.25),
            operating_margin: Some(0.18),
            ..metrics(2024)
        };
        let report = analyze_fundamentals(&[snapshot]);

        assert_eq!(report.reasoning["profitability_signal"].signal, Signal::Bullish);
        assert_eq!(report.reasoning["growth_signal"].signal, Signal::Bearish);
        assert_eq!(report.reasoning["financial_health_signal"].signal, Signal::Bearish);
        // No multiples reported, so nothing counts as expensive
        assert_eq!(report.reasoning["price_ratios_signal"].signal, Signal::Bullish);

        // Two bullish vs two bearish
        assert_eq!(report.signal, Signal::Neutral);
        assert_relative_eq!(report.confidence, 50.0);
        assert_eq!(
            report.reasoning["profitability_signal"].details,
            "ROE: 20.00%, Net Margin: 25.00%, Op Margin: 18.00%"
        );
        assert!(report.reasoning["growth_signal"].details.contains("Revenue Growth: N/A"));
    }

    #[test]
    fn test_strong_company_is_bullish() {
        let snapshot = MetricsSnapshot {
            return_on_equity: Some(0.25),
            net_margin: Some(0.22),
            revenue_growth: Some(0.15),
            earnings_growth: Some(0.12),
            current_ratio: Some(2.0),
            debt_to_equity: Some(0.3),
            price_to_earnings_ratio: Some(30.0),
            ..metrics(2024)
        };
        let report = analyze_fundamentals(&[snapshot]);

        assert_eq!(report.reasoning["price_ratios_signal"].signal, Signal::Neutral);
        assert_eq!(report.signal, Signal::Bullish);
        assert_relative_eq!(report.confidence, 75.0);
    }

    #[test]
    fn test_only_latest_snapshot_counts() {
        let expensive = MetricsSnapshot {
            price_to_earnings_ratio: Some(40.0),
            price_to_book_ratio: Some(8.0),
            price_to_sales_ratio: Some(10.0),
            ..metrics(2024)
        };
        let cheap = metrics(2023);
        let report = analyze_fundamentals(&[expensive, cheap]);

        assert_eq!(report.reasoning["price_ratios_signal"].signal, Signal::Bearish);
        assert_eq!(report.signal, Signal::Bearish);
        assert_relative_eq!(report.confidence, 100.0);
    }

    #[test]
    fn test_fcf_conversion_needs_both_values() {
        let snapshot = MetricsSnapshot {
            free_cash_flow_per_share: Some(5.0),
            current_ratio: Some(1.6),
            ..metrics(2024)
        };
        assert_eq!(financial_health(&snapshot).signal, Signal::Neutral);

        let snapshot = MetricsSnapshot {
            earnings_per_share: Some(5.0),
            ..snapshot
        };
        assert_eq!(financial_health(&snapshot).signal, Signal::Bullish);
    }

    #[test]
    fn test_empty_metrics_is_neutral() {
        let report = analyze_fundamentals(&[]);
        assert_eq!(report.signal, Signal::Neutral);
        assert_relative_eq!(report.confidence, 0.0);
        assert_eq!(report.reasoning.len(), 1);
    }
}
