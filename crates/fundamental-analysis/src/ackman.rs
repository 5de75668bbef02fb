use analysis_core::{InvestmentStrategy, LineItem, MetricsSnapshot, ScoreResult};

use crate::valuation::{discounted_cash_flow, margin_of_safety, DcfAssumptions};
use crate::{chronological, majority, pct, StrategyInputs, StrategyScorer};

/// Business quality: revenue growth up to +2, operating margins +2, FCF +1, ROE +2
pub const QUALITY_MAX_SCORE: u32 = 7;
/// Financial discipline: leverage +2, dividends +1, buybacks +1
pub const DISCIPLINE_MAX_SCORE: u32 = 4;
/// Valuation: DCF margin of safety up to +3
pub const VALUATION_MAX_SCORE: u32 = 3;
pub const MAX_SCORE: u32 = QUALITY_MAX_SCORE + DISCIPLINE_MAX_SCORE + VALUATION_MAX_SCORE;

const LINE_ITEM_FIELDS: &[&str] = &[
    "revenue",
    "operating_margin",
    "debt_to_equity",
    "free_cash_flow",
    "total_assets",
    "total_liabilities",
    "dividends_and_other_cash_distributions",
    "outstanding_shares",
];

const PROMPT: &str = r#"You are a Bill Ackman AI agent, making investment decisions using his principles:

1. Seek high-quality businesses with durable competitive advantages (moats).
2. Prioritize consistent free cash flow and growth potential.
3. Advocate for strong financial discipline (reasonable leverage, efficient capital allocation).
4. Valuation matters: target intrinsic value and margin of safety.
5. Invest with high conviction in a concentrated portfolio for the long term.
6. Potential activist approach if management or operational improvements can unlock value.

Rules:
- Evaluate brand strength, market position, or other moats.
- Check free cash flow generation, stable or growing earnings.
- Analyze balance sheet health (reasonable debt, good ROE).
- Buy at a discount to intrinsic value; higher discount => stronger conviction.
- Engage if management is suboptimal or if there's a path for strategic improvements.
- Provide a rational, data-driven recommendation (bullish, bearish, or neutral).

When providing your reasoning, be thorough and specific by:
1. Explaining the quality of the business and its competitive advantages in detail
2. Highlighting the specific financial metrics that most influenced your decision (FCF, margins, leverage)
3. Discussing any potential for operational improvements or management changes
4. Providing a clear valuation assessment with numerical evidence
5. Identifying specific catalysts that could unlock value
6. Using Bill Ackman's confident, analytical, and sometimes confrontational style"#;

const INTRO: &str = "Based on the following analysis, create an Ackman-style investment signal.";

/// Bill Ackman quality investing: durable high-margin businesses, disciplined
/// balance sheets, and a discount to DCF intrinsic value.
#[derive(Debug, Clone, Copy, Default)]
pub struct BillAckman;

impl StrategyScorer for BillAckman {
    fn strategy(&self) -> InvestmentStrategy {
        InvestmentStrategy::BillAckman
    }

    fn max_score(&self) -> u32 {
        MAX_SCORE
    }

    fn line_item_fields(&self) -> &'static [&'static str] {
        LINE_ITEM_FIELDS
    }

    fn periods(&self) -> usize {
        5
    }

    fn instruction_prompt(&self) -> &'static str {
        PROMPT
    }

    fn intro(&self) -> &'static str {
        INTRO
    }

    fn score(&self, inputs: &StrategyInputs<'_>) -> ScoreResult {
        let items = chronological(inputs.line_items);
        ScoreResult::aggregate(
            MAX_SCORE,
            vec![
                ("business_quality", analyze_business_quality(inputs.metrics, &items)),
                ("financial_discipline", analyze_financial_discipline(inputs.metrics, &items)),
                ("valuation", analyze_valuation(&items, inputs.market_cap)),
            ],
        )
    }
}

/// Revenue trend, operating margins, free cash flow consistency and ROE.
/// `metrics` is newest first, `items` oldest first.
pub fn analyze_business_quality(metrics: &[MetricsSnapshot], items: &[&LineItem]) -> ScoreResult {
    let Some(latest_metrics) = metrics.first().filter(|_| !items.is_empty()) else {
        return ScoreResult::insufficient(QUALITY_MAX_SCORE, "Insufficient data to analyze business quality");
    };

    let mut score = 0;
    let mut details = Vec::new();

    let revenues: Vec<f64> = items.iter().filter_map(|i| i.revenue).collect();
    match (revenues.first(), revenues.last()) {
        (Some(&initial), Some(&last)) if revenues.len() >= 2 && initial != 0.0 => {
            let growth = (last - initial) / initial.abs();
            if growth > 0.5 {
                score += 2;
                details.push(format!("Revenue grew by {} over the full period", pct(growth)));
            } else if growth > 0.0 {
                score += 1;
                details.push(format!("Revenue growth is positive but under 50% cumulatively ({})", pct(growth)));
            } else {
                details.push(format!("Revenue did not grow over the period ({})", pct(growth)));
            }
        }
        _ => details.push("Not enough revenue data for multi-period trend".to_string()),
    }

    let margins: Vec<f64> = items.iter().filter_map(|i| i.operating_margin).collect();
    if margins.is_empty() {
        details.push("No operating margin data across periods".to_string());
    } else {
        let above = margins.iter().filter(|&&m| m > 0.15).count();
        if majority(above, margins.len()) {
            score += 2;
            details.push(format!("Operating margin exceeded 15% in {} of {} periods", above, margins.len()));
        } else {
            details.push(format!(
                "Operating margin not consistently above 15% ({} of {} periods)",
                above,
                margins.len()
            ));
        }
    }

    let fcf: Vec<f64> = items.iter().filter_map(|i| i.free_cash_flow).collect();
    if fcf.is_empty() {
        details.push("No free cash flow data across periods".to_string());
    } else {
        let positive = fcf.iter().filter(|&&f| f > 0.0).count();
        if majority(positive, fcf.len()) {
            score += 1;
            details.push(format!("Free cash flow positive in {} of {} periods", positive, fcf.len()));
        } else {
            details.push(format!("Free cash flow not consistently positive ({} of {} periods)", positive, fcf.len()));
        }
    }

    match latest_metrics.return_on_equity {
        Some(roe) if roe > 0.15 => {
            score += 2;
            details.push(format!("High ROE of {}, indicating a potential moat", pct(roe)));
        }
        Some(roe) => details.push(format!("ROE of {} is not indicative of a strong moat", pct(roe))),
        None => details.push("ROE data not available in metrics".to_string()),
    }

    ScoreResult::new(score, QUALITY_MAX_SCORE, details)
}

/// Leverage across periods and capital returned through dividends and
/// buybacks. `items` must be oldest first.
pub fn analyze_financial_discipline(metrics: &[MetricsSnapshot], items: &[&LineItem]) -> ScoreResult {
    if metrics.is_empty() || items.is_empty() {
        return ScoreResult::insufficient(DISCIPLINE_MAX_SCORE, "Insufficient data to analyze financial discipline");
    }

    let mut score = 0;
    let mut details = Vec::new();

    let debt_to_equity: Vec<f64> = items.iter().filter_map(|i| i.debt_to_equity).collect();
    if !debt_to_equity.is_empty() {
        let below = debt_to_equity.iter().filter(|&&d| d < 1.0).count();
        if majority(below, debt_to_equity.len()) {
            score += 2;
            details.push(format!(
                "Debt-to-equity < 1.0 in {} of {} periods",
                below,
                debt_to_equity.len()
            ));
        } else {
            details.push(format!(
                "Debt-to-equity >= 1.0 in many periods ({} of {} below 1.0)",
                below,
                debt_to_equity.len()
            ));
        }
    } else {
        // Fall back to liabilities-to-assets when D/E is not reported
        let liabilities_to_assets: Vec<f64> = items
            .iter()
            .filter_map(|i| match (i.total_liabilities, i.total_assets) {
                (Some(liabilities), Some(assets)) if assets > 0.0 => Some(liabilities / assets),
                _ => None,
            })
            .collect();
        if liabilities_to_assets.is_empty() {
            details.push("No consistent leverage ratio data available".to_string());
        } else {
            let below = liabilities_to_assets.iter().filter(|&&r| r < 0.5).count();
            if majority(below, liabilities_to_assets.len()) {
                score += 2;
                details.push(format!(
                    "Liabilities-to-assets < 50% in {} of {} periods",
                    below,
                    liabilities_to_assets.len()
                ));
            } else {
                details.push(format!(
                    "Liabilities-to-assets >= 50% in many periods ({} of {} below 50%)",
                    below,
                    liabilities_to_assets.len()
                ));
            }
        }
    }

    let dividends: Vec<f64> = items
        .iter()
        .filter_map(|i| i.dividends_and_other_cash_distributions)
        .collect();
    if dividends.is_empty() {
        details.push("No dividend data found across periods".to_string());
    } else {
        let paid = dividends.iter().filter(|&&d| d < 0.0).count();
        if majority(paid, dividends.len()) {
            score += 1;
            details.push(format!(
                "Company returned capital through dividends in {} of {} periods",
                paid,
                dividends.len()
            ));
        } else {
            details.push(format!("Dividends not consistently paid ({} of {} periods)", paid, dividends.len()));
        }
    }

    let shares: Vec<f64> = items.iter().filter_map(|i| i.outstanding_shares).collect();
    match (shares.first(), shares.last()) {
        (Some(&earliest), Some(&latest)) if shares.len() >= 2 => {
            if latest < earliest {
                score += 1;
                details.push(format!(
                    "Outstanding shares decreased from {:.0} to {:.0} (possible buybacks)",
                    earliest, latest
                ));
            } else {
                details.push(format!(
                    "Outstanding shares have not decreased ({:.0} to {:.0})",
                    earliest, latest
                ));
            }
        }
        _ => details.push("No multi-period share count data to assess buybacks".to_string()),
    }

    ScoreResult::new(score, DISCIPLINE_MAX_SCORE, details)
}

/// DCF on the latest free cash flow compared against market cap.
/// `items` must be oldest first.
pub fn analyze_valuation(items: &[&LineItem], market_cap: Option<f64>) -> ScoreResult {
    let Some(latest) = items.last() else {
        return ScoreResult::insufficient(VALUATION_MAX_SCORE, "Insufficient data to perform valuation");
    };

    let fcf = latest.free_cash_flow.unwrap_or(0.0);
    let assumptions = DcfAssumptions::default();
    let Some(intrinsic_value) = discounted_cash_flow(fcf, &assumptions) else {
        return ScoreResult::insufficient(
            VALUATION_MAX_SCORE,
            format!("No positive FCF for valuation; FCF = {:.2}", fcf),
        );
    };

    let Some(market_cap) = market_cap.filter(|&cap| cap > 0.0) else {
        return ScoreResult::insufficient(VALUATION_MAX_SCORE, "Insufficient data to perform valuation (no market cap)")
            .with_metric("intrinsic_value", intrinsic_value);
    };

    let mut score = 0;
    let mut details = vec![
        format!("Calculated intrinsic value: ~{:.2}", intrinsic_value),
        format!("Market cap: ~{:.2}", market_cap),
    ];

    // market_cap > 0 here, so the margin is always defined
    let mos = margin_of_safety(intrinsic_value, market_cap).unwrap_or(0.0);
    details.push(format!("Margin of safety: {}", pct(mos)));
    if mos > 0.3 {
        score += 3;
        details.push("Margin of safety above 30% (high conviction)".to_string());
    } else if mos > 0.1 {
        score += 1;
        details.push("Margin of safety above 10% (partial)".to_string());
    } else {
        details.push("Margin of safety at or below 10%".to_string());
    }

    ScoreResult::new(score, VALUATION_MAX_SCORE, details)
        .with_metric("intrinsic_value", intrinsic_value)
        .with_metric("margin_of_safety", mos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{item, metrics};
    use analysis_core::Signal;
    use approx::assert_relative_eq;

    fn quality_item(year: i32, revenue: f64, shares: f64) -> LineItem {
        LineItem {
            revenue: Some(revenue),
            operating_margin: Some(0.25),
            debt_to_equity: Some(0.6),
            free_cash_flow: Some(100.0),
            total_assets: Some(1_000.0),
            total_liabilities: Some(300.0),
            dividends_and_other_cash_distributions: Some(-10.0),
            outstanding_shares: Some(shares),
            ..item(year)
        }
    }

    fn roe_metrics(roe: f64) -> Vec<MetricsSnapshot> {
        vec![MetricsSnapshot {
            return_on_equity: Some(roe),
            ..metrics(2024)
        }]
    }

    #[test]
    fn test_non_positive_fcf_zeroes_valuation() {
        let latest = LineItem {
            free_cash_flow: Some(-25.0),
            ..item(2024)
        };
        for cap in [None, Some(1.0), Some(1e12)] {
            let result = analyze_valuation(&[&latest], cap);
            assert_eq!(result.score, 0);
            assert_eq!(result.details.len(), 1);
            assert!(result.details[0].contains("No positive FCF"));
        }

        let missing = item(2024);
        let result = analyze_valuation(&[&missing], Some(1_000.0));
        assert_eq!(result.score, 0);
        assert!(result.details[0].contains("FCF = 0.00"));
    }

    #[test]
    fn test_dcf_margin_bands() {
        // FCF 100 => intrinsic value ~1694.43
        let latest = LineItem {
            free_cash_flow: Some(100.0),
            ..item(2024)
        };

        let deep = analyze_valuation(&[&latest], Some(1_000.0));
        assert_eq!(deep.score, 3);
        let expected = discounted_cash_flow(100.0, &DcfAssumptions::default()).unwrap();
        assert_relative_eq!(deep.metrics["intrinsic_value"], expected, epsilon = 1e-9);
        assert_relative_eq!(deep.metrics["margin_of_safety"], (expected - 1_000.0) / 1_000.0, epsilon = 1e-9);

        let partial = analyze_valuation(&[&latest], Some(1_500.0));
        assert_eq!(partial.score, 1);

        let none = analyze_valuation(&[&latest], Some(1_600.0));
        assert_eq!(none.score, 0);
        assert!(none.details.iter().any(|d| d.contains("at or below 10%")));
    }

    #[test]
    fn test_business_quality_full_marks() {
        let items = vec![quality_item(2020, 100.0, 1_000.0), quality_item(2024, 200.0, 900.0)];
        let sorted = chronological(&items);
        let result = analyze_business_quality(&roe_metrics(0.25), &sorted);

        assert_eq!(result.score, QUALITY_MAX_SCORE);
        assert_eq!(result.details.len(), 4);
        assert!(result.details[0].contains("100.0%"));
    }

    #[test]
    fn test_business_quality_requires_metrics() {
        let items = vec![quality_item(2024, 100.0, 1_000.0)];
        let sorted = chronological(&items);
        let result = analyze_business_quality(&[], &sorted);
        assert_eq!(result.score, 0);
        assert_eq!(result.details, vec!["Insufficient data to analyze business quality"]);
    }

    #[test]
    fn test_financial_discipline_buybacks_and_dividends() {
        // Supplied newest first: shares fell from 1000 to 900
        let items = vec![quality_item(2024, 200.0, 900.0), quality_item(2020, 100.0, 1_000.0)];
        let sorted = chronological(&items);
        let result = analyze_financial_discipline(&roe_metrics(0.1), &sorted);

        assert_eq!(result.score, DISCIPLINE_MAX_SCORE);
        assert!(result.details[2].contains("decreased from 1000 to 900"));
    }

    #[test]
    fn test_financial_discipline_falls_back_to_liabilities_ratio() {
        let items: Vec<LineItem> = (2021..=2023)
            .map(|year| LineItem {
                debt_to_equity: None,
                ..quality_item(year, 100.0, 1_000.0)
            })
            .collect();
        let sorted = chronological(&items);
        let result = analyze_financial_discipline(&roe_metrics(0.1), &sorted);

        // liabilities/assets 0.3 => +2, dividends +1, flat share count +0
        assert_eq!(result.score, 3);
        assert!(result.details[0].starts_with("Liabilities-to-assets < 50%"));
    }

    #[test]
    fn test_strategy_aggregation() {
        let items = vec![quality_item(2020, 100.0, 1_000.0), quality_item(2024, 200.0, 900.0)];
        let snapshots = roe_metrics(0.25);
        let inputs = StrategyInputs {
            metrics: &snapshots,
            line_items: &items,
            market_cap: Some(1_000.0),
        };
        let result = BillAckman.score(&inputs);

        assert_eq!(result.max_score, MAX_SCORE);
        assert_eq!(result.score, MAX_SCORE);
        assert_eq!(result.signal, Signal::Bullish);
        assert_eq!(result.signal, Signal::from_score(result.score, result.max_score));
    }

    #[test]
    fn test_empty_inputs_never_fail() {
        let result = BillAckman.score(&StrategyInputs::default());
        assert_eq!(result.score, 0);
        assert_eq!(result.signal, Signal::Bearish);
        assert_eq!(result.details.len(), 3);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let items = vec![quality_item(2020, 100.0, 1_000.0), quality_item(2024, 150.0, 950.0)];
        let snapshots = roe_metrics(0.18);
        let inputs = StrategyInputs {
            metrics: &snapshots,
            line_items: &items,
            market_cap: Some(1_200.0),
        };
        let first = serde_json::to_string(&BillAckman.score(&inputs)).unwrap();
        let second = serde_json::to_string(&BillAckman.score(&inputs)).unwrap();
        assert_eq!(first, second);
    }
}
