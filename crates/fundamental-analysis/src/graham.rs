use analysis_core::{InvestmentStrategy, LineItem, ScoreResult};

use crate::valuation::{graham_number, margin_of_safety, net_current_asset_value};
use crate::{chronological, majority, pct, StrategyInputs, StrategyScorer};

/// Earnings stability: +3 all EPS positive (or +2 at >= 80%), +1 EPS growth
pub const EARNINGS_MAX_SCORE: u32 = 4;
/// Financial strength: current ratio up to +2, debt ratio up to +2, dividends +1
pub const STRENGTH_MAX_SCORE: u32 = 5;
/// Valuation: net-net up to +4, Graham-number margin of safety up to +3
pub const VALUATION_MAX_SCORE: u32 = 7;
pub const MAX_SCORE: u32 = EARNINGS_MAX_SCORE + STRENGTH_MAX_SCORE + VALUATION_MAX_SCORE;

const LINE_ITEM_FIELDS: &[&str] = &[
    "earnings_per_share",
    "revenue",
    "net_income",
    "book_value_per_share",
    "total_assets",
    "total_liabilities",
    "current_assets",
    "current_liabilities",
    "dividends_and_other_cash_distributions",
    "outstanding_shares",
];

const PROMPT: &str = r#"You are a Benjamin Graham AI agent, making investment decisions using his principles:
1. Insist on a margin of safety by buying below intrinsic value (e.g., using Graham Number, net-net).
2. Emphasize the company's financial strength (low leverage, ample current assets).
3. Prefer stable earnings over multiple years.
4. Consider dividend record for extra safety.
5. Avoid speculative or high-growth assumptions; focus on proven metrics.

Return a rational recommendation: bullish, bearish, or neutral, with a confidence level (0-100) and concise reasoning."#;

const INTRO: &str = "Based on the following analysis, create a Graham-style investment signal:";

/// Benjamin Graham value investing: earnings stability, financial strength,
/// and a discount to net-net or Graham-number value.
#[derive(Debug, Clone, Copy, Default)]
pub struct BenGraham;

impl StrategyScorer for BenGraham {
    fn strategy(&self) -> InvestmentStrategy {
        InvestmentStrategy::BenGraham
    }

    fn max_score(&self) -> u32 {
        MAX_SCORE
    }

    fn line_item_fields(&self) -> &'static [&'static str] {
        LINE_ITEM_FIELDS
    }

    fn periods(&self) -> usize {
        10
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
                ("earnings_stability", analyze_earnings_stability(&items)),
                ("financial_strength", analyze_financial_strength(&items)),
                ("valuation", analyze_valuation(&items, inputs.market_cap)),
            ],
        )
    }
}

/// Several years of positive EPS, and EPS higher at the end than the start.
/// `items` must be oldest first.
pub fn analyze_earnings_stability(items: &[&LineItem]) -> ScoreResult {
    if items.is_empty() {
        return ScoreResult::insufficient(EARNINGS_MAX_SCORE, "Insufficient data for earnings stability analysis");
    }

    let eps_vals: Vec<f64> = items.iter().filter_map(|i| i.earnings_per_share).collect();
    if eps_vals.len() < 2 {
        return ScoreResult::insufficient(EARNINGS_MAX_SCORE, "Not enough multi-year EPS data");
    }

    let mut score = 0;
    let mut details = Vec::new();

    let total = eps_vals.len();
    let positive = eps_vals.iter().filter(|&&e| e > 0.0).count();
    if positive == total {
        score += 3;
        details.push(format!("EPS was positive in all {} available periods", total));
    } else if positive * 5 >= total * 4 {
        score += 2;
        details.push(format!("EPS was positive in most periods ({} of {})", positive, total));
    } else {
        details.push(format!("EPS was negative in multiple periods ({} of {} positive)", positive, total));
    }

    let earliest = eps_vals[0];
    let latest = eps_vals[total - 1];
    if latest > earliest {
        score += 1;
        details.push(format!("EPS grew from {:.2} to {:.2} over the available periods", earliest, latest));
    } else {
        details.push(format!("EPS did not grow from earliest ({:.2}) to latest ({:.2}) period", earliest, latest));
    }

    ScoreResult::new(score, EARNINGS_MAX_SCORE, details)
}

/// Liquidity (current ratio), leverage (liabilities / assets) and dividend
/// record. `items` must be oldest first; balance-sheet checks use the latest.
pub fn analyze_financial_strength(items: &[&LineItem]) -> ScoreResult {
    let Some(latest) = items.last() else {
        return ScoreResult::insufficient(STRENGTH_MAX_SCORE, "No data for financial strength analysis");
    };

    let mut score = 0;
    let mut details = Vec::new();

    let current_ratio = match (latest.current_assets, latest.current_liabilities) {
        (Some(assets), Some(liabilities)) if liabilities > 0.0 => Some(assets / liabilities),
        _ => None,
    };
    match current_ratio {
        Some(ratio) if ratio >= 2.0 => {
            score += 2;
            details.push(format!("Current ratio = {:.2} (>= 2.0: solid)", ratio));
        }
        Some(ratio) if ratio >= 1.5 => {
            score += 1;
            details.push(format!("Current ratio = {:.2} (>= 1.5: moderately strong)", ratio));
        }
        Some(ratio) => details.push(format!("Current ratio = {:.2} (< 1.5: weaker liquidity)", ratio)),
        None => details.push("Cannot compute current ratio (missing or zero current liabilities)".to_string()),
    }

    let debt_ratio = match (latest.total_liabilities, latest.total_assets) {
        (Some(liabilities), Some(assets)) if assets > 0.0 => Some(liabilities / assets),
        _ => None,
    };
    match debt_ratio {
        Some(ratio) if ratio < 0.5 => {
            score += 2;
            details.push(format!("Debt ratio = {:.2}, under 0.50 (conservative)", ratio));
        }
        Some(ratio) if ratio < 0.8 => {
            score += 1;
            details.push(format!("Debt ratio = {:.2}, somewhat high but acceptable", ratio));
        }
        Some(ratio) => details.push(format!("Debt ratio = {:.2}, quite high by Graham standards", ratio)),
        None => details.push("Cannot compute debt ratio (missing total assets or liabilities)".to_string()),
    }

    // Distributions are reported as cash outflows, so a payment is negative
    let dividends: Vec<f64> = items
        .iter()
        .filter_map(|i| i.dividends_and_other_cash_distributions)
        .collect();
    if dividends.is_empty() {
        details.push("No dividend data available to assess payout consistency".to_string());
    } else {
        let paid = dividends.iter().filter(|&&d| d < 0.0).count();
        if paid == 0 {
            details.push("Company did not pay dividends in these periods".to_string());
        } else if majority(paid, dividends.len()) {
            score += 1;
            details.push(format!(
                "Company paid dividends in the majority of reported periods ({} of {})",
                paid,
                dividends.len()
            ));
        } else {
            details.push(format!(
                "Company paid dividends in some periods, but not most ({} of {})",
                paid,
                dividends.len()
            ));
        }
    }

    ScoreResult::new(score, STRENGTH_MAX_SCORE, details)
}

/// Net-net check against market cap, then the Graham number against the
/// implied price per share. `items` must be oldest first.
pub fn analyze_valuation(items: &[&LineItem], market_cap: Option<f64>) -> ScoreResult {
    let (latest, market_cap) = match (items.last(), market_cap) {
        (Some(latest), Some(cap)) if cap > 0.0 => (latest, cap),
        _ => return ScoreResult::insufficient(VALUATION_MAX_SCORE, "Insufficient data to perform valuation"),
    };

    let mut score = 0;
    let mut details = Vec::new();
    let mut metrics = Vec::new();

    let shares = latest.outstanding_shares.filter(|&s| s > 0.0);
    let price_per_share = shares.map(|s| market_cap / s);

    match (latest.current_assets, latest.total_liabilities, shares, price_per_share) {
        (Some(current_assets), Some(total_liabilities), Some(shares), Some(price)) => {
            let ncav = net_current_asset_value(current_assets, total_liabilities);
            metrics.push(("ncav", ncav));
            if ncav > 0.0 {
                let ncav_per_share = ncav / shares;
                metrics.push(("ncav_per_share", ncav_per_share));
                metrics.push(("price_per_share", price));
                details.push(format!("Net current asset value = {:.2}", ncav));
                details.push(format!("NCAV per share = {:.2}, price per share = {:.2}", ncav_per_share, price));

                if ncav > market_cap {
                    score += 4;
                    details.push(format!(
                        "Net-net: NCAV {:.2} > market cap {:.2} (classic Graham deep value)",
                        ncav, market_cap
                    ));
                } else if ncav_per_share >= price * 0.67 {
                    score += 2;
                    details.push("NCAV per share >= 2/3 of price per share (moderate net-net discount)".to_string());
                } else {
                    details.push("NCAV per share < 2/3 of price per share (no net-net discount)".to_string());
                }
            } else {
                details.push(format!("NCAV = {:.2} is not positive; net-net approach does not apply", ncav));
            }
        }
        _ => details.push(
            "Insufficient data for net-net approach (current assets, liabilities or share count missing)".to_string(),
        ),
    }

    let eps = latest.earnings_per_share.unwrap_or(0.0);
    let bvps = latest.book_value_per_share.unwrap_or(0.0);
    match graham_number(eps, bvps) {
        Some(graham) => {
            metrics.push(("graham_number", graham));
            details.push(format!("Graham number = {:.2}", graham));

            match price_per_share.and_then(|price| margin_of_safety(graham, price)) {
                Some(mos) => {
                    metrics.push(("margin_of_safety", mos));
                    details.push(format!("Margin of safety (Graham number) = {}", pct(mos)));
                    if mos > 0.5 {
                        score += 3;
                        details.push("Price is well below Graham number (> 50% margin)".to_string());
                    } else if mos > 0.2 {
                        score += 1;
                        details.push("Some margin of safety relative to Graham number (> 20%)".to_string());
                    } else {
                        details.push("Price close to or above Graham number, low margin of safety".to_string());
                    }
                }
                None => details.push("Cannot derive price per share; margin of safety not computed".to_string()),
            }
        }
        None => details.push("Unable to compute Graham number (EPS or book value per share missing or <= 0)".to_string()),
    }

    metrics
        .into_iter()
        .fold(ScoreResult::new(score, VALUATION_MAX_SCORE, details), |result, (name, value)| {
            result.with_metric(name, value)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{item, metrics};
    use analysis_core::Signal;
    use approx::assert_relative_eq;

    fn graham_item(year: i32, eps: f64) -> LineItem {
        LineItem {
            earnings_per_share: Some(eps),
            book_value_per_share: Some(20.0),
            current_assets: Some(1_000_000.0),
            current_liabilities: Some(400_000.0),
            total_assets: Some(3_000_000.0),
            total_liabilities: Some(400_000.0),
            dividends_and_other_cash_distributions: Some(-50_000.0),
            outstanding_shares: Some(100_000.0),
            ..item(year)
        }
    }

    #[test]
    fn test_net_net_awards_maximum_points() {
        let latest = LineItem {
            current_assets: Some(1_000_000.0),
            total_liabilities: Some(400_000.0),
            outstanding_shares: Some(100_000.0),
            ..item(2024)
        };
        let result = analyze_valuation(&[&latest], Some(500_000.0));

        assert_eq!(result.score, 4);
        assert_relative_eq!(result.metrics["ncav"], 600_000.0);
        assert!(result.details.iter().any(|d| d.contains("classic Graham deep value")));
        assert!(result.details.iter().any(|d| d.contains("Unable to compute Graham number")));
    }

    #[test]
    fn test_partial_net_net_discount() {
        // NCAV 600k, market cap 800k: per share 6.0 vs price 8.0 (>= 0.67 * 8)
        let latest = LineItem {
            current_assets: Some(1_000_000.0),
            total_liabilities: Some(400_000.0),
            outstanding_shares: Some(100_000.0),
            ..item(2024)
        };
        let result = analyze_valuation(&[&latest], Some(800_000.0));
        assert_eq!(result.score, 2);
    }

    #[test]
    fn test_graham_number_margin_of_safety() {
        // Graham number sqrt(22.5 * 2 * 20) = 30, price 10 => margin 200%
        let latest = LineItem {
            earnings_per_share: Some(2.0),
            book_value_per_share: Some(20.0),
            outstanding_shares: Some(1_000.0),
            ..item(2024)
        };
        let result = analyze_valuation(&[&latest], Some(10_000.0));

        assert_eq!(result.score, 3);
        assert_relative_eq!(result.metrics["graham_number"], 30.0, epsilon = 1e-9);
        assert_relative_eq!(result.metrics["margin_of_safety"], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_valuation_requires_market_cap() {
        let latest = graham_item(2024, 2.0);
        let result = analyze_valuation(&[&latest], None);
        assert_eq!(result.score, 0);
        assert_eq!(result.details, vec!["Insufficient data to perform valuation"]);
    }

    #[test]
    fn test_earnings_stability_uses_chronological_order() {
        // Supplied newest first; growth must still be measured oldest -> newest
        let items = vec![graham_item(2024, 3.0), graham_item(2023, 2.0), graham_item(2022, 1.0)];
        let sorted = chronological(&items);
        let result = analyze_earnings_stability(&sorted);

        assert_eq!(result.score, 4);
        assert!(result.details[1].contains("EPS grew from 1.00 to 3.00"));
    }

    #[test]
    fn test_earnings_stability_mixed_eps() {
        let items = vec![graham_item(2021, 1.0), graham_item(2022, -1.0), graham_item(2023, 0.5)];
        let sorted = chronological(&items);
        let result = analyze_earnings_stability(&sorted);

        // 2 of 3 positive (< 80%), no growth
        assert_eq!(result.score, 0);
        assert_eq!(result.details.len(), 2);
    }

    #[test]
    fn test_financial_strength_full_marks() {
        // Current ratio 2.5, debt ratio 0.13, dividends every period
        let items = vec![graham_item(2023, 1.0), graham_item(2024, 1.0)];
        let sorted = chronological(&items);
        let result = analyze_financial_strength(&sorted);

        assert_eq!(result.score, STRENGTH_MAX_SCORE);
        assert_eq!(result.details.len(), 3);
    }

    #[test]
    fn test_financial_strength_missing_fields_documented() {
        let bare = item(2024);
        let result = analyze_financial_strength(&[&bare]);

        assert_eq!(result.score, 0);
        assert_eq!(result.details.len(), 3);
        assert!(result.details[0].starts_with("Cannot compute current ratio"));
        assert!(result.details[2].starts_with("No dividend data"));
    }

    #[test]
    fn test_empty_inputs_never_fail() {
        let result = BenGraham.score(&StrategyInputs::default());

        assert_eq!(result.score, 0);
        assert_eq!(result.max_score, MAX_SCORE);
        assert_eq!(result.signal, Signal::Bearish);
        assert!(!result.details.is_empty());
        assert_eq!(result.sub_analyses.len(), 3);
    }

    #[test]
    fn test_strategy_score_within_bounds_and_signal_consistent() {
        let items = vec![graham_item(2022, 1.0), graham_item(2023, 1.5), graham_item(2024, 2.0)];
        let snapshots = vec![metrics(2024)];
        let inputs = StrategyInputs {
            metrics: &snapshots,
            line_items: &items,
            market_cap: Some(500_000.0),
        };
        let result = BenGraham.score(&inputs);

        assert!(result.score <= result.max_score);
        assert_eq!(result.signal, Signal::from_score(result.score, result.max_score));
        for sub in result.sub_analyses.values() {
            assert!(sub.score <= sub.max_score);
        }
        // earnings 4 + strength 5 + net-net (NCAV 600k > 500k) 4 + Graham number
        // sqrt(22.5 * 2 * 20) = 30 vs price 5 => +3
        assert_eq!(result.score, 16);
        assert_eq!(result.signal, Signal::Bullish);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let items = vec![graham_item(2023, 1.0), graham_item(2024, 1.2)];
        let inputs = StrategyInputs {
            metrics: &[],
            line_items: &items,
            market_cap: Some(2_000_000.0),
        };
        let first = serde_json::to_string(&BenGraham.score(&inputs)).unwrap();
        let second = serde_json::to_string(&BenGraham.score(&inputs)).unwrap();
        assert_eq!(first, second);
    }
}
