use analysis_core::{InvestmentStrategy, LineItem, MetricsSnapshot, ScoreResult};

pub mod ackman;
pub mod fundamentals;
pub mod graham;
pub mod valuation;

pub use ackman::BillAckman;
pub use fundamentals::{analyze_fundamentals, FundamentalsReport, SubSignal};
pub use graham::BenGraham;
pub use valuation::DcfAssumptions;

/// Records a strategy scorer consumes. Metrics are newest first; line items
/// may arrive in any order (scorers normalize them, see [`chronological`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyInputs<'a> {
    pub metrics: &'a [MetricsSnapshot],
    pub line_items: &'a [LineItem],
    pub market_cap: Option<f64>,
}

/// A named, rule-based strategy that turns financial records into a
/// [`ScoreResult`]. Implementations are pure: no I/O, no clock, no logging.
pub trait StrategyScorer: Send + Sync {
    fn strategy(&self) -> InvestmentStrategy;

    /// Sum of every attainable sub-analysis point
    fn max_score(&self) -> u32;

    /// Statement fields to request from the data source
    fn line_item_fields(&self) -> &'static [&'static str];

    /// How many annual periods to request
    fn periods(&self) -> usize;

    /// System prompt for the narrative renderer
    fn instruction_prompt(&self) -> &'static str;

    /// First line of the narrative payload
    fn intro(&self) -> &'static str;

    fn score(&self, inputs: &StrategyInputs<'_>) -> ScoreResult;
}

/// Line items sorted oldest to newest by report period. The sort is stable,
/// so periods sharing a date keep the caller's order. After this, `first()`
/// is the earliest period and `last()` the latest.
pub fn chronological(items: &[LineItem]) -> Vec<&LineItem> {
    let mut sorted: Vec<&LineItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.report_period);
    sorted
}

/// Strict majority of `total` periods.
pub(crate) fn majority(count: usize, total: usize) -> bool {
    total > 0 && count >= total / 2 + 1
}

pub(crate) fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}
