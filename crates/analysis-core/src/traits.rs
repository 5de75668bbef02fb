use async_trait::async_trait;
use chrono::NaiveDate;
use crate::{
    AnalysisError, CompanyNewsItem, InsiderTrade, InvestmentStrategy, LineItem, MetricsSnapshot,
    PriceBar, TaskStatus,
};

/// Source of per-ticker financial records. An empty list means "no data",
/// not an error.
#[async_trait]
pub trait FinancialDataSource: Send + Sync {
    async fn get_financial_metrics(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        period: &str,
        limit: usize,
    ) -> Result<Vec<MetricsSnapshot>, AnalysisError>;

    async fn get_line_items(
        &self,
        ticker: &str,
        fields: &[&str],
        end_date: NaiveDate,
        period: &str,
        limit: usize,
    ) -> Result<Vec<LineItem>, AnalysisError>;

    async fn get_insider_trades(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        start_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<InsiderTrade>, AnalysisError>;

    async fn get_company_news(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        start_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<CompanyNewsItem>, AnalysisError>;

    async fn get_market_cap(&self, ticker: &str, end_date: NaiveDate) -> Result<Option<f64>, AnalysisError>;

    async fn get_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AnalysisError>;
}

/// Turns a structured score into free-text commentary. `None` means the
/// commentary could not be produced; callers keep the numeric result.
#[async_trait]
pub trait NarrativeRenderer: Send + Sync {
    async fn render(&self, instruction_prompt: &str, structured_payload: &str) -> Option<serde_json::Value>;
}

/// Receives task progress from the orchestrator
pub trait ProgressReporter: Send + Sync {
    fn report(&self, task: InvestmentStrategy, status: TaskStatus, message: &str);
}
