use analysis_core::{
    AnalysisError, FinancialDataSource, InvestmentStrategy, NarrativeRenderer, ProgressReporter,
    TaskStatus,
};
use chrono::NaiveDate;
use fundamental_analysis::{
    analyze_fundamentals, BenGraham, BillAckman, StrategyInputs, StrategyScorer,
};
use risk_manager::{build_decision_context, AgentSignal, Portfolio, RiskAnalysis, RiskManager};
use sentiment_analysis::SentimentAnalysisEngine;
use std::collections::BTreeMap;

pub mod progress;
pub mod report;

pub use progress::NoopReporter;
pub use report::{strategy_message, PortfolioDecision, StrategyReport, TickerReport};

const METRICS_LIMIT: usize = 10;
const INSIDER_TRADES_LIMIT: usize = 1000;
const NEWS_LIMIT: usize = 1000;

/// What to analyze
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub ticker: String,
    /// First day of the price window
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Enables risk sizing and the portfolio decision
    pub portfolio: Option<Portfolio>,
}

pub struct AnalysisOrchestrator<D, R> {
    data_source: D,
    renderer: R,
    sentiment_analyzer: SentimentAnalysisEngine,
    risk_manager: RiskManager,
}

impl<D: FinancialDataSource, R: NarrativeRenderer> AnalysisOrchestrator<D, R> {
    pub fn new(data_source: D, renderer: R) -> Self {
        Self {
            data_source,
            renderer,
            sentiment_analyzer: SentimentAnalysisEngine::new(),
            risk_manager: RiskManager::default(),
        }
    }

    pub fn with_risk_manager(mut self, risk_manager: RiskManager) -> Self {
        self.risk_manager = risk_manager;
        self
    }

    /// Fetch, score, and render one ticker. Any data-source failure aborts
    /// the run; a missing narrative does not.
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        reporter: &dyn ProgressReporter,
    ) -> Result<TickerReport, AnalysisError> {
        let ticker = request.ticker.as_str();
        let end = request.end_date;
        tracing::info!(
            "Starting analysis for {} ({} to {})",
            ticker,
            request.start_date,
            end
        );

        reporter.report(InvestmentStrategy::PrepareData, TaskStatus::Working, "Fetching data");
        let fetched = tokio::try_join!(
            self.data_source.get_financial_metrics(ticker, end, "annual", METRICS_LIMIT),
            self.data_source.get_financial_metrics(ticker, end, "ttm", METRICS_LIMIT),
            self.data_source.get_line_items(
                ticker,
                BenGraham.line_item_fields(),
                end,
                "annual",
                BenGraham.periods(),
            ),
            self.data_source.get_line_items(
                ticker,
                BillAckman.line_item_fields(),
                end,
                "annual",
                BillAckman.periods(),
            ),
            self.data_source.get_market_cap(ticker, end),
            self.data_source.get_insider_trades(ticker, end, None, INSIDER_TRADES_LIMIT),
            self.data_source.get_company_news(ticker, end, None, NEWS_LIMIT),
            self.data_source.get_prices(ticker, request.start_date, end),
        );
        let (annual_metrics, ttm_metrics, graham_items, ackman_items, market_cap, insider_trades, news, prices) =
            match fetched {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("Data fetch failed for {}: {}", ticker, e);
                    reporter.report(InvestmentStrategy::PrepareData, TaskStatus::Error, &e.to_string());
                    return Err(e);
                }
            };
        tracing::debug!(
            "{}: {} annual metrics, {} ttm metrics, {} insider trades, {} news, {} bars",
            ticker,
            annual_metrics.len(),
            ttm_metrics.len(),
            insider_trades.len(),
            news.len(),
            prices.len()
        );
        reporter.report(InvestmentStrategy::PrepareData, TaskStatus::Done, "Data ready");

        let graham_inputs = StrategyInputs {
            metrics: recent(&annual_metrics, BenGraham.periods()),
            line_items: &graham_items,
            market_cap,
        };
        let ackman_inputs = StrategyInputs {
            metrics: recent(&annual_metrics, BillAckman.periods()),
            line_items: &ackman_items,
            market_cap,
        };
        let (graham, ackman) = tokio::join!(
            self.run_strategy(&BenGraham, &graham_inputs, ticker, reporter),
            self.run_strategy(&BillAckman, &ackman_inputs, ticker, reporter),
        );
        let mut strategies = BTreeMap::new();
        strategies.insert(BenGraham.strategy().key().to_string(), graham?);
        strategies.insert(BillAckman.strategy().key().to_string(), ackman?);

        reporter.report(InvestmentStrategy::Fundamentals, TaskStatus::Working, "Analyzing fundamentals");
        let fundamentals = analyze_fundamentals(&ttm_metrics);
        reporter.report(InvestmentStrategy::Fundamentals, TaskStatus::Done, fundamentals.signal.as_str());

        reporter.report(InvestmentStrategy::Sentiment, TaskStatus::Working, "Analyzing sentiment");
        let sentiment = self.sentiment_analyzer.analyze(&insider_trades, &news);
        reporter.report(InvestmentStrategy::Sentiment, TaskStatus::Done, sentiment.signal.as_str());

        let mut report = TickerReport {
            ticker: ticker.to_string(),
            strategies,
            fundamentals,
            sentiment,
            risk: None,
            portfolio_decision: None,
        };

        if let Some(portfolio) = &request.portfolio {
            reporter.report(InvestmentStrategy::RiskManagement, TaskStatus::Working, "Sizing position");
            match self.risk_manager.assess(ticker, portfolio, &prices) {
                Some(risk) => {
                    reporter.report(
                        InvestmentStrategy::RiskManagement,
                        TaskStatus::Done,
                        &format!("Remaining limit {:.2}", risk.remaining_position_limit),
                    );
                    let decision = self.decide(portfolio, &risk, &report, reporter).await;
                    report.portfolio_decision = Some(decision);
                    report.risk = Some(risk);
                }
                None => {
                    tracing::warn!("No price data found for {}, skipping risk sizing", ticker);
                    reporter.report(InvestmentStrategy::RiskManagement, TaskStatus::Error, "No price data");
                }
            }
        }

        tracing::info!("Completed analysis for {}", ticker);
        Ok(report)
    }

    async fn run_strategy(
        &self,
        scorer: &dyn StrategyScorer,
        inputs: &StrategyInputs<'_>,
        ticker: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<StrategyReport, AnalysisError> {
        let task = scorer.strategy();
        reporter.report(task, TaskStatus::Working, "Scoring");
        let analysis = scorer.score(inputs);
        tracing::info!(
            "{} {}: {} ({}/{})",
            task.english(),
            ticker,
            analysis.signal,
            analysis.score,
            analysis.max_score
        );

        reporter.report(task, TaskStatus::Working, "Rendering narrative");
        let message = strategy_message(scorer.intro(), ticker, &analysis)?;
        let narrative = self.renderer.render(scorer.instruction_prompt(), &message).await;
        if narrative.is_none() {
            tracing::warn!("No narrative for {} {}", task.english(), ticker);
        }
        reporter.report(task, TaskStatus::Done, analysis.signal.as_str());

        Ok(StrategyReport { analysis, narrative })
    }

    async fn decide(
        &self,
        portfolio: &Portfolio,
        risk: &RiskAnalysis,
        report: &TickerReport,
        reporter: &dyn ProgressReporter,
    ) -> PortfolioDecision {
        reporter.report(InvestmentStrategy::PortfolioManagement, TaskStatus::Working, "Deciding");

        let mut signals: BTreeMap<String, AgentSignal> = report
            .strategies
            .iter()
            .map(|(key, strategy)| (key.clone(), strategy.agent_signal()))
            .collect();
        signals.insert(
            InvestmentStrategy::Fundamentals.key().to_string(),
            AgentSignal {
                signal: report.fundamentals.signal,
                confidence: Some(report.fundamentals.confidence),
            },
        );
        signals.insert(
            InvestmentStrategy::Sentiment.key().to_string(),
            AgentSignal {
                signal: report.sentiment.signal,
                confidence: Some(report.sentiment.confidence),
            },
        );

        let context = build_decision_context(portfolio, risk, signals);
        let decision = self.renderer.render(&context.prompt, &context.user_message).await;
        let status = if decision.is_some() { "Decision ready" } else { "No decision returned" };
        reporter.report(InvestmentStrategy::PortfolioManagement, TaskStatus::Done, status);

        PortfolioDecision {
            current_price: context.current_price,
            max_shares: context.max_shares,
            signals: context.signals,
            decision,
        }
    }
}

/// Leading `periods` snapshots (newest first)
fn recent<T>(items: &[T], periods: usize) -> &[T] {
    &items[..items.len().min(periods)]
}
