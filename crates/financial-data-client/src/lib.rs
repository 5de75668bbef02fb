use analysis_core::{
    AnalysisError, CompanyNewsItem, FinancialDataSource, InsiderTrade, LineItem, MetricsSnapshot,
    PriceBar,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const DEFAULT_BASE_URL: &str = "https://api.financialdatasets.ai";

/// Connection settings, read from the environment by [`Default`].
#[derive(Debug, Clone)]
pub struct FinancialDatasetsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Requests per minute
    pub rate_limit: usize,
    pub timeout: Duration,
    /// Attempts per request while the API answers 429
    pub max_attempts: u32,
    /// Pause after a 429 that carries no `Retry-After`
    pub retry_wait: Duration,
}

impl Default for FinancialDatasetsConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("FINANCIAL_DATASETS_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            base_url: std::env::var("FINANCIAL_DATASETS_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            rate_limit: env_number("FINANCIAL_DATASETS_RATE_LIMIT").unwrap_or(500),
            timeout: Duration::from_secs(90),
            max_attempts: env_number("FINANCIAL_DATASETS_MAX_ATTEMPTS").unwrap_or(3),
            retry_wait: Duration::from_secs(env_number("FINANCIAL_DATASETS_RETRY_WAIT_SECS").unwrap_or(15)),
        }
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Request timestamps inside a one-minute window. Pure bookkeeping; the
/// caller does the sleeping.
#[derive(Debug)]
struct SlidingWindow {
    sent: VecDeque<Instant>,
    per_minute: usize,
}

impl SlidingWindow {
    const WINDOW: Duration = Duration::from_secs(60);

    fn new(per_minute: usize) -> Self {
        Self {
            sent: VecDeque::new(),
            per_minute: per_minute.max(1),
        }
    }

    /// Claims a slot at `now`, or returns how long until the oldest request
    /// leaves the window.
    fn reserve(&mut self, now: Instant) -> Result<(), Duration> {
        while self
            .sent
            .front()
            .is_some_and(|&sent| now.duration_since(sent) >= Self::WINDOW)
        {
            self.sent.pop_front();
        }

        match self.sent.front() {
            Some(&oldest) if self.sent.len() >= self.per_minute => {
                Err((oldest + Self::WINDOW).duration_since(now) + Duration::from_millis(50))
            }
            _ => {
                self.sent.push_back(now);
                Ok(())
            }
        }
    }
}

/// Wait requested by a 429 response, in whole seconds
fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

/// Client for the financialdatasets.ai REST API.
#[derive(Clone)]
pub struct FinancialDatasetsClient {
    config: FinancialDatasetsConfig,
    client: Client,
    window: Arc<Mutex<SlidingWindow>>,
}

impl FinancialDatasetsClient {
    pub fn new(config: FinancialDatasetsConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        let window = Arc::new(Mutex::new(SlidingWindow::new(config.rate_limit)));

        Self {
            config,
            client,
            window,
        }
    }

    pub fn from_env() -> Self {
        Self::new(FinancialDatasetsConfig::default())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header("X-API-KEY", key),
            None => builder,
        }
    }

    async fn acquire_slot(&self) {
        loop {
            let wait = match self.window.lock().await.reserve(Instant::now()) {
                Ok(()) => return,
                Err(wait) => wait,
            };
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for financial data API slot",
                wait.as_secs_f64()
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Send a request inside the per-minute budget, retrying while the API
    /// answers 429.
    async fn send_request(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, AnalysisError> {
        let request = self
            .with_auth(builder)
            .build()
            .map_err(|e| AnalysisError::ApiError(e.to_string()))?;
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            self.acquire_slot().await;
            let retry = request
                .try_clone()
                .ok_or_else(|| AnalysisError::ApiError("Cannot clone request".to_string()))?;
            let response = self
                .client
                .execute(retry)
                .await
                .map_err(|e| AnalysisError::ApiError(e.to_string()))?;

            if response.status() != reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }
            if attempt == attempts {
                break;
            }

            let wait = retry_after(response.headers()).unwrap_or(self.config.retry_wait);
            tracing::warn!(
                "Financial data API rate limited {} ({}/{}), retrying in {}s",
                request.url().path(),
                attempt,
                attempts,
                wait.as_secs()
            );
            tokio::time::sleep(wait).await;
        }

        Err(AnalysisError::RateLimited(format!(
            "{} still rate limited after {} attempts",
            request.url().path(),
            attempts
        )))
    }

    async fn fetch_json<R: DeserializeOwned>(
        &self,
        ticker: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<R, AnalysisError> {
        let response = self.send_request(builder).await?;

        if !response.status().is_success() {
            return Err(AnalysisError::ApiError(format!(
                "Error fetching data: {} - HTTP {}: {}",
                ticker,
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidData(format!("{}: {}", ticker, e)))
    }

    /// Walks a date-bounded listing backwards: while a start date is set and
    /// a full page came back, the next request ends at the oldest date seen.
    async fn fetch_backwards<R: PagedResponse>(
        &self,
        path: &str,
        params: PageParams<'_>,
    ) -> Result<Vec<R::Item>, AnalysisError> {
        let mut all = Vec::new();
        let mut current_end = params.end_date;

        loop {
            let mut query = vec![
                ("ticker", params.ticker.to_string()),
                (params.end_param, current_end.format("%Y-%m-%d").to_string()),
                ("limit", params.limit.to_string()),
            ];
            if let Some(start) = params.start_date {
                query.push((params.start_param, start.format("%Y-%m-%d").to_string()));
            }

            let page: R = self
                .fetch_json(params.ticker, self.client.get(self.url(path)).query(&query))
                .await?;
            let items = page.into_items();
            if items.is_empty() {
                break;
            }

            let full_page = items.len() >= params.limit;
            let oldest = oldest_date(items.iter().map(R::item_date));
            all.extend(items);

            let Some(start) = params.start_date else { break };
            if !full_page {
                break;
            }
            match next_page_end(oldest, current_end, start) {
                Some(next) => current_end = next,
                None => break,
            }
        }

        tracing::debug!("Fetched {} records from {} for {}", all.len(), path, params.ticker);
        Ok(all)
    }
}

struct PageParams<'a> {
    ticker: &'a str,
    end_param: &'static str,
    start_param: &'static str,
    end_date: NaiveDate,
    start_date: Option<NaiveDate>,
    limit: usize,
}

trait PagedResponse: DeserializeOwned {
    type Item;

    fn into_items(self) -> Vec<Self::Item>;

    fn item_date(item: &Self::Item) -> &str;
}

/// Earliest `YYYY-MM-DD` prefix among the given timestamps
fn oldest_date<'a>(dates: impl Iterator<Item = &'a str>) -> Option<NaiveDate> {
    dates
        .filter_map(|d| NaiveDate::parse_from_str(d.get(..10)?, "%Y-%m-%d").ok())
        .min()
}

/// Cursor for the next page, or `None` once the start date is reached or the
/// cursor would not move.
fn next_page_end(oldest: Option<NaiveDate>, current_end: NaiveDate, start: NaiveDate) -> Option<NaiveDate> {
    let oldest = oldest?;
    if oldest <= start || oldest >= current_end {
        None
    } else {
        Some(oldest)
    }
}

/// Bar timestamps arrive either as RFC 3339 or as a bare date.
fn parse_bar_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[async_trait]
impl FinancialDataSource for FinancialDatasetsClient {
    async fn get_financial_metrics(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        period: &str,
        limit: usize,
    ) -> Result<Vec<MetricsSnapshot>, AnalysisError> {
        let query = [
            ("ticker", ticker.to_string()),
            ("report_period_lte", end_date.format("%Y-%m-%d").to_string()),
            ("limit", limit.to_string()),
            ("period", period.to_string()),
        ];
        let response: MetricsResponse = self
            .fetch_json(ticker, self.client.get(self.url("/financial-metrics/")).query(&query))
            .await?;
        Ok(response.financial_metrics)
    }

    async fn get_line_items(
        &self,
        ticker: &str,
        fields: &[&str],
        end_date: NaiveDate,
        period: &str,
        limit: usize,
    ) -> Result<Vec<LineItem>, AnalysisError> {
        let body = LineItemSearchRequest {
            tickers: vec![ticker],
            line_items: fields,
            end_date: end_date.format("%Y-%m-%d").to_string(),
            period,
            limit,
        };
        let response: LineItemResponse = self
            .fetch_json(
                ticker,
                self.client.post(self.url("/financials/search/line-items")).json(&body),
            )
            .await?;

        let mut items = response.search_results;
        items.truncate(limit);
        Ok(items)
    }

    async fn get_insider_trades(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        start_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<InsiderTrade>, AnalysisError> {
        self.fetch_backwards::<InsiderTradeResponse>(
            "/insider-trades/",
            PageParams {
                ticker,
                end_param: "filing_date_lte",
                start_param: "filing_date_gte",
                end_date,
                start_date,
                limit,
            },
        )
        .await
    }

    async fn get_company_news(
        &self,
        ticker: &str,
        end_date: NaiveDate,
        start_date: Option<NaiveDate>,
        limit: usize,
    ) -> Result<Vec<CompanyNewsItem>, AnalysisError> {
        self.fetch_backwards::<CompanyNewsResponse>(
            "/news/",
            PageParams {
                ticker,
                end_param: "end_date",
                start_param: "start_date",
                end_date,
                start_date,
                limit,
            },
        )
        .await
    }

    async fn get_market_cap(&self, ticker: &str, end_date: NaiveDate) -> Result<Option<f64>, AnalysisError> {
        let metrics = self.get_financial_metrics(ticker, end_date, "ttm", 10).await?;
        Ok(metrics
            .first()
            .and_then(|m| m.market_cap)
            .filter(|&cap| cap != 0.0))
    }

    async fn get_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AnalysisError> {
        let query = [
            ("ticker", ticker.to_string()),
            ("interval", "day".to_string()),
            ("interval_multiplier", "1".to_string()),
            ("start_date", start_date.format("%Y-%m-%d").to_string()),
            ("end_date", end_date.format("%Y-%m-%d").to_string()),
        ];
        let response: PriceResponse = self
            .fetch_json(ticker, self.client.get(self.url("/prices/")).query(&query))
            .await?;

        Ok(response
            .prices
            .into_iter()
            .filter_map(|p| {
                let Some(time) = parse_bar_time(&p.time) else {
                    tracing::debug!("Skipping {} bar with unparseable time {:?}", ticker, p.time);
                    return None;
                };
                Some(PriceBar {
                    time,
                    open: p.open,
                    high: p.high,
                    low: p.low,
                    close: p.close,
                    volume: p.volume,
                })
            })
            .collect())
    }
}

// Request/response structures
#[derive(Debug, Serialize)]
struct LineItemSearchRequest<'a> {
    tickers: Vec<&'a str>,
    line_items: &'a [&'a str],
    end_date: String,
    period: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    prices: Vec<PriceResult>,
}

#[derive(Debug, Deserialize)]
struct PriceResult {
    open: f64,
    close: f64,
    high: f64,
    low: f64,
    #[serde(default)]
    volume: f64,
    time: String,
}

#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    financial_metrics: Vec<MetricsSnapshot>,
}

#[derive(Debug, Deserialize)]
struct LineItemResponse {
    #[serde(default)]
    search_results: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
struct InsiderTradeResponse {
    #[serde(default)]
    insider_trades: Vec<InsiderTrade>,
}

impl PagedResponse for InsiderTradeResponse {
    type Item = InsiderTrade;

    fn into_items(self) -> Vec<InsiderTrade> {
        self.insider_trades
    }

    fn item_date(item: &InsiderTrade) -> &str {
        &item.filing_date
    }
}

#[derive(Debug, Deserialize)]
struct CompanyNewsResponse {
    #[serde(default)]
    news: Vec<CompanyNewsItem>,
}

impl PagedResponse for CompanyNewsResponse {
    type Item = CompanyNewsItem;

    fn into_items(self) -> Vec<CompanyNewsItem> {
        self.news
    }

    fn item_date(item: &CompanyNewsItem) -> &str {
        &item.date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_bar_time_formats() {
        let rfc = parse_bar_time("2024-03-15T05:00:00Z").unwrap();
        assert_eq!(rfc.hour(), 5);
        let spaced = parse_bar_time("2024-03-15 16:00:00").unwrap();
        assert_eq!(spaced.hour(), 16);
        let bare = parse_bar_time("2024-03-15").unwrap();
        assert_eq!(bare.day(), 15);
        assert!(parse_bar_time("yesterday").is_none());
    }

    #[test]
    fn test_oldest_date_ignores_time_part() {
        let dates = ["2024-05-03T12:00:00Z", "2024-04-28", "bad", "2024-05-01T00:00:00"];
        assert_eq!(oldest_date(dates.into_iter()), Some(date(2024, 4, 28)));
        assert_eq!(oldest_date(std::iter::empty()), None);
    }

    #[test]
    fn test_next_page_end() {
        let start = date(2024, 1, 1);
        let end = date(2024, 6, 30);
        assert_eq!(next_page_end(Some(date(2024, 3, 1)), end, start), Some(date(2024, 3, 1)));
        // Reached the start date
        assert_eq!(next_page_end(Some(date(2024, 1, 1)), end, start), None);
        // Cursor would not move
        assert_eq!(next_page_end(Some(end), end, start), None);
        assert_eq!(next_page_end(None, end, start), None);
    }

    #[test]
    fn test_metrics_response_tolerates_missing_fields() {
        let body = r#"{"financial_metrics": [{
            "ticker": "AAPL",
            "report_period": "2024-09-28",
            "period": "ttm",
            "currency": "USD",
            "market_cap": 3.4e12,
            "return_on_equity": 1.6,
            "some_new_ratio": 0.5
        }]}"#;
        let response: MetricsResponse = serde_json::from_str(body).unwrap();
        let snapshot = &response.financial_metrics[0];
        assert_eq!(snapshot.report_period, date(2024, 9, 28));
        assert_eq!(snapshot.market_cap, Some(3.4e12));
        assert!(snapshot.net_margin.is_none());
    }

    #[test]
    fn test_line_item_search_body() {
        let fields = ["revenue", "free_cash_flow"];
        let body = LineItemSearchRequest {
            tickers: vec!["AAPL"],
            line_items: &fields,
            end_date: "2024-12-31".to_string(),
            period: "annual",
            limit: 5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["tickers"][0], "AAPL");
        assert_eq!(json["line_items"][1], "free_cash_flow");
        assert_eq!(json["limit"], 5);
    }

    #[test]
    fn test_news_response_without_sentiment() {
        let body = r#"{"news": [{"ticker": "AAPL", "title": "t", "date": "2024-05-01T10:00:00Z"}]}"#;
        let response: CompanyNewsResponse = serde_json::from_str(body).unwrap();
        let items = response.into_items();
        assert_eq!(items.len(), 1);
        assert!(items[0].sentiment.is_none());
        assert_eq!(CompanyNewsResponse::item_date(&items[0]), "2024-05-01T10:00:00Z");
    }

    #[test]
    fn test_sliding_window_budget() {
        let mut window = SlidingWindow::new(2);
        let start = Instant::now();

        assert!(window.reserve(start).is_ok());
        assert!(window.reserve(start + Duration::from_secs(10)).is_ok());

        // Third call inside the minute waits for the first to expire
        let wait = window.reserve(start + Duration::from_secs(20)).unwrap_err();
        assert_eq!(wait, Duration::from_secs(40) + Duration::from_millis(50));
        assert_eq!(window.sent.len(), 2);

        assert!(window.reserve(start + Duration::from_secs(60)).is_ok());
        assert_eq!(window.sent.len(), 2);
    }

    #[test]
    fn test_retry_after_header() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(reqwest::header::RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        // HTTP-date form falls back to the configured wait
        headers.insert(
            reqwest::header::RETRY_AFTER,
            "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_url_joins_base() {
        let client = FinancialDatasetsClient::new(FinancialDatasetsConfig {
            api_key: None,
            base_url: "http://localhost:9000/".to_string(),
            rate_limit: 10,
            timeout: Duration::from_secs(1),
            max_attempts: 1,
            retry_wait: Duration::from_secs(1),
        });
        assert_eq!(client.url("/prices/"), "http://localhost:9000/prices/");
    }
}
