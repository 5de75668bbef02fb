//! advisor-cli: score one ticker with every strategy and print the JSON report.
//!
//! Usage:
//!   cargo run -p advisor-cli -- --ticker NVDA
//!   cargo run -p advisor-cli -- --ticker NVDA --start-date 2025-01-01 --end-date 2025-04-05
//!   cargo run -p advisor-cli -- --ticker NVDA --cash 100000 --position NVDA=15000 --shares NVDA=120

use analysis_orchestrator::{AnalysisOrchestrator, AnalysisRequest};
use anyhow::{anyhow, bail, Context};
use chrono::{Duration, NaiveDate, Utc};
use financial_data_client::FinancialDatasetsClient;
use llm_client::LlmNarrativeRenderer;
use risk_manager::Portfolio;

mod console;

use console::ConsoleReporter;

/// Price window used when no start date is given
const DEFAULT_LOOKBACK_DAYS: i64 = 90;
/// Matches the 50% margin the portfolio-manager prompt states
const DEFAULT_MARGIN_REQUIREMENT: f64 = 0.5;

#[derive(Debug, Clone)]
struct CliArgs {
    ticker: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    portfolio: Option<Portfolio>,
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn parse_date(raw: &str, flag: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("{} expects YYYY-MM-DD, got {}", flag, raw))
}

/// Every `flag SYMBOL=VALUE` occurrence, symbols upper-cased
fn symbol_values(args: &[String], flag: &str, value_name: &str) -> anyhow::Result<Vec<(String, f64)>> {
    let mut values = Vec::new();
    for (i, arg) in args.iter().enumerate() {
        if arg != flag {
            continue;
        }
        let raw = args
            .get(i + 1)
            .ok_or_else(|| anyhow!("{} expects SYMBOL={}", flag, value_name))?;
        let (symbol, value) = raw
            .split_once('=')
            .ok_or_else(|| anyhow!("{} expects SYMBOL={}, got {}", flag, value_name, raw))?;
        let value: f64 = value
            .parse()
            .with_context(|| format!("{} value must be a number, got {}", flag, value))?;
        values.push((symbol.trim().to_uppercase(), value));
    }
    Ok(values)
}

fn parse_args(args: &[String], today: NaiveDate) -> anyhow::Result<CliArgs> {
    let ticker = flag_value(args, "--ticker")
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow!("--ticker is required"))?;

    let end_date = match flag_value(args, "--end-date") {
        Some(raw) => parse_date(raw, "--end-date")?,
        None => today,
    };
    let start_date = match flag_value(args, "--start-date") {
        Some(raw) => parse_date(raw, "--start-date")?,
        None => end_date - Duration::days(DEFAULT_LOOKBACK_DAYS),
    };
    if start_date > end_date {
        bail!("--start-date {} is after --end-date {}", start_date, end_date);
    }

    let cash = flag_value(args, "--cash")
        .map(|raw| raw.parse::<f64>().with_context(|| format!("--cash expects a number, got {}", raw)))
        .transpose()?;
    let margin_requirement = flag_value(args, "--margin-requirement")
        .map(|raw| {
            raw.parse::<f64>()
                .with_context(|| format!("--margin-requirement expects a number, got {}", raw))
        })
        .transpose()?;

    let costs = symbol_values(args, "--position", "COST")?;
    let shares = symbol_values(args, "--shares", "N")?;

    let portfolio = if cash.is_some() || !costs.is_empty() || !shares.is_empty() {
        let mut portfolio = Portfolio::with_cash(cash.unwrap_or(0.0));
        portfolio.margin_requirement = margin_requirement.unwrap_or(DEFAULT_MARGIN_REQUIREMENT);
        portfolio.cost_basis.extend(costs);
        for (symbol, long) in shares {
            portfolio.positions.entry(symbol).or_default().long = long;
        }
        Some(portfolio)
    } else {
        None
    };

    Ok(CliArgs {
        ticker,
        start_date,
        end_date,
        portfolio,
    })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  advisor-cli --ticker SYMBOL [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --start-date YYYY-MM-DD     Start of the price window (default: {} days before end)", DEFAULT_LOOKBACK_DAYS);
    eprintln!("  --end-date YYYY-MM-DD       Last reporting date considered (default: today)");
    eprintln!("  --cash N                    Portfolio cash; enables risk sizing and a portfolio decision");
    eprintln!("  --position SYMBOL=COST      Existing position at cost basis (repeatable)");
    eprintln!("  --shares SYMBOL=N           Long shares held in an existing position (repeatable)");
    eprintln!("  --margin-requirement N      Margin requirement for short positions (default: {})", DEFAULT_MARGIN_REQUIREMENT);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "advisor_cli=info,analysis_orchestrator=info,financial_data_client=warn".into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args, Utc::now().date_naive()) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    let data_source = FinancialDatasetsClient::from_env();
    let renderer = LlmNarrativeRenderer::from_env();
    let orchestrator = AnalysisOrchestrator::new(data_source, renderer);
    let reporter = ConsoleReporter::new();

    let request = AnalysisRequest {
        ticker: cli.ticker,
        start_date: cli.start_date,
        end_date: cli.end_date,
        portfolio: cli.portfolio,
    };
    tracing::info!("advisor-cli: analyzing {}", request.ticker);

    let report = orchestrator
        .analyze(&request, &reporter)
        .await
        .with_context(|| format!("analysis failed for {}", request.ticker))?;

    let failed = reporter.failed_tasks();
    if !failed.is_empty() {
        tracing::warn!("Completed with errors in: {}", failed.join(", "));
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
