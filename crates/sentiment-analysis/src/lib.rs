use analysis_core::{CompanyNewsItem, InsiderTrade, Signal};
use serde::{Deserialize, Serialize};

/// Weighted vote of insider trades and labelled news
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReport {
    pub signal: Signal,
    /// 0-100
    pub confidence: f64,
    pub weighted_bullish: f64,
    pub weighted_bearish: f64,
    pub insider_votes: VoteCounts,
    pub news_votes: VoteCounts,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl VoteCounts {
    fn record(&mut self, signal: Signal) {
        match signal {
            Signal::Bullish => self.bullish += 1,
            Signal::Bearish => self.bearish += 1,
            Signal::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.bullish + self.bearish + self.neutral
    }
}

/// Source weights are applied to vote counts, not to individual votes.
#[derive(Debug, Clone, Copy)]
pub struct SentimentAnalysisEngine {
    pub insider_weight: f64,
    pub news_weight: f64,
}

impl Default for SentimentAnalysisEngine {
    fn default() -> Self {
        Self {
            insider_weight: 0.3,
            news_weight: 0.7,
        }
    }
}

impl SentimentAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&self, insider_trades: &[InsiderTrade], news: &[CompanyNewsItem]) -> SentimentReport {
        let mut insider_votes = VoteCounts::default();
        // Trades without a share count cast no vote
        for shares in insider_trades.iter().filter_map(|t| t.transaction_shares) {
            insider_votes.record(if shares < 0.0 { Signal::Bearish } else { Signal::Bullish });
        }

        let mut news_votes = VoteCounts::default();
        for label in news.iter().filter_map(|n| n.sentiment.as_deref()) {
            news_votes.record(news_signal(label));
        }

        let weighted_bullish =
            insider_votes.bullish as f64 * self.insider_weight + news_votes.bullish as f64 * self.news_weight;
        let weighted_bearish =
            insider_votes.bearish as f64 * self.insider_weight + news_votes.bearish as f64 * self.news_weight;
        let total_weighted =
            insider_votes.total() as f64 * self.insider_weight + news_votes.total() as f64 * self.news_weight;

        let signal = if weighted_bullish > weighted_bearish {
            Signal::Bullish
        } else if weighted_bearish > weighted_bullish {
            Signal::Bearish
        } else {
            Signal::Neutral
        };

        let confidence = if total_weighted > 0.0 {
            (100.0 * weighted_bullish.max(weighted_bearish) / total_weighted).round()
        } else {
            0.0
        };

        SentimentReport {
            signal,
            confidence,
            weighted_bullish,
            weighted_bearish,
            insider_votes,
            news_votes,
            reasoning: format!(
                "Weighted Bullish signals: {:.1}, Weighted Bearish signals: {:.1}",
                weighted_bullish, weighted_bearish
            ),
        }
    }
}

/// Aggregates with the default insider/news weights.
pub fn analyze_sentiment(insider_trades: &[InsiderTrade], news: &[CompanyNewsItem]) -> SentimentReport {
    SentimentAnalysisEngine::default().analyze(insider_trades, news)
}

fn news_signal(label: &str) -> Signal {
    match label {
        "negative" => Signal::Bearish,
        "positive" => Signal::Bullish,
        _ => Signal::Neutral,
    }
}
