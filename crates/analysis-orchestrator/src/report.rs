use analysis_core::{AnalysisError, ScoreResult, Signal};
use fundamental_analysis::FundamentalsReport;
use risk_manager::{AgentSignal, RiskAnalysis};
use sentiment_analysis::SentimentReport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One strategy's numeric result plus whatever the renderer produced for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyReport {
    pub analysis: ScoreResult,
    pub narrative: Option<serde_json::Value>,
}

impl StrategyReport {
    /// Confidence reported by the narrative, if it carried a numeric one
    pub fn narrative_confidence(&self) -> Option<f64> {
        self.narrative.as_ref()?.get("confidence")?.as_f64()
    }

    /// Signal named by the narrative, case-insensitive
    pub fn narrative_signal(&self) -> Option<Signal> {
        let raw = self.narrative.as_ref()?.get("signal")?.as_str()?;
        match raw.trim().to_lowercase().as_str() {
            "bullish" => Some(Signal::Bullish),
            "bearish" => Some(Signal::Bearish),
            "neutral" => Some(Signal::Neutral),
            _ => None,
        }
    }

    /// Vote passed to the portfolio manager. Signal and confidence both come
    /// from the narrative when it names a signal; otherwise the scored signal
    /// goes out with no confidence.
    pub fn agent_signal(&self) -> AgentSignal {
        match self.narrative_signal() {
            Some(signal) => AgentSignal {
                signal,
                confidence: self.narrative_confidence(),
            },
            None => AgentSignal {
                signal: self.analysis.signal,
                confidence: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioDecision {
    pub current_price: f64,
    pub max_shares: u64,
    pub signals: BTreeMap<String, AgentSignal>,
    pub decision: Option<serde_json::Value>,
}

/// Everything produced for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerReport {
    pub ticker: String,
    pub strategies: BTreeMap<String, StrategyReport>,
    pub fundamentals: FundamentalsReport,
    pub sentiment: SentimentReport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio_decision: Option<PortfolioDecision>,
}

/// User message sent alongside a strategy's instruction prompt.
pub fn strategy_message(intro: &str, ticker: &str, analysis: &ScoreResult) -> Result<String, AnalysisError> {
    let analysis_data =
        serde_json::to_string_pretty(analysis).map_err(|e| AnalysisError::InvalidData(e.to_string()))?;

    Ok(format!(
        r#"{intro}

Analysis Data for {ticker}:
{analysis_data}

Return the trading signal in this JSON format:
```json
{{
  "signal": "bullish/bearish/neutral",
  "confidence": float (0-100),
  "reasoning": "string"
}}
```"#
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_message_embeds_analysis() {
        let analysis = ScoreResult::new(3, 4, vec!["EPS grew".to_string()]);
        let message = strategy_message("Based on the following analysis:", "NVDA", &analysis).unwrap();

        assert!(message.starts_with("Based on the following analysis:"));
        assert!(message.contains("Analysis Data for NVDA:"));
        assert!(message.contains("\"signal\": \"bullish\""));
        assert!(message.contains("EPS grew"));
        assert!(message.contains("```json"));
    }

    #[test]
    fn test_agent_signal_never_mixes_sources() {
        // Scored bullish, narrated bearish
        let mut report = StrategyReport {
            analysis: ScoreResult::new(4, 4, vec![]),
            narrative: Some(serde_json::json!({"signal": "Bearish", "confidence": 85})),
        };
        let vote = report.agent_signal();
        assert_eq!(vote.signal, Signal::Bearish);
        assert_eq!(vote.confidence, Some(85.0));

        // Confidence without a readable signal is not attached to the score
        report.narrative = Some(serde_json::json!({"signal": "strong buy", "confidence": 85}));
        let vote = report.agent_signal();
        assert_eq!(vote.signal, Signal::Bullish);
        assert_eq!(vote.confidence, None);

        report.narrative = None;
        assert_eq!(report.agent_signal().signal, Signal::Bullish);
        assert_eq!(report.agent_signal().confidence, None);
    }

    #[test]
    fn test_narrative_confidence() {
        let mut report = StrategyReport {
            analysis: ScoreResult::new(0, 1, vec![]),
            narrative: None,
        };
        assert_eq!(report.narrative_confidence(), None);

        report.narrative = Some(serde_json::json!({"signal": "bearish", "confidence": 65.5}));
        assert_eq!(report.narrative_confidence(), Some(65.5));

        report.narrative = Some(serde_json::json!({"confidence": "high"}));
        assert_eq!(report.narrative_confidence(), None);
    }
}
