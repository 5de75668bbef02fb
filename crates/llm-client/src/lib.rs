pub mod deepseek;
pub mod error;
pub mod provider;

pub use deepseek::{extract_json_block, DeepSeekClient};
pub use error::{LlmError, LlmResult};
pub use provider::LlmNarrativeRenderer;

use std::time::Duration;

/// Configuration for the chat-completions service
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Narratives are disabled when unset
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("DEEPSEEK_API_KEY").ok().filter(|key| !key.is_empty()),
            base_url: std::env::var("DEEPSEEK_BASE_URL")
                .unwrap_or_else(|_| "https://api.deepseek.com".to_string()),
            model: std::env::var("DEEPSEEK_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string()),
            max_tokens: 1024,
            temperature: 0.7,
            timeout: Duration::from_secs(120),
        }
    }
}
