use analysis_core::NarrativeRenderer;
use async_trait::async_trait;

use crate::deepseek::DeepSeekClient;
use crate::LlmConfig;

/// Narrative renderer backed by DeepSeek. With no API key configured every
/// render is `None`.
#[derive(Clone)]
pub struct LlmNarrativeRenderer {
    client: Option<DeepSeekClient>,
}

impl LlmNarrativeRenderer {
    pub fn new(config: &LlmConfig) -> Self {
        let client = DeepSeekClient::new(config);
        if client.is_none() {
            tracing::warn!("DEEPSEEK_API_KEY not set, narratives disabled");
        }
        Self { client }
    }

    pub fn from_env() -> Self {
        Self::new(&LlmConfig::default())
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }
}

impl From<DeepSeekClient> for LlmNarrativeRenderer {
    fn from(client: DeepSeekClient) -> Self {
        Self { client: Some(client) }
    }
}

#[async_trait]
impl NarrativeRenderer for LlmNarrativeRenderer {
    async fn render(&self, instruction_prompt: &str, structured_payload: &str) -> Option<serde_json::Value> {
        let client = self.client.as_ref()?;
        match client.complete_json(instruction_prompt, structured_payload).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Narrative rendering failed ({}): {}", client.model(), e);
                None
            }
        }
    }
}
