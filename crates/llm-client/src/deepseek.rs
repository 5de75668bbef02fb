use serde::{Deserialize, Serialize};

use crate::error::{LlmError, LlmResult};
use crate::LlmConfig;

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client for DeepSeek.
#[derive(Clone)]
pub struct DeepSeekClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl DeepSeekClient {
    /// `None` when the config carries no API key.
    pub fn new(config: &LlmConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Single system + user exchange; returns the reply text.
    pub async fn chat(&self, system_prompt: &str, user_message: &str) -> LlmResult<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::ServiceUnavailable(format!(
                "Status: {} {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let result = response.json::<ChatResponse>().await?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("reply has no message content".to_string()))
    }

    /// Chat, then parse the first fenced JSON block of the reply.
    pub async fn complete_json(&self, system_prompt: &str, user_message: &str) -> LlmResult<serde_json::Value> {
        let reply = self.chat(system_prompt, user_message).await?;
        extract_json_block(&reply)
    }
}

/// Parses the contents of the first ```` ```json ```` fence in `content`.
pub fn extract_json_block(content: &str) -> LlmResult<serde_json::Value> {
    const FENCE: &str = "```json";

    let start = content.find(FENCE).ok_or(LlmError::MissingJsonBlock)?;
    let body = &content[start + FENCE.len()..];
    let end = body.find("```").ok_or(LlmError::MissingJsonBlock)?;
    Ok(serde_json::from_str(body[..end].trim())?)
}
