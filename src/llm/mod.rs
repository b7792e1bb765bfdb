use std::{env, fmt};

use anyhow::{Context, Result, anyhow, bail};
use reqwest::Client;
use serde::Deserialize;

use crate::config::BACKEND_TIMEOUT;

/// Enumerates the supported LLM backends behind the shared client.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LlmProvider {
    Groq,
    Gemini,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Groq => write!(f, "groq"),
            LlmProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Defines the shape of a chat-style interaction with an LLM.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the backend for a bare JSON object instead of prose.
    pub json_output: bool,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: crate::config::SCORING_TEMPERATURE,
            json_output: true,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Individual chat message, compatible with OpenAI compliant providers.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Supported chat roles passed to providers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Captures basic token usage metrics associated with a call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub response_tokens: usize,
    pub total_tokens: usize,
}

/// Full response surface returned to callers.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub token_usage: TokenUsage,
    pub provider: LlmProvider,
    pub model: String,
    pub raw: serde_json::Value,
}

/// Main entry point for invoking providers.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
}

#[derive(Clone, Default)]
struct LlmConfig {
    groq_api_key: Option<String>,
    gemini_api_key: Option<String>,
}

impl LlmClient {
    /// Build a client using environment variables. Missing keys are not an
    /// error here; the affected provider just reports itself unavailable.
    pub fn from_env() -> Result<Self> {
        Self::with_keys(env::var("GROQ_API_KEY").ok(), env::var("GEMINI_API_KEY").ok())
    }

    pub fn with_keys(groq_api_key: Option<String>, gemini_api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            config: LlmConfig {
                groq_api_key,
                gemini_api_key,
            },
        })
    }

    /// Whether the given provider has a configured API key.
    pub fn has_provider(&self, provider: LlmProvider) -> bool {
        match provider {
            LlmProvider::Groq => self.config.groq_api_key.is_some(),
            LlmProvider::Gemini => self.config.gemini_api_key.is_some(),
        }
    }

    /// Execute a request against the provider encoded in the model name.
    pub async fn execute(&self, request: LlmRequest) -> Result<LlmResponse> {
        let model = request.model.clone();
        let (provider, provider_model) = parse_model_provider(&model)?;

        match provider {
            LlmProvider::Groq => self.execute_groq(provider_model, &request).await,
            LlmProvider::Gemini => self.execute_gemini(provider_model, &request).await,
        }
    }

    async fn execute_groq(&self, model: &str, request: &LlmRequest) -> Result<LlmResponse> {
        let Some(api_key) = self.config.groq_api_key.as_ref() else {
            bail!("GROQ_API_KEY is not configured but required for Groq requests");
        };

        let messages: Vec<serde_json::Value> = request
            .messages
            .iter()
            .map(|msg| {
                serde_json::json!({
                    "role": msg.role.as_str(),
                    "content": msg.text,
                })
            })
            .collect();

        let mut payload = serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": request.temperature,
            "stream": false,
        });
        if request.json_output {
            payload["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        let response = self
            .http
            .post("https://api.groq.com/openai/v1/chat/completions")
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("failed to read response body")?;
        let body: serde_json::Value =
            serde_json::from_str(&response_text).with_context(|| {
                format!(
                    "failed to parse Groq response as JSON. Response body: {}",
                    preview(&response_text)
                )
            })?;
        if !status.is_success() {
            bail!("groq call failed with status {}: {}", status, body);
        }

        let chat: OpenAiChatCompletionPayload = serde_json::from_value(body.clone())
            .map_err(|_| anyhow!("unexpected Groq response payload: {}", body))?;
        let text = chat
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default();

        let token_usage = fill_usage(
            chat.usage.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens.unwrap_or_default(),
                response_tokens: usage.completion_tokens.unwrap_or_default(),
                total_tokens: usage.total_tokens.unwrap_or_default(),
            }),
            &request.messages,
            &text,
        );

        Ok(LlmResponse {
            text,
            token_usage,
            provider: LlmProvider::Groq,
            model: model.to_string(),
            raw: body,
        })
    }

    async fn execute_gemini(&self, model: &str, request: &LlmRequest) -> Result<LlmResponse> {
        let Some(api_key) = self.config.gemini_api_key.as_ref() else {
            bail!("GEMINI_API_KEY is not configured but required for Gemini requests");
        };

        // Gemini takes a single contents block; roles are folded into one
        // user turn the same way the prompt template expects.
        let combined = request
            .messages
            .iter()
            .map(|msg| msg.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut generation_config = serde_json::json!({
            "temperature": request.temperature,
        });
        if request.json_output {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }

        let payload = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": combined }],
            }],
            "generationConfig": generation_config,
        });

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        );

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .context("failed to read response body")?;
        let body: serde_json::Value =
            serde_json::from_str(&response_text).with_context(|| {
                format!(
                    "failed to parse Gemini response as JSON. Response body: {}",
                    preview(&response_text)
                )
            })?;
        if !status.is_success() {
            bail!("gemini call failed with status {}: {}", status, body);
        }

        let parsed: GeminiResponsePayload = serde_json::from_value(body.clone())
            .map_err(|_| anyhow!("unexpected Gemini response payload: {}", body))?;
        let text = parsed
            .candidates
            .into_iter()
            .flat_map(|candidate| candidate.content.parts)
            .find_map(|part| part.text)
            .unwrap_or_default();

        let token_usage = fill_usage(
            parsed.usage_metadata.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_token_count.unwrap_or_default(),
                response_tokens: usage.candidates_token_count.unwrap_or_default(),
                total_tokens: usage.total_token_count.unwrap_or_default(),
            }),
            &request.messages,
            &text,
        );

        Ok(LlmResponse {
            text,
            token_usage,
            provider: LlmProvider::Gemini,
            model: model.to_string(),
            raw: body,
        })
    }
}

fn preview(text: &str) -> String {
    if text.len() > 500 {
        format!("{}...", &text[..500])
    } else {
        text.to_string()
    }
}

/// Backfill token counts when the provider omits or zeroes them.
fn fill_usage(usage: Option<TokenUsage>, messages: &[ChatMessage], text: &str) -> TokenUsage {
    let prompt_tokens = approximate_token_count(
        &messages
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    );

    let mut token_usage = usage.unwrap_or_else(|| TokenUsage {
        prompt_tokens,
        response_tokens: approximate_token_count(text),
        total_tokens: prompt_tokens + approximate_token_count(text),
    });
    if token_usage.prompt_tokens == 0 {
        token_usage.prompt_tokens = prompt_tokens;
    }
    if token_usage.response_tokens == 0 {
        token_usage.response_tokens = approximate_token_count(text);
    }
    token_usage.total_tokens = token_usage.prompt_tokens + token_usage.response_tokens;
    token_usage
}

fn parse_model_provider(model: &str) -> Result<(LlmProvider, &str)> {
    let (provider, name) = model.split_once('/').ok_or_else(|| {
        anyhow!("model must be prefixed with provider, e.g. 'groq/llama-3.1-8b-instant'")
    })?;

    if name.trim().is_empty() {
        bail!("model name is required after provider prefix");
    }

    match provider {
        "groq" => Ok((LlmProvider::Groq, name)),
        "gemini" => Ok((LlmProvider::Gemini, name)),
        other => bail!("unsupported provider prefix: {other}"),
    }
}

fn approximate_token_count(input: &str) -> usize {
    if input.trim().is_empty() {
        return 0;
    }
    input
        .split_whitespace()
        .filter(|segment| !segment.is_empty())
        .count()
}

#[derive(Debug, Deserialize)]
struct OpenAiChatCompletionPayload {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChatMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePayload {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: GeminiContent,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(default, rename = "promptTokenCount")]
    prompt_token_count: Option<usize>,
    #[serde(default, rename = "candidatesTokenCount")]
    candidates_token_count: Option<usize>,
    #[serde(default, rename = "totalTokenCount")]
    total_token_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_prefix_parses() {
        let (provider, name) = parse_model_provider("groq/llama-3.1-8b-instant").unwrap();
        assert_eq!(provider, LlmProvider::Groq);
        assert_eq!(name, "llama-3.1-8b-instant");

        let (provider, name) = parse_model_provider("gemini/gemini-flash-latest").unwrap();
        assert_eq!(provider, LlmProvider::Gemini);
        assert_eq!(name, "gemini-flash-latest");
    }

    #[test]
    fn provider_prefix_rejects_unknown() {
        assert!(parse_model_provider("openai/gpt-4o").is_err());
        assert!(parse_model_provider("no-prefix").is_err());
        assert!(parse_model_provider("groq/").is_err());
    }

    #[test]
    fn missing_keys_disable_providers() {
        let client = LlmClient::with_keys(None, Some("k".into())).unwrap();
        assert!(!client.has_provider(LlmProvider::Groq));
        assert!(client.has_provider(LlmProvider::Gemini));
    }

    #[test]
    fn gemini_payload_extracts_text() {
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"ok\":true}" }], "role": "model" }
            }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 5, "totalTokenCount": 17 }
        });
        let parsed: GeminiResponsePayload = serde_json::from_value(body).unwrap();
        let text = parsed
            .candidates
            .into_iter()
            .flat_map(|c| c.content.parts)
            .find_map(|p| p.text)
            .unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }
}
