use crate::config::Settings;
use crate::llm::error::GatewayError;
use crate::llm::{LlmClient, OutputMode, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// The Messages API has no JSON response mode, so structured requests carry a system
    /// prompt that pins the output to a single object.
    fn system_prompt(mode: OutputMode) -> Option<String> {
        match mode {
            OutputMode::PlainText => None,
            OutputMode::StructuredObject => Some(
                [
                    "Return ONLY one valid JSON object. Do not wrap in markdown.",
                    "No trailing commas. No comments. Use double quotes for all JSON strings.",
                    "Follow the output structure given in the user message exactly.",
                ]
                .join("\n"),
            ),
        }
    }

    fn request(&self, prompt: &str, mode: OutputMode) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Self::system_prompt(mode),
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
        }
    }

    fn headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key).map_err(|e| GatewayError::Config {
            provider: Provider::Anthropic,
            detail: format!("invalid api key header: {e}"),
        })?;
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        Ok(headers)
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::Thinking { .. } | ContentBlock::Unknown => {
                    // Ignore.
                }
            }
        }
        out
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate(&self, prompt: &str, mode: OutputMode) -> Result<String, GatewayError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(&self.request(prompt, mode))
            .send()
            .await
            .map_err(|source| GatewayError::Transport {
                provider: Provider::Anthropic,
                source,
            })?;

        let status = res.status();
        let text = res.text().await.map_err(|source| GatewayError::Transport {
            provider: Provider::Anthropic,
            source,
        })?;
        if !status.is_success() {
            return Err(GatewayError::from_status(Provider::Anthropic, status, text));
        }

        let parsed = serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| {
            GatewayError::Decode {
                provider: Provider::Anthropic,
                detail: format!("{e}: {text}"),
            }
        })?;

        if matches!(parsed.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                max_tokens = self.max_tokens,
                "Anthropic stop_reason=max_tokens; completion is truncated"
            );
        }

        if parsed.content.is_empty() {
            return Err(GatewayError::EmptyCompletion {
                provider: Provider::Anthropic,
            });
        }
        Ok(Self::response_text(&parsed))
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
    },

    #[serde(other)]
    Unknown,
}
