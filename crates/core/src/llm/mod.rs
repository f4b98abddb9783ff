use crate::config::Settings;
use std::fmt;
use std::sync::Arc;

pub mod anthropic;
pub mod error;
pub mod json;
pub mod openai;

pub use error::GatewayError;

/// What the provider is asked to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    PlainText,
    StructuredObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAI => "openai",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request in, the model's top completion out. Implementations never retry.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate(&self, prompt: &str, mode: OutputMode) -> Result<String, GatewayError>;
}

pub fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn LlmClient>> {
    let provider = settings
        .llm_provider
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_else(|| Provider::OpenAI.as_str().to_string());

    match provider.as_str() {
        "openai" => Ok(Arc::new(openai::OpenAiClient::from_settings(settings)?)),
        "anthropic" => Ok(Arc::new(anthropic::AnthropicClient::from_settings(settings)?)),
        other => anyhow::bail!("unsupported LLM_PROVIDER: {other}"),
    }
}
