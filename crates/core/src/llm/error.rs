use crate::llm::Provider;
use reqwest::StatusCode;

/// Failures of a single generation round trip, classified so callers can tell transient
/// outages from problems that will not go away on their own.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("LLM request failed (provider={provider}): {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("LLM rate limited (provider={provider}, status={status})")]
    RateLimited {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("LLM rejected credentials (provider={provider}, status={status})")]
    Auth { provider: Provider, status: u16 },

    #[error("LLM HTTP error (provider={provider}, status={status}): {body}")]
    Upstream {
        provider: Provider,
        status: u16,
        body: String,
    },

    #[error("LLM response could not be decoded (provider={provider}): {detail}")]
    Decode { provider: Provider, detail: String },

    #[error("LLM returned no completion (provider={provider})")]
    EmptyCompletion { provider: Provider },

    #[error("LLM client misconfigured (provider={provider}): {detail}")]
    Config { provider: Provider, detail: String },
}

impl GatewayError {
    pub fn from_status(provider: Provider, status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            429 => GatewayError::RateLimited {
                provider,
                status: 429,
                body,
            },
            s @ (401 | 403) => GatewayError::Auth {
                provider,
                status: s,
            },
            s => GatewayError::Upstream {
                provider,
                status: s,
                body,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Transport { .. }
            | GatewayError::RateLimited { .. }
            | GatewayError::EmptyCompletion { .. } => true,
            GatewayError::Upstream { status, .. } => *status >= 500,
            GatewayError::Auth { .. } | GatewayError::Decode { .. } | GatewayError::Config { .. } => {
                false
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Transport { .. } => "provider_unreachable",
            GatewayError::RateLimited { .. } => "provider_rate_limited",
            GatewayError::Auth { .. } => "provider_auth",
            GatewayError::Upstream { status, .. } if *status >= 500 => "provider_unavailable",
            GatewayError::Upstream { .. } => "provider_rejected",
            GatewayError::Decode { .. } => "provider_bad_response",
            GatewayError::EmptyCompletion { .. } => "provider_empty",
            GatewayError::Config { .. } => "provider_config",
        }
    }
}
