pub mod domain;
pub mod llm;
pub mod prompt;
pub mod service;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;

    use crate::llm::json::NormalizePolicy;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub llm_provider: Option<String>,
        pub openai_api_key: Option<String>,
        pub anthropic_api_key: Option<String>,
        pub sentry_dsn: Option<String>,
        pub normalize_policy: NormalizePolicy,
        pub plan_fallback: bool,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let normalize_policy = match std::env::var("NORMALIZE_POLICY") {
                Ok(s) => s
                    .parse::<NormalizePolicy>()
                    .context("NORMALIZE_POLICY must be `lenient` or `strict`")?,
                Err(_) => NormalizePolicy::default(),
            };

            let plan_fallback = std::env::var("PLAN_FALLBACK")
                .ok()
                .map(|s| !matches!(s.trim(), "0" | "false" | "off"))
                .unwrap_or(true);

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                llm_provider: std::env::var("LLM_PROVIDER").ok(),
                openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
                anthropic_api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                normalize_policy,
                plan_fallback,
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_openai_api_key(&self) -> anyhow::Result<&str> {
            self.openai_api_key
                .as_deref()
                .context("OPENAI_API_KEY is required")
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }
    }
}
