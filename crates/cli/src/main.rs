use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use finmind_core::domain::plan::FinancialPlan;
use finmind_core::prompt::PromptKind;
use finmind_core::service::{Advisor, ChatRequest, GenerateRequest};
use finmind_core::storage::{ArtifactStore, PgStore};
use finmind_core::time::deadline;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod render;

use render::Kind;

#[derive(Debug, Parser)]
#[command(name = "finmind")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the prompt for one artifact without calling the provider.
    Prompt {
        #[arg(value_enum)]
        kind: Kind,

        /// JSON session file: `{"profile": {...}, "diagnosis": {...}, ...}`.
        #[arg(long)]
        context: Option<PathBuf>,

        /// Question text, chat only.
        #[arg(long)]
        message: Option<String>,
    },

    /// Run one generation through the configured provider and print the artifact as JSON.
    Generate {
        #[arg(value_enum)]
        kind: Kind,

        #[arg(long)]
        context: Option<PathBuf>,

        #[arg(long)]
        message: Option<String>,

        /// Load missing context from, and persist results to, this user's records.
        #[arg(long)]
        user_id: Option<Uuid>,
    },

    /// Print the locally computed plan used when the provider is unavailable.
    FallbackPlan {
        #[arg(long)]
        context: PathBuf,
    },

    /// Resolve a free-text duration ("6 meses", "2 anos") into a deadline.
    Deadline {
        duration: String,

        /// Reference date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        today: Option<String>,
    },

    /// Apply database migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = finmind_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = run(args.command, &settings).await;
    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
    }
    result
}

async fn run(command: Command, settings: &finmind_core::config::Settings) -> anyhow::Result<()> {
    match command {
        Command::Prompt {
            kind,
            context,
            message,
        } => {
            let ctx = render::load_context(context.as_deref())?;
            let prompt = render::render(kind, &ctx, message.as_deref())?;
            let kind = PromptKind::from(kind);
            tracing::info!(%kind, mode = ?kind.output_mode(), bytes = prompt.len(), "rendered prompt");
            println!("{prompt}");
        }

        Command::Generate {
            kind,
            context,
            message,
            user_id,
        } => {
            let ctx = render::load_context(context.as_deref())?;
            let store = match user_id {
                Some(_) => Some(connect(settings).await? as Arc<dyn ArtifactStore>),
                None => None,
            };
            let llm = finmind_core::llm::from_settings(settings)?;
            let advisor = Advisor::from_settings(settings, llm, store);

            let req = GenerateRequest {
                user_id,
                context: ctx,
            };
            let out = match kind {
                Kind::Diagnosis => serde_json::to_value(advisor.diagnose(req).await?)?,
                Kind::Plan => serde_json::to_value(advisor.plan(req).await?)?,
                Kind::Goals => serde_json::to_value(advisor.goals(req).await?)?,
                Kind::Checklist => serde_json::to_value(advisor.checklist(req).await?)?,
                Kind::Chat => {
                    let reply = advisor
                        .chat(ChatRequest {
                            user_id,
                            message: message.unwrap_or_default(),
                            context: req.context,
                        })
                        .await?;
                    serde_json::json!({ "reply": reply })
                }
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }

        Command::FallbackPlan { context } => {
            let ctx = render::load_context(Some(&context))?;
            let profile = ctx.profile.context("context has no profile")?;
            profile.validate()?;
            let plan = FinancialPlan::fallback(&profile);
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }

        Command::Deadline { duration, today } => {
            let today = match today {
                Some(s) => chrono::NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .with_context(|| format!("invalid --today (expected YYYY-MM-DD): {s}"))?,
                None => chrono::Utc::now().date_naive(),
            };
            let months = deadline::months_in(&duration);
            let date = deadline::deadline_from(&duration, today);
            println!("{date} ({})", deadline::format_timeframe(months));
        }

        Command::Migrate => {
            connect(settings).await?;
            tracing::info!("migrations applied");
        }
    }
    Ok(())
}

async fn connect(settings: &finmind_core::config::Settings) -> anyhow::Result<Arc<PgStore>> {
    let db_url = settings.require_database_url()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;

    finmind_core::storage::migrate(&pool).await?;
    Ok(Arc::new(PgStore::new(pool)))
}

fn init_sentry(settings: &finmind_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_user() {
        let user = Uuid::new_v4();
        let user_arg = user.to_string();
        let args = Args::try_parse_from([
            "finmind",
            "generate",
            "goals",
            "--context",
            "session.json",
            "--user-id",
            user_arg.as_str(),
        ])
        .unwrap();
        match args.command {
            Command::Generate { kind, user_id, .. } => {
                assert_eq!(kind, Kind::Goals);
                assert_eq!(user_id, Some(user));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(Args::try_parse_from(["finmind", "prompt", "budget"]).is_err());
    }
}
