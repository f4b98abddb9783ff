use anyhow::Context;
use clap::ValueEnum;
use finmind_core::domain::profile::Profile;
use finmind_core::prompt::{self, ConversationContext, PromptKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Kind {
    Diagnosis,
    Plan,
    Goals,
    Checklist,
    Chat,
}

impl From<Kind> for PromptKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Diagnosis => PromptKind::Diagnosis,
            Kind::Plan => PromptKind::Plan,
            Kind::Goals => PromptKind::Goals,
            Kind::Checklist => PromptKind::Checklist,
            Kind::Chat => PromptKind::Chat,
        }
    }
}

pub fn load_context(path: Option<&std::path::Path>) -> anyhow::Result<ConversationContext> {
    let Some(path) = path else {
        return Ok(ConversationContext::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read context file failed: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("context file is not a valid session: {}", path.display()))
}

/// Renders the exact prompt the advisor would send for `kind`.
pub fn render(kind: Kind, ctx: &ConversationContext, message: Option<&str>) -> anyhow::Result<String> {
    Ok(match kind {
        Kind::Chat => {
            let message = message
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .context("--message is required for chat")?;
            prompt::chat_prompt(message, ctx)
        }
        Kind::Diagnosis => prompt::diagnosis_prompt(profile(ctx)?),
        Kind::Plan => prompt::plan_prompt(profile(ctx)?, ctx.diagnosis()),
        Kind::Goals => prompt::goals_prompt(profile(ctx)?, ctx.diagnosis(), ctx.plan()),
        Kind::Checklist => {
            let profile = profile(ctx)?;
            profile.require_complete()?;
            prompt::checklist_prompt(profile, ctx.diagnosis(), ctx.plan(), &ctx.goals)
        }
    })
}

fn profile(ctx: &ConversationContext) -> anyhow::Result<&Profile> {
    let profile = ctx.profile.as_ref().context("context has no profile")?;
    profile.validate()?;
    Ok(profile)
}
