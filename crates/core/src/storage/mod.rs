use crate::domain::chat::ChatTurn;
use crate::domain::checklist::Checklist;
use crate::domain::diagnosis::Diagnosis;
use crate::domain::goal::Goal;
use crate::domain::plan::FinancialPlan;
use crate::domain::profile::Profile;
use crate::prompt::ConversationContext;
use anyhow::Context;
use uuid::Uuid;

#[cfg(test)]
pub(crate) mod memory;
pub mod postgres;

pub use postgres::PgStore;

pub async fn migrate(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("sqlx migrations failed")?;
    Ok(())
}

/// Persistence for generated artifacts and chat turns. Every row is tagged with the user
/// it belongs to; nothing here coordinates concurrent writers.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn save_profile(&self, user_id: Uuid, profile: &Profile) -> anyhow::Result<()>;

    async fn load_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;

    async fn save_diagnosis(&self, user_id: Uuid, diagnosis: &Diagnosis) -> anyhow::Result<Uuid>;

    async fn latest_diagnosis(&self, user_id: Uuid) -> anyhow::Result<Option<Diagnosis>>;

    async fn save_plan(&self, user_id: Uuid, plan: &FinancialPlan) -> anyhow::Result<Uuid>;

    async fn latest_plan(&self, user_id: Uuid) -> anyhow::Result<Option<FinancialPlan>>;

    /// Inserts one goal and returns it with its assigned id.
    async fn insert_goal(&self, user_id: Uuid, goal: &Goal) -> anyhow::Result<Goal>;

    /// Active goals in creation order.
    async fn list_goals(&self, user_id: Uuid) -> anyhow::Result<Vec<Goal>>;

    async fn update_goal_saved(&self, goal_id: Uuid, saved_amount: f64)
        -> anyhow::Result<Option<Goal>>;

    async fn save_checklist(&self, user_id: Uuid, checklist: &Checklist) -> anyhow::Result<Uuid>;

    async fn latest_checklist(&self, user_id: Uuid) -> anyhow::Result<Option<Checklist>>;

    async fn append_chat(&self, user_id: Uuid, turn: &ChatTurn) -> anyhow::Result<()>;

    /// Transcript in chronological order.
    async fn chat_history(&self, user_id: Uuid) -> anyhow::Result<Vec<ChatTurn>>;

    async fn load_session(&self, user_id: Uuid) -> anyhow::Result<ConversationContext> {
        Ok(ConversationContext {
            profile: self.load_profile(user_id).await?,
            diagnosis: self.latest_diagnosis(user_id).await?,
            plan: self.latest_plan(user_id).await?,
            goals: self.list_goals(user_id).await?,
            checklist: self.latest_checklist(user_id).await?,
        })
    }
}
