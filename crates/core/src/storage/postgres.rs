use crate::domain::chat::{ChatRole, ChatTurn};
use crate::domain::checklist::Checklist;
use crate::domain::diagnosis::{Diagnosis, RiskLevel};
use crate::domain::goal::Goal;
use crate::domain::plan::{BudgetSplit, FinancialPlan};
use crate::domain::profile::Profile;
use crate::storage::ArtifactStore;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type GoalRow = (
    Uuid,
    String,
    f64,
    f64,
    String,
    String,
    f64,
    Option<NaiveDate>,
);

const GOAL_COLUMNS: &str =
    "id, name, total_amount, monthly_amount, ideal_timeframe, rationale, saved_amount, deadline";

fn goal_from_row(row: GoalRow) -> Goal {
    let (id, name, total_amount, monthly_amount, ideal_timeframe, rationale, saved, deadline) = row;
    Goal {
        id: Some(id),
        name,
        total_amount,
        monthly_amount,
        ideal_timeframe,
        rationale,
        saved_amount: 0.0,
        progress_pct: 0,
        deadline,
    }
    .with_saved_amount(saved)
}

type ChatRow = (String, String, DateTime<Utc>);

// `seq` is the insertion order; created_at ties between a turn and its reply.
const CHAT_HISTORY_SQL: &str = "SELECT role, message, created_at \
                                FROM chat_messages WHERE user_id = $1 \
                                ORDER BY seq ASC";

fn chat_turn_from_row(row: ChatRow) -> anyhow::Result<ChatTurn> {
    let (role, message, created_at) = row;
    let role = role.parse::<ChatRole>().map_err(anyhow::Error::msg)?;
    Ok(ChatTurn {
        role,
        message,
        created_at,
    })
}

#[async_trait::async_trait]
impl ArtifactStore for PgStore {
    async fn save_profile(&self, user_id: Uuid, profile: &Profile) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO profiles (user_id, monthly_income, monthly_expenses, total_debt, primary_goal, \
             target_timeframe, stated_difficulty, monthly_savings_amount, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now()) \
             ON CONFLICT (user_id) DO UPDATE SET \
               monthly_income = EXCLUDED.monthly_income, \
               monthly_expenses = EXCLUDED.monthly_expenses, \
               total_debt = EXCLUDED.total_debt, \
               primary_goal = EXCLUDED.primary_goal, \
               target_timeframe = EXCLUDED.target_timeframe, \
               stated_difficulty = EXCLUDED.stated_difficulty, \
               monthly_savings_amount = EXCLUDED.monthly_savings_amount, \
               updated_at = now()",
        )
        .bind(user_id)
        .bind(profile.monthly_income)
        .bind(profile.monthly_expenses)
        .bind(profile.total_debt)
        .bind(&profile.primary_goal)
        .bind(&profile.target_timeframe)
        .bind(&profile.stated_difficulty)
        .bind(profile.monthly_savings_amount)
        .execute(&self.pool)
        .await
        .context("upsert profiles failed")?;
        Ok(())
    }

    async fn load_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        let row = sqlx::query_as::<_, (f64, f64, f64, String, String, String, f64)>(
            "SELECT monthly_income, monthly_expenses, total_debt, primary_goal, target_timeframe, \
             stated_difficulty, monthly_savings_amount \
             FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("select profiles failed")?;

        Ok(row.map(
            |(income, expenses, debt, goal, timeframe, difficulty, savings)| Profile {
                monthly_income: income,
                monthly_expenses: expenses,
                total_debt: debt,
                primary_goal: goal,
                target_timeframe: timeframe,
                stated_difficulty: difficulty,
                monthly_savings_amount: savings,
            },
        ))
    }

    async fn save_diagnosis(&self, user_id: Uuid, diagnosis: &Diagnosis) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO diagnoses (user_id, current_situation, strengths, weaknesses, risk_level, \
             opportunities, closing_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(&diagnosis.current_situation)
        .bind(&diagnosis.strengths)
        .bind(&diagnosis.weaknesses)
        .bind(diagnosis.risk_level.map(RiskLevel::as_str))
        .bind(&diagnosis.opportunities)
        .bind(&diagnosis.closing_message)
        .fetch_one(&self.pool)
        .await
        .context("insert diagnoses failed")?;
        Ok(id)
    }

    async fn latest_diagnosis(&self, user_id: Uuid) -> anyhow::Result<Option<Diagnosis>> {
        let row = sqlx::query_as::<
            _,
            (
                String,
                Vec<String>,
                Vec<String>,
                Option<String>,
                Vec<String>,
                String,
            ),
        >(
            "SELECT current_situation, strengths, weaknesses, risk_level, opportunities, closing_message \
             FROM diagnoses WHERE user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("select diagnoses failed")?;

        Ok(row.map(
            |(current_situation, strengths, weaknesses, risk, opportunities, closing_message)| {
                Diagnosis {
                    current_situation,
                    strengths,
                    weaknesses,
                    risk_level: risk.and_then(|r| r.parse().ok()),
                    opportunities,
                    closing_message,
                }
            },
        ))
    }

    async fn save_plan(&self, user_id: Uuid, plan: &FinancialPlan) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO financial_plans (user_id, ideal_budget, suggested_spend, monthly_savings_target, \
             reduction_actions, goal_plan, debt_strategy, mistakes_to_avoid, closing_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(Json(plan.ideal_budget))
        .bind(Json(plan.suggested_spend))
        .bind(plan.monthly_savings_target)
        .bind(&plan.reduction_actions)
        .bind(&plan.goal_plan)
        .bind(&plan.debt_strategy)
        .bind(&plan.mistakes_to_avoid)
        .bind(&plan.closing_message)
        .fetch_one(&self.pool)
        .await
        .context("insert financial_plans failed")?;
        Ok(id)
    }

    async fn latest_plan(&self, user_id: Uuid) -> anyhow::Result<Option<FinancialPlan>> {
        let row = sqlx::query_as::<
            _,
            (
                Json<BudgetSplit>,
                Json<BudgetSplit>,
                f64,
                Vec<String>,
                String,
                String,
                Vec<String>,
                String,
            ),
        >(
            "SELECT ideal_budget, suggested_spend, monthly_savings_target, reduction_actions, \
             goal_plan, debt_strategy, mistakes_to_avoid, closing_message \
             FROM financial_plans WHERE user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("select financial_plans failed")?;

        let Some((ideal, suggested, savings, actions, goal_plan, debt, mistakes, closing)) = row
        else {
            return Ok(None);
        };

        Ok(Some(FinancialPlan {
            ideal_budget: ideal.0,
            suggested_spend: suggested.0,
            monthly_savings_target: savings,
            reduction_actions: actions,
            goal_plan,
            debt_strategy: debt,
            mistakes_to_avoid: mistakes,
            closing_message: closing,
        }))
    }

    async fn insert_goal(&self, user_id: Uuid, goal: &Goal) -> anyhow::Result<Goal> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO goals (user_id, name, total_amount, monthly_amount, ideal_timeframe, \
             rationale, saved_amount, deadline, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active') \
             RETURNING id",
        )
        .bind(user_id)
        .bind(&goal.name)
        .bind(goal.total_amount)
        .bind(goal.monthly_amount)
        .bind(&goal.ideal_timeframe)
        .bind(&goal.rationale)
        .bind(goal.saved_amount)
        .bind(goal.deadline)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("insert goals failed (name={})", goal.name))?;

        Ok(Goal {
            id: Some(id),
            ..goal.clone()
        })
    }

    async fn list_goals(&self, user_id: Uuid) -> anyhow::Result<Vec<Goal>> {
        let rows = sqlx::query_as::<_, GoalRow>(&format!(
            "SELECT {GOAL_COLUMNS} FROM goals \
             WHERE user_id = $1 AND status = 'active' \
             ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("select goals failed")?;

        Ok(rows.into_iter().map(goal_from_row).collect())
    }

    async fn update_goal_saved(
        &self,
        goal_id: Uuid,
        saved_amount: f64,
    ) -> anyhow::Result<Option<Goal>> {
        let row = sqlx::query_as::<_, GoalRow>(&format!(
            "UPDATE goals SET saved_amount = $2 WHERE id = $1 RETURNING {GOAL_COLUMNS}"
        ))
        .bind(goal_id)
        .bind(saved_amount)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("update goals failed (id={goal_id})"))?;

        Ok(row.map(goal_from_row))
    }

    async fn save_checklist(&self, user_id: Uuid, checklist: &Checklist) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO checklists (user_id, daily_actions, weekly_actions, monthly_actions, one_time_action) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(&checklist.daily_actions)
        .bind(&checklist.weekly_actions)
        .bind(&checklist.monthly_actions)
        .bind(&checklist.one_time_action)
        .fetch_one(&self.pool)
        .await
        .context("insert checklists failed")?;
        Ok(id)
    }

    async fn latest_checklist(&self, user_id: Uuid) -> anyhow::Result<Option<Checklist>> {
        let row = sqlx::query_as::<_, (Vec<String>, Vec<String>, Vec<String>, String)>(
            "SELECT daily_actions, weekly_actions, monthly_actions, one_time_action \
             FROM checklists WHERE user_id = $1 \
             ORDER BY created_at DESC \
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("select checklists failed")?;

        Ok(row.map(|(daily, weekly, monthly, one_time)| Checklist {
            daily_actions: daily,
            weekly_actions: weekly,
            monthly_actions: monthly,
            one_time_action: one_time,
        }))
    }

    async fn append_chat(&self, user_id: Uuid, turn: &ChatTurn) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO chat_messages (user_id, role, message, created_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(turn.role.as_str())
        .bind(&turn.message)
        .bind(turn.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("insert chat_messages failed (role={})", turn.role))?;
        Ok(())
    }

    async fn chat_history(&self, user_id: Uuid) -> anyhow::Result<Vec<ChatTurn>> {
        let rows = sqlx::query_as::<_, ChatRow>(CHAT_HISTORY_SQL)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("select chat_messages failed")?;

        rows.into_iter()
            .map(|row| {
                chat_turn_from_row(row)
                    .with_context(|| format!("invalid chat row in DB for user_id={user_id}"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn goal_row_gets_id_and_progress() {
        let id = Uuid::new_v4();
        let goal = goal_from_row((
            id,
            "Reserva de emergência".to_string(),
            12000.0,
            500.0,
            "2 anos".to_string(),
            "Proteção contra imprevistos".to_string(),
            6000.0,
            NaiveDate::from_ymd_opt(2027, 1, 31),
        ));
        assert_eq!(goal.id, Some(id));
        assert_eq!(goal.saved_amount, 6000.0);
        assert_eq!(goal.progress_pct, 50);
        assert_eq!(goal.deadline, NaiveDate::from_ymd_opt(2027, 1, 31));
    }

    #[test]
    fn goal_row_with_zero_total_has_no_progress() {
        let goal = goal_from_row((
            Uuid::new_v4(),
            "Viagem".to_string(),
            0.0,
            0.0,
            String::new(),
            String::new(),
            150.0,
            None,
        ));
        assert_eq!(goal.progress_pct, 0);
        assert_eq!(goal.saved_amount, 150.0);
    }

    #[test]
    fn chat_row_parses_role() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let turn = chat_turn_from_row(("assistant".to_string(), "Olá".to_string(), at)).unwrap();
        assert_eq!(turn.role, ChatRole::Assistant);
        assert_eq!(turn.message, "Olá");
        assert_eq!(turn.created_at, at);

        assert!(chat_turn_from_row(("system".to_string(), "x".to_string(), at)).is_err());
    }

    #[test]
    fn chat_history_orders_by_insertion_sequence() {
        let order_by = CHAT_HISTORY_SQL
            .split("ORDER BY")
            .nth(1)
            .map(str::trim)
            .unwrap();
        assert_eq!(order_by, "seq ASC");
    }

    // Needs a disposable Postgres in DATABASE_URL; skipped otherwise.
    #[tokio::test]
    async fn chat_history_keeps_turn_order_when_timestamps_tie() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();
        crate::storage::migrate(&pool).await.unwrap();
        let store = PgStore::new(pool);

        let user = Uuid::new_v4();
        let at = Utc::now();
        for i in 0..20 {
            for role in [ChatRole::User, ChatRole::Assistant] {
                let turn = ChatTurn {
                    role,
                    message: format!("{role} {i}"),
                    created_at: at,
                };
                store.append_chat(user, &turn).await.unwrap();
            }
        }

        let history = store.chat_history(user).await.unwrap();
        assert_eq!(history.len(), 40);
        for (i, pair) in history.chunks(2).enumerate() {
            assert_eq!(pair[0].role, ChatRole::User);
            assert_eq!(pair[0].message, format!("user {i}"));
            assert_eq!(pair[1].role, ChatRole::Assistant);
            assert_eq!(pair[1].message, format!("assistant {i}"));
        }
    }
}
