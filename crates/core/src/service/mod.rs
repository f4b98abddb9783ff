//! Request orchestration: resolve context, render the prompt, call the gateway, normalize,
//! persist. One generation call per request.

use crate::config::Settings;
use crate::domain::chat::{ChatRole, ChatTurn};
use crate::domain::checklist::Checklist;
use crate::domain::contract::{Contract, LlmChecklist, LlmDiagnosis, LlmFinancialPlan, LlmGoals};
use crate::domain::diagnosis::Diagnosis;
use crate::domain::goal::Goal;
use crate::domain::plan::FinancialPlan;
use crate::domain::profile::Profile;
use crate::llm::json::{normalize, NormalizeError, NormalizePolicy};
use crate::llm::{GatewayError, LlmClient, Provider};
use crate::prompt::{self, ConversationContext, PromptKind};
use crate::storage::ArtifactStore;
use crate::time::deadline::{deadline_from, format_timeframe, months_remaining};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("artifact store is not configured")]
    StoreUnavailable,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::StoreUnavailable => "store_unavailable",
            ServiceError::Gateway(err) => err.code(),
            ServiceError::Normalize(err) => err.code(),
            ServiceError::Storage(_) => "storage_error",
        }
    }

    fn invalid(err: anyhow::Error) -> Self {
        ServiceError::InvalidInput(format!("{err:#}"))
    }
}

/// Input shared by the generation endpoints. Inline artifacts win over stored ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(flatten)]
    pub context: ConversationContext,
}

/// Chat input. Inline artifacts sit beside `message`, the same shape as [`GenerateRequest`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub message: String,
    #[serde(flatten)]
    pub context: ConversationContext,
}

#[derive(Clone)]
pub struct Advisor {
    llm: Arc<dyn LlmClient>,
    store: Option<Arc<dyn ArtifactStore>>,
    policy: NormalizePolicy,
    plan_fallback: bool,
}

impl Advisor {
    pub fn new(llm: Arc<dyn LlmClient>, store: Option<Arc<dyn ArtifactStore>>) -> Self {
        Self {
            llm,
            store,
            policy: NormalizePolicy::default(),
            plan_fallback: true,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        llm: Arc<dyn LlmClient>,
        store: Option<Arc<dyn ArtifactStore>>,
    ) -> Self {
        Self::new(llm, store)
            .with_policy(settings.normalize_policy)
            .with_plan_fallback(settings.plan_fallback)
    }

    pub fn with_policy(mut self, policy: NormalizePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_plan_fallback(mut self, enabled: bool) -> Self {
        self.plan_fallback = enabled;
        self
    }

    pub fn provider(&self) -> Provider {
        self.llm.provider()
    }

    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    fn require_store(&self) -> Result<&Arc<dyn ArtifactStore>, ServiceError> {
        self.store.as_ref().ok_or(ServiceError::StoreUnavailable)
    }

    /// Store handle for writes tied to `user_id`; `None` when either is missing.
    fn persistence(&self, user_id: Option<Uuid>) -> Option<(Uuid, &Arc<dyn ArtifactStore>)> {
        Some((user_id?, self.store.as_ref()?))
    }

    pub async fn save_profile(&self, user_id: Uuid, profile: Profile) -> Result<Profile, ServiceError> {
        profile.validate().map_err(ServiceError::invalid)?;
        self.require_store()?
            .save_profile(user_id, &profile)
            .await
            .map_err(ServiceError::Storage)?;
        tracing::info!(%user_id, "profile saved");
        Ok(profile)
    }

    pub async fn session(&self, user_id: Uuid) -> Result<ConversationContext, ServiceError> {
        self.require_store()?
            .load_session(user_id)
            .await
            .map_err(ServiceError::Storage)
    }

    /// Inline context completed from the store. A failed load only costs context.
    async fn resolve(&self, user_id: Option<Uuid>, inline: ConversationContext) -> ConversationContext {
        let mut ctx = inline;
        if let Some((user_id, store)) = self.persistence(user_id) {
            match store.load_session(user_id).await {
                Ok(stored) => ctx.fill_from(stored),
                Err(err) => {
                    tracing::warn!(%user_id, error = %err, "session load failed; using inline context only")
                }
            }
        }
        ctx
    }

    async fn generate<C: Contract>(&self, kind: PromptKind, prompt: &str) -> Result<C::Artifact, ServiceError> {
        let text = self.llm.generate(prompt, kind.output_mode()).await?;
        tracing::debug!(kind = %kind, provider = %self.llm.provider(), bytes = text.len(), "completion received");
        Ok(normalize::<C>(&text, self.policy)?)
    }

    pub async fn diagnose(&self, req: GenerateRequest) -> Result<Diagnosis, ServiceError> {
        let ctx = self.resolve(req.user_id, req.context).await;
        let profile = required_profile(&ctx)?;

        let prompt = prompt::diagnosis_prompt(profile);
        let diagnosis = self
            .generate::<LlmDiagnosis>(PromptKind::Diagnosis, &prompt)
            .await?;

        if let Some((user_id, store)) = self.persistence(req.user_id) {
            match store.save_diagnosis(user_id, &diagnosis).await {
                Ok(id) => tracing::info!(%user_id, diagnosis_id = %id, "persisted diagnosis"),
                Err(err) => tracing::error!(%user_id, error = %err, "diagnosis persistence failed"),
            }
        }
        Ok(diagnosis)
    }

    pub async fn plan(&self, req: GenerateRequest) -> Result<FinancialPlan, ServiceError> {
        let ctx = self.resolve(req.user_id, req.context).await;
        let profile = required_profile(&ctx)?;

        let prompt = prompt::plan_prompt(profile, ctx.diagnosis());
        let plan = match self
            .generate::<LlmFinancialPlan>(PromptKind::Plan, &prompt)
            .await
        {
            Ok(plan) => plan,
            Err(ServiceError::Gateway(err)) if self.plan_fallback => {
                tracing::warn!(error = %err, code = err.code(), "plan generation failed; using local fallback plan");
                FinancialPlan::fallback(profile)
            }
            Err(err) => return Err(err),
        };

        if let Some((user_id, store)) = self.persistence(req.user_id) {
            match store.save_plan(user_id, &plan).await {
                Ok(id) => tracing::info!(%user_id, plan_id = %id, "persisted financial plan"),
                Err(err) => tracing::error!(%user_id, error = %err, "plan persistence failed"),
            }
        }
        Ok(plan)
    }

    pub async fn goals(&self, req: GenerateRequest) -> Result<Vec<Goal>, ServiceError> {
        self.goals_on(req, Utc::now().date_naive()).await
    }

    async fn goals_on(&self, req: GenerateRequest, today: NaiveDate) -> Result<Vec<Goal>, ServiceError> {
        let ctx = self.resolve(req.user_id, req.context).await;
        let profile = required_profile(&ctx)?;

        let prompt = prompt::goals_prompt(profile, ctx.diagnosis(), ctx.plan());
        let generated: Vec<Goal> = self
            .generate::<LlmGoals>(PromptKind::Goals, &prompt)
            .await?
            .into_iter()
            .map(|goal| Goal {
                deadline: Some(deadline_from(&goal.ideal_timeframe, today)),
                ..goal
            })
            .collect();

        let Some((user_id, store)) = self.persistence(req.user_id) else {
            return Ok(generated);
        };

        let mut saved = Vec::with_capacity(generated.len());
        for goal in &generated {
            match store.insert_goal(user_id, goal).await {
                Ok(row) => saved.push(row),
                Err(err) => {
                    tracing::error!(%user_id, goal = %goal.name, error = %err, "goal persistence failed; omitting")
                }
            }
        }

        if saved.is_empty() && !generated.is_empty() {
            tracing::warn!(%user_id, count = generated.len(), "no goal persisted; returning generated goals");
            return Ok(generated);
        }
        tracing::info!(%user_id, saved = saved.len(), generated = generated.len(), "persisted goals");
        Ok(saved)
    }

    pub async fn checklist(&self, req: GenerateRequest) -> Result<Checklist, ServiceError> {
        let ctx = self.resolve(req.user_id, req.context).await;
        let profile = ctx
            .profile
            .as_ref()
            .ok_or_else(|| ServiceError::InvalidInput("profile is required".to_string()))?;
        profile.require_complete().map_err(ServiceError::invalid)?;

        let prompt = prompt::checklist_prompt(profile, ctx.diagnosis(), ctx.plan(), &ctx.goals);
        let checklist = self
            .generate::<LlmChecklist>(PromptKind::Checklist, &prompt)
            .await?;

        if let Some((user_id, store)) = self.persistence(req.user_id) {
            match store.save_checklist(user_id, &checklist).await {
                Ok(id) => tracing::info!(%user_id, checklist_id = %id, "persisted checklist"),
                Err(err) => tracing::error!(%user_id, error = %err, "checklist persistence failed"),
            }
        }
        Ok(checklist)
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<String, ServiceError> {
        let message = req.message.trim();
        if message.is_empty() {
            return Err(ServiceError::InvalidInput("message must be non-empty".to_string()));
        }

        let ctx = self.resolve(req.user_id, req.context).await;
        let prompt = prompt::chat_prompt(message, &ctx);
        let reply = self
            .llm
            .generate(&prompt, PromptKind::Chat.output_mode())
            .await?;

        // Two independent writes; a failed assistant turn leaves the user turn in place.
        if let Some((user_id, store)) = self.persistence(req.user_id) {
            for turn in [
                ChatTurn::now(ChatRole::User, message),
                ChatTurn::now(ChatRole::Assistant, reply.as_str()),
            ] {
                if let Err(err) = store.append_chat(user_id, &turn).await {
                    tracing::error!(%user_id, role = %turn.role, error = %err, "chat turn persistence failed");
                }
            }
        }
        Ok(reply)
    }

    pub async fn chat_history(&self, user_id: Uuid) -> Result<Vec<ChatTurn>, ServiceError> {
        self.require_store()?
            .chat_history(user_id)
            .await
            .map_err(ServiceError::Storage)
    }

    pub async fn latest_plan(&self, user_id: Uuid) -> Result<Option<FinancialPlan>, ServiceError> {
        self.require_store()?
            .latest_plan(user_id)
            .await
            .map_err(ServiceError::Storage)
    }

    pub async fn list_goals(&self, user_id: Uuid) -> Result<Vec<Goal>, ServiceError> {
        self.list_goals_on(user_id, Utc::now().date_naive()).await
    }

    async fn list_goals_on(&self, user_id: Uuid, today: NaiveDate) -> Result<Vec<Goal>, ServiceError> {
        let goals = self
            .require_store()?
            .list_goals(user_id)
            .await
            .map_err(ServiceError::Storage)?;
        Ok(goals.into_iter().map(|g| with_live_schedule(g, today)).collect())
    }

    pub async fn update_goal_saved(&self, goal_id: Uuid, saved_amount: f64) -> Result<Goal, ServiceError> {
        if !saved_amount.is_finite() || saved_amount < 0.0 {
            return Err(ServiceError::InvalidInput(format!(
                "saved_amount must be a finite number >= 0 (got {saved_amount})"
            )));
        }
        let goal = self
            .require_store()?
            .update_goal_saved(goal_id, saved_amount)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or(ServiceError::NotFound("goal"))?;
        tracing::info!(%goal_id, saved_amount, progress = goal.progress_pct, "goal progress updated");
        Ok(goal)
    }
}

fn required_profile(ctx: &ConversationContext) -> Result<&Profile, ServiceError> {
    let profile = ctx
        .profile
        .as_ref()
        .ok_or_else(|| ServiceError::InvalidInput("profile is required".to_string()))?;
    profile.validate().map_err(ServiceError::invalid)?;
    Ok(profile)
}

/// Progress, monthly amount and timeframe as of `today`, derived from the stored deadline.
fn with_live_schedule(goal: Goal, today: NaiveDate) -> Goal {
    let saved = goal.saved_amount;
    let mut goal = goal.with_saved_amount(saved);
    if let Some(deadline) = goal.deadline {
        let months = months_remaining(deadline, today);
        goal.monthly_amount = goal.total_amount / f64::from(months);
        goal.ideal_timeframe = format_timeframe(months);
    }
    goal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::profile::sample_profile;
    use crate::llm::scripted::ScriptedClient;
    use crate::llm::OutputMode;
    use crate::storage::memory::MemoryStore;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn diagnosis_json() -> String {
        json!({
            "situacao_atual": "Renda cobre os gastos com pouca folga",
            "pontos_fortes": ["renda estável"],
            "pontos_fracos": ["dívida no cartão"],
            "risco": "médio",
            "oportunidades": ["cortar assinaturas", "renegociar dívida", "automatizar poupança"],
            "conclusao": "Você está no caminho certo",
        })
        .to_string()
    }

    fn plan_json() -> String {
        json!({
            "orcamento_ideal": {"essenciais": 2500, "lazer": 1500, "investimento": 1000},
            "gastos_categoria": {"essenciais": 2400, "lazer": 1200, "investimento": 400},
            "valor_guardar": 1000,
            "acoes_reducao": ["a", "b", "c"],
            "plano_objetivo": "Guarde R$ 1000 por mês",
            "estrategia_dividas": "Quite o cartão primeiro",
            "erros_evitar": ["x", "y", "z"],
            "mensagem_final": "Bora!",
        })
        .to_string()
    }

    fn goals_json() -> String {
        json!({
            "metas": [
                {"nome": "Reserva de Emergência", "valor_total": 12000, "valor_mensal": 1000,
                 "prazo_ideal": "12 meses", "justificativa": "segurança"},
                {"nome": "Carro", "valor_total": 40000, "valor_mensal": 1600,
                 "prazo_ideal": "2 anos", "justificativa": "objetivo principal"},
                {"nome": "Aposentadoria", "valor_total": 100000, "valor_mensal": 500,
                 "prazo_ideal": "10 anos", "justificativa": "longo prazo"},
            ]
        })
        .to_string()
    }

    fn checklist_json() -> String {
        json!({
            "diarias": ["anotar gastos", "checar saldo"],
            "semanais": ["revisar gastos", "planejar compras", "ver metas"],
            "mensais": ["fechar o mês", "investir", "revisar orçamento"],
            "acao_unica": "cancelar assinaturas",
        })
        .to_string()
    }

    fn with_profile(user_id: Option<Uuid>) -> GenerateRequest {
        GenerateRequest {
            user_id,
            context: ConversationContext {
                profile: Some(sample_profile()),
                ..Default::default()
            },
        }
    }

    fn advisor(llm: &Arc<ScriptedClient>, store: Option<&Arc<MemoryStore>>) -> Advisor {
        let llm: Arc<dyn LlmClient> = llm.clone();
        let store = store.map(|s| s.clone() as Arc<dyn ArtifactStore>);
        Advisor::new(llm, store)
    }

    fn unavailable() -> GatewayError {
        GatewayError::Upstream {
            provider: Provider::OpenAI,
            status: 503,
            body: "overloaded".to_string(),
        }
    }

    #[tokio::test]
    async fn diagnose_persists_and_returns_artifact() {
        let llm = Arc::new(ScriptedClient::new().reply(diagnosis_json()));
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();

        let d = advisor(&llm, Some(&store)).diagnose(with_profile(Some(user))).await.unwrap();
        assert_eq!(d.opportunities.len(), 3);
        assert_eq!(store.diagnosis_count(), 1);
        assert_eq!(llm.modes(), vec![OutputMode::StructuredObject]);
    }

    #[tokio::test]
    async fn missing_profile_is_rejected_before_generation() {
        let llm = Arc::new(ScriptedClient::new().reply(diagnosis_json()));
        let err = advisor(&llm, None)
            .diagnose(GenerateRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn negative_income_is_rejected_before_generation() {
        let llm = Arc::new(ScriptedClient::new());
        let mut req = with_profile(None);
        if let Some(p) = req.context.profile.as_mut() {
            p.monthly_income = -1.0;
        }
        let err = advisor(&llm, None).plan(req).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn diagnosis_persistence_failure_still_returns_result() {
        let llm = Arc::new(ScriptedClient::new().reply(diagnosis_json()));
        let store = Arc::new(MemoryStore::new().fail_artifact_writes());

        let d = advisor(&llm, Some(&store))
            .diagnose(with_profile(Some(Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(d.current_situation, "Renda cobre os gastos com pouca folga");
        assert_eq!(store.diagnosis_count(), 0);
    }

    #[tokio::test]
    async fn plan_falls_back_when_gateway_fails() {
        let llm = Arc::new(ScriptedClient::new().fail(unavailable()));
        let store = Arc::new(MemoryStore::new());

        let plan = advisor(&llm, Some(&store))
            .plan(with_profile(Some(Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(plan, FinancialPlan::fallback(&sample_profile()));
        assert_eq!(store.plan_count(), 1);
    }

    #[tokio::test]
    async fn plan_gateway_error_surfaces_when_fallback_disabled() {
        let llm = Arc::new(ScriptedClient::new().fail(unavailable()));
        let err = advisor(&llm, None)
            .with_plan_fallback(false)
            .plan(with_profile(None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "provider_unavailable");
    }

    #[tokio::test]
    async fn plan_prompt_uses_stored_diagnosis() {
        let llm = Arc::new(ScriptedClient::new().reply(diagnosis_json()).reply(plan_json()));
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let advisor = advisor(&llm, Some(&store));

        advisor.diagnose(with_profile(Some(user))).await.unwrap();
        let plan = advisor.plan(with_profile(Some(user))).await.unwrap();
        assert_eq!(plan.monthly_savings_target, 1000.0);

        let calls = llm.calls.lock().unwrap();
        assert!(calls[1].0.contains(prompt::DIAGNOSIS_DIGEST_HEADER));
        assert!(calls[1].0.contains("Renda cobre os gastos com pouca folga"));
    }

    #[tokio::test]
    async fn goals_without_store_carry_deadlines_and_emergency_first() {
        let llm = Arc::new(ScriptedClient::new().reply(goals_json()));
        let goals = advisor(&llm, None)
            .goals_on(with_profile(None), today())
            .await
            .unwrap();

        assert_eq!(goals.len(), 3);
        assert!(goals[0].is_emergency_fund());
        assert_eq!(goals[0].deadline, NaiveDate::from_ymd_opt(2027, 10, 19));
        assert_eq!(goals[1].deadline, NaiveDate::from_ymd_opt(2028, 10, 19));
        assert!(goals.iter().all(|g| g.id.is_none()));
    }

    #[tokio::test]
    async fn goals_partial_persistence_omits_failed_rows() {
        let llm = Arc::new(ScriptedClient::new().reply(goals_json()));
        let store = Arc::new(MemoryStore::new().fail_goal_insert("Carro"));
        let user = Uuid::new_v4();

        let goals = advisor(&llm, Some(&store))
            .goals_on(with_profile(Some(user)), today())
            .await
            .unwrap();
        let names: Vec<&str> = goals.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Reserva de Emergência", "Aposentadoria"]);
        assert!(goals.iter().all(|g| g.id.is_some()));
    }

    #[tokio::test]
    async fn goals_total_persistence_failure_returns_generated_list() {
        let llm = Arc::new(ScriptedClient::new().reply(goals_json()));
        let store = Arc::new(
            MemoryStore::new()
                .fail_goal_insert("Reserva de Emergência")
                .fail_goal_insert("Carro")
                .fail_goal_insert("Aposentadoria"),
        );

        let goals = advisor(&llm, Some(&store))
            .goals_on(with_profile(Some(Uuid::new_v4())), today())
            .await
            .unwrap();
        assert_eq!(goals.len(), 3);
        assert!(goals.iter().all(|g| g.id.is_none()));
    }

    #[tokio::test]
    async fn checklist_requires_answered_income_and_expenses() {
        let llm = Arc::new(ScriptedClient::new().reply(checklist_json()));
        let mut req = with_profile(None);
        if let Some(p) = req.context.profile.as_mut() {
            p.monthly_expenses = 0.0;
        }
        let err = advisor(&llm, None).checklist(req).await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn checklist_is_generated_and_saved() {
        let llm = Arc::new(ScriptedClient::new().reply(checklist_json()));
        let store = Arc::new(MemoryStore::new());

        let c = advisor(&llm, Some(&store))
            .checklist(with_profile(Some(Uuid::new_v4())))
            .await
            .unwrap();
        assert_eq!(c.daily_actions.len(), 2);
        assert_eq!(c.one_time_action, "cancelar assinaturas");
        assert_eq!(store.checklist_count(), 1);
    }

    #[tokio::test]
    async fn structured_kinds_request_json_and_chat_requests_text() {
        let llm = Arc::new(
            ScriptedClient::new()
                .reply(diagnosis_json())
                .reply(plan_json())
                .reply(goals_json())
                .reply(checklist_json())
                .reply("Passo 1: ..."),
        );
        let advisor = advisor(&llm, None);

        advisor.diagnose(with_profile(None)).await.unwrap();
        advisor.plan(with_profile(None)).await.unwrap();
        advisor.goals(with_profile(None)).await.unwrap();
        advisor.checklist(with_profile(None)).await.unwrap();
        advisor
            .chat(ChatRequest {
                message: "Como começo a investir?".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(
            llm.modes(),
            vec![
                OutputMode::StructuredObject,
                OutputMode::StructuredObject,
                OutputMode::StructuredObject,
                OutputMode::StructuredObject,
                OutputMode::PlainText,
            ]
        );
    }

    #[tokio::test]
    async fn chat_keeps_user_turn_when_assistant_write_fails() {
        let llm = Arc::new(ScriptedClient::new().reply("Comece pela reserva."));
        let store = Arc::new(MemoryStore::new().fail_chat_append(ChatRole::Assistant));
        let user = Uuid::new_v4();
        let advisor = advisor(&llm, Some(&store));

        let reply = advisor
            .chat(ChatRequest {
                user_id: Some(user),
                message: "Por onde começo?".to_string(),
                context: ConversationContext::default(),
            })
            .await
            .unwrap();
        assert_eq!(reply, "Comece pela reserva.");

        let history = advisor.chat_history(user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].message, "Por onde começo?");
    }

    #[tokio::test]
    async fn chat_history_is_chronological() {
        let llm = Arc::new(ScriptedClient::new().reply("r1").reply("r2"));
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let advisor = advisor(&llm, Some(&store));

        for q in ["q1", "q2"] {
            advisor
                .chat(ChatRequest {
                    user_id: Some(user),
                    message: q.to_string(),
                    context: ConversationContext::default(),
                })
                .await
                .unwrap();
        }
        let messages: Vec<String> = advisor
            .chat_history(user)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.message)
            .collect();
        assert_eq!(messages, vec!["q1", "r1", "q2", "r2"]);
    }

    #[tokio::test]
    async fn empty_chat_message_is_rejected() {
        let llm = Arc::new(ScriptedClient::new());
        let err = advisor(&llm, None)
            .chat(ChatRequest {
                message: "   ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn chat_request_takes_artifacts_beside_message() {
        let body = json!({
            "message": "Como começo?",
            "profile": sample_profile(),
            "goals": [],
        });
        let chat: ChatRequest = serde_json::from_value(body.clone()).unwrap();
        let generate: GenerateRequest = serde_json::from_value(body).unwrap();

        assert_eq!(chat.message, "Como começo?");
        assert_eq!(chat.context.profile, Some(sample_profile()));
        assert_eq!(chat.context, generate.context);

        let bare: ChatRequest = serde_json::from_value(json!({ "message": "Oi" })).unwrap();
        assert!(bare.context.is_empty());
    }

    #[tokio::test]
    async fn chat_prompt_includes_stored_profile() {
        let llm = Arc::new(ScriptedClient::new().reply("ok"));
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let advisor = advisor(&llm, Some(&store));

        advisor.save_profile(user, sample_profile()).await.unwrap();
        advisor
            .chat(ChatRequest {
                user_id: Some(user),
                message: "Vale a pena comprar o carro?".to_string(),
                context: ConversationContext::default(),
            })
            .await
            .unwrap();

        let calls = llm.calls.lock().unwrap();
        assert!(calls[0].0.contains("comprar um carro"));
    }

    #[tokio::test]
    async fn read_endpoints_need_a_store() {
        let llm = Arc::new(ScriptedClient::new());
        let advisor = advisor(&llm, None);
        let user = Uuid::new_v4();

        assert!(matches!(advisor.session(user).await, Err(ServiceError::StoreUnavailable)));
        assert!(matches!(advisor.list_goals(user).await, Err(ServiceError::StoreUnavailable)));
        assert_eq!(
            advisor.chat_history(user).await.unwrap_err().code(),
            "store_unavailable"
        );
    }

    #[tokio::test]
    async fn update_goal_saved_recomputes_progress() {
        let llm = Arc::new(ScriptedClient::new().reply(goals_json()));
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let advisor = advisor(&llm, Some(&store));

        let goals = advisor.goals_on(with_profile(Some(user)), today()).await.unwrap();
        let Some(id) = goals[0].id else {
            panic!("goal was not persisted");
        };

        let updated = advisor.update_goal_saved(id, 6000.0).await.unwrap();
        assert_eq!(updated.progress_pct, 50);

        let err = advisor.update_goal_saved(id, -5.0).await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = advisor.update_goal_saved(Uuid::new_v4(), 10.0).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn listed_goals_derive_monthly_amount_from_deadline() {
        let llm = Arc::new(ScriptedClient::new().reply(goals_json()));
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let advisor = advisor(&llm, Some(&store));
        advisor.goals_on(with_profile(Some(user)), today()).await.unwrap();

        // Six months later the 12-month emergency fund has 183 days (7 blocks of 30) left.
        let later = NaiveDate::from_ymd_opt(2027, 4, 19).unwrap();
        let goals = advisor.list_goals_on(user, later).await.unwrap();
        let fund = &goals[0];
        assert_eq!(fund.ideal_timeframe, "7 meses");
        assert!((fund.monthly_amount - 12000.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(ServiceError::NotFound("goal").code(), "not_found");
        assert_eq!(ServiceError::Storage(anyhow::anyhow!("boom")).code(), "storage_error");
        assert_eq!(
            ServiceError::Gateway(GatewayError::EmptyCompletion { provider: Provider::OpenAI }).code(),
            "provider_empty"
        );
    }
}
