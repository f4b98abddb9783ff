use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{get, post, put},
    Json, Router,
};
use finmind_core::domain::chat::ChatTurn;
use finmind_core::domain::checklist::Checklist;
use finmind_core::domain::diagnosis::Diagnosis;
use finmind_core::domain::goal::Goal;
use finmind_core::domain::plan::FinancialPlan;
use finmind_core::domain::profile::Profile;
use finmind_core::prompt::ConversationContext;
use finmind_core::service::{Advisor, ChatRequest, GenerateRequest};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::error::{ApiError, Screen};

#[derive(Clone)]
pub struct AppState {
    pub advisor: Advisor,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/users/:user_id/profile", put(put_profile))
        .route("/api/users/:user_id/session", get(get_session))
        .route("/api/users/:user_id/plan", get(get_latest_plan))
        .route("/api/users/:user_id/goals", get(get_goals))
        .route("/api/users/:user_id/chat", get(get_chat_history))
        .route("/api/diagnosis", post(post_diagnosis))
        .route("/api/plan", post(post_plan))
        .route("/api/goals", post(post_goals))
        .route("/api/goals/:goal_id/saved", put(put_goal_saved))
        .route("/api/checklist", post(post_checklist))
        .route("/api/chat", post(post_chat))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(v)| v).map_err(|rejection| {
        tracing::warn!(error = %rejection, "malformed request body");
        ApiError::invalid_input()
    })
}

fn id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(v)| v).map_err(|rejection| {
        tracing::warn!(error = %rejection, "malformed path id");
        ApiError::invalid_input()
    })
}

async fn put_profile(
    State(state): State<AppState>,
    user_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<Profile>, JsonRejection>,
) -> Result<Json<Profile>, ApiError> {
    let user_id = id(user_id)?;
    let profile = body(payload)?;
    state
        .advisor
        .save_profile(user_id, profile)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::Profile, e))
}

async fn get_session(
    State(state): State<AppState>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ConversationContext>, ApiError> {
    state
        .advisor
        .session(id(user_id)?)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::Session, e))
}

async fn post_diagnosis(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<Diagnosis>, ApiError> {
    state
        .advisor
        .diagnose(body(payload)?)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::Diagnosis, e))
}

async fn post_plan(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<FinancialPlan>, ApiError> {
    state
        .advisor
        .plan(body(payload)?)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::Plan, e))
}

async fn get_latest_plan(
    State(state): State<AppState>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<FinancialPlan>, ApiError> {
    state
        .advisor
        .latest_plan(id(user_id)?)
        .await
        .map_err(|e| ApiError::from_service(Screen::PlanLookup, e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(Screen::PlanLookup))
}

async fn post_goals(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    state
        .advisor
        .goals(body(payload)?)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::Goals, e))
}

async fn get_goals(
    State(state): State<AppState>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<Goal>>, ApiError> {
    state
        .advisor
        .list_goals(id(user_id)?)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::GoalList, e))
}

#[derive(Debug, Deserialize)]
struct SavedAmountBody {
    saved_amount: f64,
}

async fn put_goal_saved(
    State(state): State<AppState>,
    goal_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SavedAmountBody>, JsonRejection>,
) -> Result<Json<Goal>, ApiError> {
    let goal_id = id(goal_id)?;
    let SavedAmountBody { saved_amount } = body(payload)?;
    state
        .advisor
        .update_goal_saved(goal_id, saved_amount)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::GoalUpdate, e))
}

async fn post_checklist(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<Checklist>, ApiError> {
    state
        .advisor
        .checklist(body(payload)?)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::Checklist, e))
}

#[derive(Debug, Serialize)]
struct ChatReply {
    reply: String,
}

async fn post_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let reply = state
        .advisor
        .chat(body(payload)?)
        .await
        .map_err(|e| ApiError::from_service(Screen::Chat, e))?;
    Ok(Json(ChatReply { reply }))
}

async fn get_chat_history(
    State(state): State<AppState>,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<ChatTurn>>, ApiError> {
    state
        .advisor
        .chat_history(id(user_id)?)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_service(Screen::ChatHistory, e))
}
