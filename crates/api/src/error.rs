use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use finmind_core::service::ServiceError;
use serde_json::json;

/// Which endpoint failed; selects the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Profile,
    Session,
    Diagnosis,
    Plan,
    PlanLookup,
    Goals,
    GoalList,
    GoalUpdate,
    Checklist,
    Chat,
    ChatHistory,
}

impl Screen {
    fn failure_message(self) -> &'static str {
        match self {
            Screen::Profile => "Erro ao salvar seus dados",
            Screen::Session => "Erro ao carregar sua sessão",
            Screen::Diagnosis => "Erro ao gerar diagnóstico",
            Screen::Plan => "Erro ao gerar plano financeiro",
            Screen::PlanLookup => "Erro ao buscar plano financeiro",
            Screen::Goals => "Erro ao gerar metas",
            Screen::GoalList => "Erro ao buscar metas",
            Screen::GoalUpdate => "Erro ao atualizar meta",
            Screen::Checklist => "Erro ao gerar checklist",
            Screen::Chat => "Erro ao processar mensagem",
            Screen::ChatHistory => "Erro ao buscar histórico",
        }
    }

    fn not_found_message(self) -> &'static str {
        match self {
            Screen::PlanLookup | Screen::Plan => "Plano não encontrado",
            Screen::GoalUpdate | Screen::GoalList | Screen::Goals => "Meta não encontrada",
            _ => "Registro não encontrado",
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

impl ApiError {
    pub fn invalid_input() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "invalid_input",
            message: "Dados incompletos",
        }
    }

    pub fn not_found(screen: Screen) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: screen.not_found_message(),
        }
    }

    pub fn from_service(screen: Screen, err: ServiceError) -> Self {
        let code = err.code();
        match err {
            ServiceError::InvalidInput(detail) => {
                tracing::warn!(?screen, %detail, "rejected invalid input");
                Self::invalid_input()
            }
            ServiceError::NotFound(_) => Self::not_found(screen),
            ServiceError::StoreUnavailable => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code,
                message: "Armazenamento indisponível no momento. Tente novamente mais tarde.",
            },
            ServiceError::Gateway(gateway) => {
                tracing::error!(?screen, error = %gateway, code, "generation gateway failed");
                sentry::capture_error(&gateway);
                let status = if gateway.is_retryable() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::BAD_GATEWAY
                };
                Self {
                    status,
                    code,
                    message: screen.failure_message(),
                }
            }
            ServiceError::Normalize(normalize) => {
                tracing::error!(?screen, error = %normalize, code, "provider output rejected");
                sentry::capture_error(&normalize);
                Self {
                    status: StatusCode::BAD_GATEWAY,
                    code,
                    message: screen.failure_message(),
                }
            }
            ServiceError::Storage(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(?screen, error = %e, "storage failure");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    code,
                    message: screen.failure_message(),
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({"error": self.message, "code": self.code})),
        )
            .into_response()
    }
}
