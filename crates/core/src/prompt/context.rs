use crate::domain::checklist::Checklist;
use crate::domain::diagnosis::Diagnosis;
use crate::domain::goal::Goal;
use crate::domain::plan::FinancialPlan;
use crate::domain::profile::Profile;
use crate::prompt::{joined, money, plan_lines, profile_lines, render_blocks, section};
use serde::{Deserialize, Serialize};

pub const CONTEXT_PROFILE_HEADER: &str = "DADOS FINANCEIROS:";
pub const CONTEXT_DIAGNOSIS_HEADER: &str = "DIAGNÓSTICO FINANCEIRO:";
pub const CONTEXT_PLAN_HEADER: &str = "PLANO FINANCEIRO:";
pub const CONTEXT_GOALS_HEADER: &str = "METAS FINANCEIRAS:";
pub const CONTEXT_CHECKLIST_HEADER: &str = "CHECKLIST ATIVO:";

/// Everything known about one user, in the order the journey produces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub profile: Option<Profile>,
    #[serde(default)]
    pub diagnosis: Option<Diagnosis>,
    #[serde(default)]
    pub plan: Option<FinancialPlan>,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub checklist: Option<Checklist>,
}

impl ConversationContext {
    pub fn diagnosis(&self) -> Option<&Diagnosis> {
        self.diagnosis.as_ref().filter(|d| !d.is_blank())
    }

    pub fn plan(&self) -> Option<&FinancialPlan> {
        self.plan.as_ref().filter(|p| !p.is_blank())
    }

    pub fn checklist(&self) -> Option<&Checklist> {
        self.checklist.as_ref().filter(|c| !c.is_blank())
    }

    /// Fills the artifacts this context lacks from `stored`. Values already present win.
    pub fn fill_from(&mut self, stored: ConversationContext) {
        if self.profile.is_none() {
            self.profile = stored.profile;
        }
        if self.diagnosis().is_none() {
            self.diagnosis = stored.diagnosis;
        }
        if self.plan().is_none() {
            self.plan = stored.plan;
        }
        if self.goals.is_empty() {
            self.goals = stored.goals;
        }
        if self.checklist().is_none() {
            self.checklist = stored.checklist;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_none()
            && self.diagnosis().is_none()
            && self.plan().is_none()
            && self.goals.is_empty()
            && self.checklist().is_none()
    }
}

/// Renders the memory block injected into chat prompts: profile, diagnosis, plan, goals,
/// checklist, in that order. Absent or blank inputs produce no section.
pub fn assemble_context(ctx: &ConversationContext) -> String {
    render_blocks(vec![
        ctx.profile.as_ref().and_then(profile_section),
        ctx.diagnosis().and_then(diagnosis_section),
        ctx.plan().and_then(plan_section),
        goals_section(&ctx.goals),
        ctx.checklist().and_then(checklist_section),
    ])
}

fn profile_section(p: &Profile) -> Option<String> {
    let mut lines = profile_lines(p);
    lines.push(("Guarda por mês", money(p.monthly_savings_amount)));
    section(CONTEXT_PROFILE_HEADER, lines)
}

fn diagnosis_section(d: &Diagnosis) -> Option<String> {
    section(
        CONTEXT_DIAGNOSIS_HEADER,
        vec![
            ("Situação atual", d.current_situation.trim().to_string()),
            (
                "Nível de risco",
                d.risk_level
                    .map(|r| r.label_pt().to_string())
                    .unwrap_or_default(),
            ),
            ("Pontos fortes", joined(&d.strengths)),
            ("Pontos fracos", joined(&d.weaknesses)),
            ("Oportunidades", joined(&d.opportunities)),
        ],
    )
}

fn plan_section(p: &FinancialPlan) -> Option<String> {
    let mut lines = plan_lines(p);
    lines.push(("Estratégia para dívidas", p.debt_strategy.trim().to_string()));
    section(CONTEXT_PLAN_HEADER, lines)
}

fn goals_section(goals: &[Goal]) -> Option<String> {
    if goals.is_empty() {
        return None;
    }
    let lines: Vec<String> = goals
        .iter()
        .enumerate()
        .map(|(i, g)| {
            format!(
                "{}. {} - {} ({}/mês, guardado {}, {}%)",
                i + 1,
                g.name.trim(),
                money(g.total_amount),
                money(g.monthly_amount),
                money(g.saved_amount),
                g.progress_pct
            )
        })
        .collect();
    Some(format!("{CONTEXT_GOALS_HEADER}\n{}", lines.join("\n")))
}

fn checklist_section(c: &Checklist) -> Option<String> {
    section(
        CONTEXT_CHECKLIST_HEADER,
        vec![
            ("Ações diárias", joined(&c.daily_actions)),
            ("Ações semanais", joined(&c.weekly_actions)),
            ("Ações mensais", joined(&c.monthly_actions)),
            ("Ação única", c.one_time_action.trim().to_string()),
        ],
    )
}

#[cfg(test)]
pub(crate) fn sample_context() -> ConversationContext {
    use crate::domain::diagnosis::RiskLevel;
    use crate::domain::plan::BudgetSplit;

    let profile = crate::domain::profile::sample_profile();
    ConversationContext {
        diagnosis: Some(Diagnosis {
            current_situation: "Gastos consomem 80% da renda".to_string(),
            strengths: vec!["renda estável".to_string()],
            weaknesses: vec!["sem reserva".to_string()],
            risk_level: Some(RiskLevel::Medium),
            opportunities: vec!["cortar delivery".to_string()],
            closing_message: "Dá para virar o jogo".to_string(),
        }),
        plan: Some(FinancialPlan {
            ideal_budget: BudgetSplit::of(profile.monthly_income, 0.5, 0.3, 0.2),
            monthly_savings_target: 800.0,
            goal_plan: "Guardar 800 por mês".to_string(),
            debt_strategy: "Quitar o cartão primeiro".to_string(),
            ..FinancialPlan::default()
        }),
        goals: vec![Goal {
            id: None,
            name: "Reserva de Emergência".to_string(),
            total_amount: 12000.0,
            monthly_amount: 500.0,
            ideal_timeframe: "2 anos".to_string(),
            rationale: "segurança".to_string(),
            saved_amount: 0.0,
            progress_pct: 0,
            deadline: None,
        }],
        checklist: Some(Checklist {
            daily_actions: vec!["anotar gastos".to_string(), "checar saldo".to_string()],
            weekly_actions: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            monthly_actions: vec!["d".to_string(), "e".to_string(), "f".to_string()],
            one_time_action: "renegociar o cartão".to_string(),
        }),
        profile: Some(profile),
    }
}
