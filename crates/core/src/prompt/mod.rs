//! Deterministic prompt rendering. Everything here is a pure string transform: identical
//! inputs render byte-identical prompts.

pub mod context;
pub mod templates;

pub use context::{assemble_context, ConversationContext};
pub use templates::{chat_prompt, checklist_prompt, diagnosis_prompt, goals_prompt, plan_prompt};

use crate::domain::plan::{BudgetSplit, FinancialPlan};
use crate::domain::profile::Profile;
use crate::llm::OutputMode;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PROFILE_HEADER: &str = "DADOS DO USUÁRIO:";
pub const DIAGNOSIS_DIGEST_HEADER: &str = "DIAGNÓSTICO ANTERIOR:";
pub const PLAN_DIGEST_HEADER: &str = "PLANO FINANCEIRO ANTERIOR:";
pub const GOALS_DIGEST_HEADER: &str = "METAS DEFINIDAS:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Diagnosis,
    Plan,
    Goals,
    Checklist,
    Chat,
}

impl PromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::Diagnosis => "diagnosis",
            PromptKind::Plan => "plan",
            PromptKind::Goals => "goals",
            PromptKind::Checklist => "checklist",
            PromptKind::Chat => "chat",
        }
    }

    /// Structured artifacts ask the provider for a JSON object; chat asks for free text.
    pub fn output_mode(self) -> OutputMode {
        match self {
            PromptKind::Chat => OutputMode::PlainText,
            _ => OutputMode::StructuredObject,
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn money(value: f64) -> String {
    format!("R$ {value:.2}")
}

pub(crate) fn joined(items: &[String]) -> String {
    items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Questionnaire answers as `section` lines. Prompts and chat context share these labels.
pub(crate) fn profile_lines(p: &Profile) -> Vec<(&'static str, String)> {
    vec![
        ("Renda mensal", money(p.monthly_income)),
        ("Gastos mensais", money(p.monthly_expenses)),
        ("Dívidas totais", money(p.total_debt)),
        ("Objetivo principal", p.primary_goal.trim().to_string()),
        ("Prazo desejado", p.timeframe().to_string()),
        ("Dificuldade principal", p.stated_difficulty.trim().to_string()),
    ]
}

/// Savings target, ideal budget and goal strategy of a plan as `section` lines.
pub(crate) fn plan_lines(p: &FinancialPlan) -> Vec<(&'static str, String)> {
    vec![
        ("Valor para guardar por mês", money(p.monthly_savings_target)),
        ("Orçamento ideal", budget_summary(&p.ideal_budget)),
        ("Estratégia para objetivo", p.goal_plan.trim().to_string()),
    ]
}

/// Empty for an all-zero split so `section` drops the line.
pub(crate) fn budget_summary(b: &BudgetSplit) -> String {
    if b.is_zero() {
        return String::new();
    }
    format!(
        "Essenciais {}, Lazer {}, Investimento {}",
        money(b.essentials),
        money(b.leisure),
        money(b.investment)
    )
}

/// Joins the present blocks with a blank line; absent blocks leave no trace.
pub(crate) fn render_blocks(blocks: Vec<Option<String>>) -> String {
    blocks
        .into_iter()
        .flatten()
        .filter(|b| !b.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// A header followed by `- label: value` lines; lines with empty values are dropped and a
/// section with no lines is omitted.
pub(crate) fn section(header: &str, lines: Vec<(&str, String)>) -> Option<String> {
    let body: Vec<String> = lines
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(label, value)| format!("- {label}: {value}"))
        .collect();
    if body.is_empty() {
        return None;
    }
    Some(format!("{header}\n{}", body.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_chat_is_plain_text() {
        assert_eq!(PromptKind::Chat.output_mode(), OutputMode::PlainText);
        for kind in [
            PromptKind::Diagnosis,
            PromptKind::Plan,
            PromptKind::Goals,
            PromptKind::Checklist,
        ] {
            assert_eq!(kind.output_mode(), OutputMode::StructuredObject);
        }
    }

    #[test]
    fn section_drops_empty_lines_and_empty_sections() {
        assert_eq!(section("H:", vec![("a", String::new())]), None);
        assert_eq!(
            section("H:", vec![("a", "1".into()), ("b", " ".into())]).as_deref(),
            Some("H:\n- a: 1")
        );
    }

    #[test]
    fn zero_budget_drops_its_plan_line() {
        let mut plan = FinancialPlan {
            goal_plan: "Guardar todo mês".to_string(),
            ..Default::default()
        };
        let lines = section("PLANO:", plan_lines(&plan)).unwrap();
        assert!(!lines.contains("Orçamento ideal"));

        plan.ideal_budget = BudgetSplit::of(1000.0, 0.5, 0.3, 0.2);
        let lines = section("PLANO:", plan_lines(&plan)).unwrap();
        assert!(lines.contains(
            "- Orçamento ideal: Essenciais R$ 500.00, Lazer R$ 300.00, Investimento R$ 200.00"
        ));
    }

    #[test]
    fn prompts_and_chat_context_describe_the_profile_alike() {
        let profile = crate::domain::profile::sample_profile();
        let ctx = context::ConversationContext {
            profile: Some(profile.clone()),
            ..Default::default()
        };
        let prompt = templates::diagnosis_prompt(&profile);
        let chat = context::assemble_context(&ctx);
        for (label, value) in profile_lines(&profile) {
            let line = format!("- {label}: {value}");
            assert!(prompt.contains(&line), "prompt missing {line}");
            assert!(chat.contains(&line), "chat context missing {line}");
        }
        assert!(chat.contains("- Guarda por mês: R$ 300.00"));
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(5000.0), "R$ 5000.00");
        assert_eq!(money(12.5), "R$ 12.50");
    }
}
