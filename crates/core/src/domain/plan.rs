use crate::domain::profile::Profile;
use serde::{Deserialize, Serialize};

/// Amounts per 50/30/20 bucket, in the user's currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSplit {
    pub essentials: f64,
    pub leisure: f64,
    pub investment: f64,
}

impl BudgetSplit {
    pub fn of(amount: f64, essentials: f64, leisure: f64, investment: f64) -> Self {
        Self {
            essentials: amount * essentials,
            leisure: amount * leisure,
            investment: amount * investment,
        }
    }

    pub fn total(&self) -> f64 {
        self.essentials + self.leisure + self.investment
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialPlan {
    pub ideal_budget: BudgetSplit,
    pub suggested_spend: BudgetSplit,
    pub monthly_savings_target: f64,
    pub reduction_actions: Vec<String>,
    pub goal_plan: String,
    pub debt_strategy: String,
    pub mistakes_to_avoid: Vec<String>,
    pub closing_message: String,
}

impl FinancialPlan {
    pub fn is_blank(&self) -> bool {
        self.ideal_budget.is_zero()
            && self.suggested_spend.is_zero()
            && self.monthly_savings_target == 0.0
            && self.reduction_actions.is_empty()
            && self.goal_plan.trim().is_empty()
            && self.debt_strategy.trim().is_empty()
            && self.mistakes_to_avoid.is_empty()
            && self.closing_message.trim().is_empty()
    }

    /// Locally computed plan used when the generation gateway is unavailable.
    pub fn fallback(profile: &Profile) -> Self {
        let income = profile.monthly_income;
        let savings = income * 0.2;

        let debt_strategy = if profile.total_debt > 0.0 {
            format!(
                "Com R$ {:.2} em dívidas, priorize pagar as de maior juros primeiro. \
                 Destine pelo menos 30% da sua economia mensal para quitação.",
                profile.total_debt
            )
        } else {
            "Parabéns! Sem dívidas, você pode focar 100% em seus objetivos e investimentos."
                .to_string()
        };

        Self {
            ideal_budget: BudgetSplit::of(income, 0.5, 0.3, 0.2),
            suggested_spend: BudgetSplit::of(profile.monthly_expenses, 0.6, 0.3, 0.1),
            monthly_savings_target: savings,
            reduction_actions: vec![
                "Revisar assinaturas e serviços não utilizados".to_string(),
                "Planejar refeições e reduzir delivery".to_string(),
                "Comparar preços antes de compras grandes".to_string(),
            ],
            goal_plan: format!(
                "Para alcançar {} em {}, você precisa guardar aproximadamente R$ {:.2} por mês. \
                 Mantenha o foco e a disciplina.",
                profile.primary_goal.trim(),
                profile.timeframe(),
                savings
            ),
            debt_strategy,
            mistakes_to_avoid: vec![
                "Não criar uma reserva de emergência antes de investir".to_string(),
                "Gastar mais quando a renda aumentar (inflação de estilo de vida)".to_string(),
                "Ignorar pequenos gastos recorrentes que somam muito".to_string(),
            ],
            closing_message: "Lembre-se: consistência é mais importante que perfeição. \
                              Pequenas mudanças diárias levam a grandes resultados!"
                .to_string(),
        }
    }
}
