//! Output contracts the model is asked to honor, one per structured artifact.
//!
//! The contract types mirror the JSON keys written into the prompts. They decode
//! tolerantly (missing keys default, scalars coerce) so that a lenient caller always gets
//! something back; `violations()` reports how far the payload is from the contract.

use crate::domain::checklist::{Checklist, DAILY_ACTIONS, MONTHLY_ACTIONS, WEEKLY_ACTIONS};
use crate::domain::diagnosis::{Diagnosis, RiskLevel};
use crate::domain::goal::{is_emergency_fund_name, Goal};
use crate::domain::plan::{BudgetSplit, FinancialPlan};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const OPPORTUNITIES: usize = 3;
const REDUCTION_ACTIONS: usize = 3;
const MISTAKES_TO_AVOID: usize = 3;

pub trait Contract: DeserializeOwned + Default {
    type Artifact;

    const NAME: &'static str;

    fn violations(&self) -> Vec<String>;

    fn into_artifact(self) -> Self::Artifact;
}

mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn value_to_text(v: Value) -> Option<String> {
        match v {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    fn value_to_number(v: Value) -> Option<f64> {
        let n = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s
                .trim()
                .trim_start_matches("R$")
                .trim()
                .parse::<f64>()
                .ok(),
            _ => None,
        };
        n.filter(|n| n.is_finite())
    }

    pub fn text<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.and_then(value_to_text))
    }

    pub fn text_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Array(items)) => items.into_iter().filter_map(value_to_text).collect(),
            Some(Value::String(s)) => vec![s],
            _ => Vec::new(),
        })
    }

    pub fn number<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Option::<Value>::deserialize(d)?;
        Ok(v.and_then(value_to_number))
    }

    pub fn object<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(v @ Value::Object(_)) => serde_json::from_value(v).ok(),
            _ => None,
        })
    }

    pub fn object_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let v = Option::<Value>::deserialize(d)?;
        Ok(match v {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}

fn require_text(out: &mut Vec<String>, key: &str, value: &Option<String>) {
    if value.as_deref().map_or(true, |s| s.trim().is_empty()) {
        out.push(format!("{key} must be a non-empty string"));
    }
}

fn require_len(out: &mut Vec<String>, key: &str, items: &[String], expected: usize) {
    if items.len() != expected {
        out.push(format!(
            "{key} must have exactly {expected} items (got {})",
            items.len()
        ));
    }
    if items.iter().any(|s| s.trim().is_empty()) {
        out.push(format!("{key} items must be non-empty"));
    }
}

fn require_amount(out: &mut Vec<String>, key: &str, value: Option<f64>, positive: bool) {
    match value {
        None => out.push(format!("{key} must be a number")),
        Some(v) if positive && v <= 0.0 => out.push(format!("{key} must be > 0 (got {v})")),
        Some(v) if v < 0.0 => out.push(format!("{key} must be >= 0 (got {v})")),
        Some(_) => {}
    }
}

fn text_or_empty(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn trimmed(items: Vec<String>) -> Vec<String> {
    items.into_iter().map(|s| s.trim().to_string()).collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmDiagnosis {
    #[serde(default, deserialize_with = "lenient::text")]
    pub situacao_atual: Option<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub pontos_fortes: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub pontos_fracos: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub risco: Option<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub oportunidades: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub conclusao: Option<String>,
}

impl Contract for LlmDiagnosis {
    type Artifact = Diagnosis;

    const NAME: &'static str = "diagnosis";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        require_text(&mut out, "situacao_atual", &self.situacao_atual);
        if self.pontos_fortes.is_empty() {
            out.push("pontos_fortes must be non-empty".to_string());
        }
        if self.pontos_fracos.is_empty() {
            out.push("pontos_fracos must be non-empty".to_string());
        }
        match self.risco.as_deref() {
            None => out.push("risco must be one of baixo/médio/alto".to_string()),
            Some(r) => {
                if let Err(e) = r.parse::<RiskLevel>() {
                    out.push(e);
                }
            }
        }
        require_len(&mut out, "oportunidades", &self.oportunidades, OPPORTUNITIES);
        require_text(&mut out, "conclusao", &self.conclusao);
        out
    }

    fn into_artifact(self) -> Diagnosis {
        Diagnosis {
            current_situation: text_or_empty(self.situacao_atual),
            strengths: trimmed(self.pontos_fortes),
            weaknesses: trimmed(self.pontos_fracos),
            risk_level: self.risco.and_then(|r| r.parse().ok()),
            opportunities: trimmed(self.oportunidades),
            closing_message: text_or_empty(self.conclusao),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmBudget {
    #[serde(default, deserialize_with = "lenient::number")]
    pub essenciais: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub lazer: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub investimento: Option<f64>,
}

impl LlmBudget {
    fn check(&self, out: &mut Vec<String>, key: &str) {
        require_amount(out, &format!("{key}.essenciais"), self.essenciais, false);
        require_amount(out, &format!("{key}.lazer"), self.lazer, false);
        require_amount(out, &format!("{key}.investimento"), self.investimento, false);
    }

    fn into_split(self) -> BudgetSplit {
        BudgetSplit {
            essentials: self.essenciais.unwrap_or_default(),
            leisure: self.lazer.unwrap_or_default(),
            investment: self.investimento.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmFinancialPlan {
    #[serde(default, deserialize_with = "lenient::object")]
    pub orcamento_ideal: Option<LlmBudget>,
    #[serde(default, deserialize_with = "lenient::object")]
    pub gastos_categoria: Option<LlmBudget>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub valor_guardar: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub acoes_reducao: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub plano_objetivo: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub estrategia_dividas: Option<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub erros_evitar: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub mensagem_final: Option<String>,
}

impl Contract for LlmFinancialPlan {
    type Artifact = FinancialPlan;

    const NAME: &'static str = "plan";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (key, budget) in [
            ("orcamento_ideal", &self.orcamento_ideal),
            ("gastos_categoria", &self.gastos_categoria),
        ] {
            match budget {
                Some(b) => b.check(&mut out, key),
                None => out.push(format!("{key} must be an object")),
            }
        }
        require_amount(&mut out, "valor_guardar", self.valor_guardar, false);
        require_len(&mut out, "acoes_reducao", &self.acoes_reducao, REDUCTION_ACTIONS);
        require_text(&mut out, "plano_objetivo", &self.plano_objetivo);
        require_text(&mut out, "estrategia_dividas", &self.estrategia_dividas);
        require_len(&mut out, "erros_evitar", &self.erros_evitar, MISTAKES_TO_AVOID);
        require_text(&mut out, "mensagem_final", &self.mensagem_final);
        out
    }

    fn into_artifact(self) -> FinancialPlan {
        FinancialPlan {
            ideal_budget: self.orcamento_ideal.map(LlmBudget::into_split).unwrap_or_default(),
            suggested_spend: self
                .gastos_categoria
                .map(LlmBudget::into_split)
                .unwrap_or_default(),
            monthly_savings_target: self.valor_guardar.unwrap_or_default(),
            reduction_actions: trimmed(self.acoes_reducao),
            goal_plan: text_or_empty(self.plano_objetivo),
            debt_strategy: text_or_empty(self.estrategia_dividas),
            mistakes_to_avoid: trimmed(self.erros_evitar),
            closing_message: text_or_empty(self.mensagem_final),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmGoal {
    #[serde(default, deserialize_with = "lenient::text")]
    pub nome: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub valor_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub valor_mensal: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub prazo_ideal: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub justificativa: Option<String>,
}

impl LlmGoal {
    fn is_emergency_fund(&self) -> bool {
        self.nome.as_deref().is_some_and(is_emergency_fund_name)
    }

    fn into_goal(self) -> Goal {
        Goal {
            id: None,
            name: text_or_empty(self.nome),
            total_amount: self.valor_total.unwrap_or_default(),
            monthly_amount: self.valor_mensal.unwrap_or_default(),
            ideal_timeframe: text_or_empty(self.prazo_ideal),
            rationale: text_or_empty(self.justificativa),
            saved_amount: 0.0,
            progress_pct: 0,
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmGoals {
    #[serde(default, deserialize_with = "lenient::object_list")]
    pub metas: Vec<LlmGoal>,
}

impl LlmGoals {
    /// Moves the emergency-fund goal to the front when the model listed it elsewhere.
    pub fn promote_emergency_fund(&mut self) {
        if let Some(idx) = self.metas.iter().position(LlmGoal::is_emergency_fund) {
            if idx > 0 {
                let goal = self.metas.remove(idx);
                self.metas.insert(0, goal);
            }
        }
    }
}

impl Contract for LlmGoals {
    type Artifact = Vec<Goal>;

    const NAME: &'static str = "goals";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.metas.is_empty() {
            out.push("metas must be a non-empty array".to_string());
            return out;
        }
        if !self.metas.iter().any(LlmGoal::is_emergency_fund) {
            out.push("metas must include an emergency-fund goal".to_string());
        }
        for (i, goal) in self.metas.iter().enumerate() {
            require_text(&mut out, &format!("metas[{i}].nome"), &goal.nome);
            require_amount(&mut out, &format!("metas[{i}].valor_total"), goal.valor_total, true);
            require_amount(&mut out, &format!("metas[{i}].valor_mensal"), goal.valor_mensal, true);
            require_text(&mut out, &format!("metas[{i}].prazo_ideal"), &goal.prazo_ideal);
            require_text(&mut out, &format!("metas[{i}].justificativa"), &goal.justificativa);
        }
        out
    }

    fn into_artifact(mut self) -> Vec<Goal> {
        self.promote_emergency_fund();
        self.metas.into_iter().map(LlmGoal::into_goal).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmChecklist {
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub diarias: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub semanais: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text_list")]
    pub mensais: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub acao_unica: Option<String>,
}

impl Contract for LlmChecklist {
    type Artifact = Checklist;

    const NAME: &'static str = "checklist";

    fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        require_len(&mut out, "diarias", &self.diarias, DAILY_ACTIONS);
        require_len(&mut out, "semanais", &self.semanais, WEEKLY_ACTIONS);
        require_len(&mut out, "mensais", &self.mensais, MONTHLY_ACTIONS);
        require_text(&mut out, "acao_unica", &self.acao_unica);
        out
    }

    fn into_artifact(self) -> Checklist {
        Checklist {
            daily_actions: trimmed(self.diarias),
            weekly_actions: trimmed(self.semanais),
            monthly_actions: trimmed(self.mensais),
            one_time_action: text_or_empty(self.acao_unica),
        }
    }
}
