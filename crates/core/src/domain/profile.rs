use anyhow::ensure;
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEFRAME: &str = "1 ano";

/// Questionnaire answers for one respondent. Read by every generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(alias = "renda")]
    pub monthly_income: f64,
    #[serde(alias = "gastos")]
    pub monthly_expenses: f64,
    #[serde(default, alias = "dividas")]
    pub total_debt: f64,
    #[serde(alias = "objetivo")]
    pub primary_goal: String,
    #[serde(default = "default_timeframe", alias = "prazo")]
    pub target_timeframe: String,
    #[serde(default, alias = "dificuldade")]
    pub stated_difficulty: String,
    #[serde(default, alias = "guardaMes")]
    pub monthly_savings_amount: f64,
}

fn default_timeframe() -> String {
    DEFAULT_TIMEFRAME.to_string()
}

impl Profile {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (field, value) in [
            ("monthly_income", self.monthly_income),
            ("monthly_expenses", self.monthly_expenses),
            ("total_debt", self.total_debt),
            ("monthly_savings_amount", self.monthly_savings_amount),
        ] {
            ensure!(value.is_finite(), "{field} must be a finite number");
            ensure!(value >= 0.0, "{field} must be >= 0 (got {value})");
        }

        ensure!(
            !self.primary_goal.trim().is_empty(),
            "primary_goal must be non-empty"
        );
        Ok(())
    }

    /// Stricter precondition used by checklist generation: income and expenses must be
    /// actually answered, not left at zero.
    pub fn require_complete(&self) -> anyhow::Result<()> {
        self.validate()?;
        ensure!(self.monthly_income > 0.0, "monthly_income is required");
        ensure!(self.monthly_expenses > 0.0, "monthly_expenses is required");
        Ok(())
    }

    pub fn timeframe(&self) -> &str {
        let t = self.target_timeframe.trim();
        if t.is_empty() {
            DEFAULT_TIMEFRAME
        } else {
            t
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_profile() -> Profile {
    Profile {
        monthly_income: 5000.0,
        monthly_expenses: 4000.0,
        total_debt: 2000.0,
        primary_goal: "comprar um carro".to_string(),
        target_timeframe: "2 anos".to_string(),
        stated_difficulty: "controlar gastos".to_string(),
        monthly_savings_amount: 300.0,
    }
}
