use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name the model is told to use for the mandatory first goal.
pub const EMERGENCY_FUND_NAME: &str = "Reserva de Emergência";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// `None` for goals that were generated but never persisted.
    pub id: Option<Uuid>,
    pub name: String,
    pub total_amount: f64,
    pub monthly_amount: f64,
    pub ideal_timeframe: String,
    pub rationale: String,
    #[serde(default)]
    pub saved_amount: f64,
    #[serde(default)]
    pub progress_pct: u8,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

impl Goal {
    pub fn with_saved_amount(mut self, saved_amount: f64) -> Self {
        self.saved_amount = saved_amount;
        self.progress_pct = progress_pct(saved_amount, self.total_amount);
        self
    }

    pub fn is_emergency_fund(&self) -> bool {
        is_emergency_fund_name(&self.name)
    }
}

pub fn is_emergency_fund_name(name: &str) -> bool {
    let name = name.to_lowercase();
    name.contains("emergência") || name.contains("emergencia") || name.contains("emergency")
}

/// `min(100, round(saved / total * 100))`; a zero or invalid total yields 0.
pub fn progress_pct(saved: f64, total: f64) -> u8 {
    if !(total.is_finite() && total > 0.0) || !saved.is_finite() {
        return 0;
    }
    let pct = (saved.max(0.0) / total * 100.0).round();
    pct.min(100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_rounded_and_clamped() {
        assert_eq!(progress_pct(0.0, 1000.0), 0);
        assert_eq!(progress_pct(500.0, 1000.0), 50);
        assert_eq!(progress_pct(1200.0, 1000.0), 100);
        assert_eq!(progress_pct(333.0, 1000.0), 33);
        assert_eq!(progress_pct(666.0, 1000.0), 67);
    }

    #[test]
    fn progress_with_zero_total_is_zero() {
        assert_eq!(progress_pct(0.0, 0.0), 0);
        assert_eq!(progress_pct(50.0, 0.0), 0);
        assert_eq!(progress_pct(-10.0, 100.0), 0);
    }

    #[test]
    fn saved_amount_update_recomputes_progress() {
        let goal = Goal {
            id: None,
            name: EMERGENCY_FUND_NAME.to_string(),
            total_amount: 12000.0,
            monthly_amount: 1000.0,
            ideal_timeframe: "12 meses".to_string(),
            rationale: "segurança".to_string(),
            saved_amount: 0.0,
            progress_pct: 99,
            deadline: None,
        };

        let goal = goal.with_saved_amount(3000.0);
        assert_eq!(goal.progress_pct, 25);
        assert!(goal.is_emergency_fund());
    }

    #[test]
    fn emergency_fund_name_matching() {
        assert!(is_emergency_fund_name("Reserva de emergencia"));
        assert!(is_emergency_fund_name("Emergency fund"));
        assert!(!is_emergency_fund_name("Comprar um carro"));
    }
}
