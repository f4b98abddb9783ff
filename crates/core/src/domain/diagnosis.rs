use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Label used inside Portuguese prompts and in the provider contract.
    pub fn label_pt(self) -> &'static str {
        match self {
            RiskLevel::Low => "baixo",
            RiskLevel::Medium => "médio",
            RiskLevel::High => "alto",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baixo" | "low" => Ok(RiskLevel::Low),
            "médio" | "medio" | "medium" => Ok(RiskLevel::Medium),
            "alto" | "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub current_situation: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub risk_level: Option<RiskLevel>,
    pub opportunities: Vec<String>,
    pub closing_message: String,
}

impl Diagnosis {
    pub fn is_blank(&self) -> bool {
        self.current_situation.trim().is_empty()
            && self.strengths.is_empty()
            && self.weaknesses.is_empty()
            && self.risk_level.is_none()
            && self.opportunities.is_empty()
            && self.closing_message.trim().is_empty()
    }
}
