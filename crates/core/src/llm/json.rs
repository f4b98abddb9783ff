use crate::domain::contract::Contract;
use anyhow::Context;
use serde_json::{Map, Value};
use std::str::FromStr;

/// How provider output that misses its contract is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NormalizePolicy {
    /// Unparseable output becomes a blank artifact and contract violations are only logged.
    #[default]
    Lenient,
    /// Unparseable output and contract violations are errors.
    Strict,
}

impl FromStr for NormalizePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(NormalizePolicy::Lenient),
            "strict" => Ok(NormalizePolicy::Strict),
            other => anyhow::bail!("unknown normalize policy: {other}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("{artifact} output is not a JSON object: {detail}")]
    Parse {
        artifact: &'static str,
        detail: String,
    },

    #[error("{artifact} output violates its contract: {}", .violations.join("; "))]
    Schema {
        artifact: &'static str,
        violations: Vec<String>,
    },
}

impl NormalizeError {
    pub fn code(&self) -> &'static str {
        match self {
            NormalizeError::Parse { .. } => "malformed_output",
            NormalizeError::Schema { .. } => "contract_violation",
        }
    }
}

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.splitn(2, '\n').nth(1) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

pub fn parse_object(text: &str) -> anyhow::Result<Map<String, Value>> {
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let value = serde_json::from_str::<Value>(&json_str)
        .with_context(|| format!("LLM output is not valid JSON: {json_str}"))?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("LLM output is JSON but not an object: {other}"),
    }
}

/// Legacy degrade: anything that does not parse as an object becomes `{}`.
pub fn parse_object_or_empty(text: &str) -> Map<String, Value> {
    parse_object(text).unwrap_or_default()
}

pub fn normalize<C: Contract>(
    text: &str,
    policy: NormalizePolicy,
) -> Result<C::Artifact, NormalizeError> {
    let object = match parse_object(text) {
        Ok(object) => Some(object),
        Err(err) => {
            if policy == NormalizePolicy::Strict {
                return Err(NormalizeError::Parse {
                    artifact: C::NAME,
                    detail: format!("{err:#}"),
                });
            }
            tracing::warn!(
                artifact = C::NAME,
                error = %err,
                "LLM output unparseable; degrading to empty artifact"
            );
            None
        }
    };

    let Some(object) = object else {
        return Ok(C::default().into_artifact());
    };

    let contract = serde_json::from_value::<C>(Value::Object(object)).map_err(|e| {
        NormalizeError::Parse {
            artifact: C::NAME,
            detail: e.to_string(),
        }
    })?;

    let violations = contract.violations();
    if !violations.is_empty() {
        if policy == NormalizePolicy::Strict {
            return Err(NormalizeError::Schema {
                artifact: C::NAME,
                violations,
            });
        }
        tracing::warn!(
            artifact = C::NAME,
            violations = ?violations,
            "LLM output violates contract; passing through"
        );
    }

    Ok(contract.into_artifact())
}
