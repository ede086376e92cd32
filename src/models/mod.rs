//! Flag documents, audit records and evaluation inputs/outputs.

pub mod audit;
pub mod context;
pub mod flag;

pub use audit::{AuditAction, AuditData, AuditLogEntry, EntityType, RollbackRecord};
pub use context::{ContextValue, EvaluationContext};
pub use flag::{
    EnvConfig, Environment, Flag, FlagInput, FlagType, PercentageRollout, RuleOp, RuleValue,
    TargetRule, VariantOption,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why an evaluation produced its value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationReason {
    EnvMissingFallback,
    RulesNoMatchFallback,
    RolloutPercentageFallback,
    VariantSelected,
    JsonSelected,
    Default,
    FlagNotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub key: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub reason: EvaluationReason,
}

impl EvaluationResult {
    pub fn new(key: &str, value: Value, reason: EvaluationReason) -> Self {
        Self {
            key: key.to_string(),
            value,
            variant: None,
            reason,
        }
    }

    pub fn with_variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    /// Batch placeholder for a key the store does not know
    pub fn not_found(key: &str) -> Self {
        Self::new(key, Value::Null, EvaluationReason::FlagNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reason_codes_are_stable() {
        let codes: Vec<Value> = [
            EvaluationReason::EnvMissingFallback,
            EvaluationReason::RulesNoMatchFallback,
            EvaluationReason::RolloutPercentageFallback,
            EvaluationReason::VariantSelected,
            EvaluationReason::JsonSelected,
            EvaluationReason::Default,
            EvaluationReason::FlagNotFound,
        ]
        .iter()
        .map(|r| serde_json::to_value(r).unwrap())
        .collect();

        assert_eq!(
            codes,
            vec![
                json!("env-missing-fallback"),
                json!("rules-no-match-fallback"),
                json!("rollout-percentage-fallback"),
                json!("variant-selected"),
                json!("json-selected"),
                json!("default"),
                json!("flag-not-found"),
            ]
        );
    }

    #[test]
    fn test_not_found_result_shape() {
        let encoded = serde_json::to_value(EvaluationResult::not_found("ghost")).unwrap();
        assert_eq!(encoded, json!({ "key": "ghost", "value": null, "reason": "flag-not-found" }));
    }
}
