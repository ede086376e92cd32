use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::context::ContextValue;

// MODELS

/// Deployment environment a flag is configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    Boolean,
    Multivariate,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOp {
    Eq,
    Neq,
    In,
    Nin,
}

/// Right-hand side of a targeting rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    List(Vec<ContextValue>),
    Scalar(ContextValue),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRule {
    pub attribute: String,
    pub op: RuleOp,
    pub value: RuleValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageRollout {
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantOption {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl VariantOption {
    /// Weight used for bucketing, 1 when unspecified
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvConfig {
    pub env: Environment,
    pub default_value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<TargetRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout: Option<PercentageRollout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<VariantOption>>,
}

/// Canonical flag document as owned by the flag store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    pub key: String,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub envs: Vec<EnvConfig>,
    pub version: i64,
    pub created_by: String,
    pub updated_by: String,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Flag {
    /// First configuration registered for `env`
    pub fn env_config(&self, env: Environment) -> Option<&EnvConfig> {
        self.envs.iter().find(|e| e.env == env)
    }
}

/// Caller-supplied flag definition; the store assigns version and bookkeeping fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagInput {
    pub key: String,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub envs: Vec<EnvConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_wire_format() {
        let flag: Flag = serde_json::from_value(json!({
            "key": "new-ui",
            "type": "multivariate",
            "envs": [{
                "env": "prod",
                "defaultValue": "control",
                "rules": [{ "attribute": "country", "op": "in", "value": ["SE", "NO"] }],
                "rollout": { "percentage": 25 },
                "variants": [{ "key": "blue", "weight": 3 }, { "key": "green", "value": { "hex": "#0f0" } }]
            }],
            "version": 4,
            "createdBy": "alice",
            "updatedBy": "bob",
            "updatedAt": 1700000000000i64
        }))
        .unwrap();

        assert_eq!(flag.flag_type, FlagType::Multivariate);
        let prod = flag.env_config(Environment::Prod).unwrap();
        assert_eq!(prod.rollout.as_ref().unwrap().percentage, 25.0);
        assert_eq!(prod.variants.as_ref().unwrap()[1].effective_weight(), 1.0);
        assert!(flag.env_config(Environment::Dev).is_none());

        let encoded = serde_json::to_value(&flag).unwrap();
        assert_eq!(encoded["type"], "multivariate");
        assert_eq!(encoded["envs"][0]["defaultValue"], "control");
        assert_eq!(encoded["updatedBy"], "bob");
        assert!(encoded.get("description").is_none());
    }

    #[test]
    fn test_default_value_is_mandatory() {
        let result: Result<EnvConfig, _> = serde_json::from_value(json!({ "env": "dev" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let result: Result<EnvConfig, _> =
            serde_json::from_value(json!({ "env": "qa", "defaultValue": true }));
        assert!(result.is_err());
    }

    #[test]
    fn test_rule_value_shapes() {
        let scalar: TargetRule =
            serde_json::from_value(json!({ "attribute": "plan", "op": "eq", "value": "pro" }))
                .unwrap();
        assert_eq!(scalar.value, RuleValue::Scalar(ContextValue::String("pro".into())));

        let list: TargetRule =
            serde_json::from_value(json!({ "attribute": "age", "op": "nin", "value": [1, 2] }))
                .unwrap();
        assert_eq!(
            list.value,
            RuleValue::List(vec![ContextValue::Number(1.0), ContextValue::Number(2.0)])
        );

        let bad_op: Result<TargetRule, _> =
            serde_json::from_value(json!({ "attribute": "plan", "op": "gt", "value": 1 }));
        assert!(bad_op.is_err());
    }
}
