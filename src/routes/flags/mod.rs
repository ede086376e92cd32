pub mod routes;

use serde::{Deserialize, Serialize};

use crate::models::{AuditLogEntry, EnvConfig, Flag, FlagInput, FlagType};

// MODELS

#[derive(Debug, Deserialize)]
pub struct UpsertFlagRequest {
    pub key: Option<String>,
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    pub envs: Vec<EnvConfig>,
    pub description: Option<String>,
}

impl UpsertFlagRequest {
    pub fn into_input(self, key: String) -> FlagInput {
        FlagInput {
            key,
            flag_type: self.flag_type,
            envs: self.envs,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackRequest {
    pub to_version: i64,
}

#[derive(Debug, Serialize)]
pub struct FlagListResponse {
    pub flags: Vec<Flag>,
}

#[derive(Debug, Serialize)]
pub struct AuditHistoryResponse {
    pub entries: Vec<AuditLogEntry>,
}

// HELPER FUNCTIONS

// Validating the flag key
pub fn validate_flag_key(key: &str) -> Result<(), String> {
    let first = match key.chars().next() {
        Some(c) => c,
        None => return Err("Flag key cannot be empty".to_string()),
    };

    if key.len() > 64 {
        return Err("Flag key is too long (Max: 64 characters)".to_string());
    }

    if !first.is_ascii_alphabetic() {
        return Err("Flag key must start with a letter".to_string());
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(
            "Flag key can only contain lowercase letters, numbers, underscores and hyphens"
                .to_string(),
        );
    }

    Ok(())
}

// Checks if percentage number is between 0 and 100 inclusive
pub fn validate_rollout_percentage(percentage: f64) -> Result<(), String> {
    if !(0.0..=100.0).contains(&percentage) {
        return Err("Rollout percentage must be between 0 and 100".to_string());
    }

    Ok(())
}

pub fn validate_variant_weight(weight: f64) -> Result<(), String> {
    if !weight.is_finite() || weight < 0.0 {
        return Err("Variant weight must be a non-negative number".to_string());
    }

    Ok(())
}

/// Validate a flag definition before it reaches the store
pub fn validate_flag_input(input: &FlagInput) -> Result<(), String> {
    validate_flag_key(&input.key)?;

    if input.envs.is_empty() {
        return Err("Flag must configure at least one environment".to_string());
    }

    for env in &input.envs {
        if let Some(rollout) = &env.rollout {
            validate_rollout_percentage(rollout.percentage)?;
        }
        for variant in env.variants.iter().flatten() {
            if variant.key.trim().is_empty() {
                return Err(format!("Variant key cannot be empty (env '{}')", env.env));
            }
            if let Some(weight) = variant.weight {
                validate_variant_weight(weight)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Environment, PercentageRollout, VariantOption};
    use serde_json::json;

    fn input(envs: Vec<EnvConfig>) -> FlagInput {
        FlagInput {
            key: "new-ui".to_string(),
            flag_type: FlagType::Multivariate,
            envs,
            description: None,
        }
    }

    fn env(rollout: Option<f64>, weights: &[Option<f64>]) -> EnvConfig {
        EnvConfig {
            env: Environment::Prod,
            default_value: json!("control"),
            rules: None,
            rollout: rollout.map(|percentage| PercentageRollout {
                percentage,
                salt: None,
            }),
            variants: Some(
                weights
                    .iter()
                    .enumerate()
                    .map(|(i, w)| VariantOption {
                        key: format!("v{}", i),
                        weight: *w,
                        value: None,
                    })
                    .collect(),
            ),
        }
    }

    #[test]
    fn test_validate_flag_key() {
        assert!(validate_flag_key("new-ui").is_ok());
        assert!(validate_flag_key("checkout_v2").is_ok());
        assert!(validate_flag_key("").is_err());
        assert!(validate_flag_key("2fast").is_err());
        assert!(validate_flag_key("NewUI").is_err());
        assert!(validate_flag_key(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_rollout_percentage() {
        assert!(validate_rollout_percentage(0.0).is_ok());
        assert!(validate_rollout_percentage(100.0).is_ok());
        assert!(validate_rollout_percentage(33.3).is_ok());
        assert!(validate_rollout_percentage(-1.0).is_err());
        assert!(validate_rollout_percentage(100.5).is_err());
    }

    #[test]
    fn test_validate_flag_input() {
        assert!(validate_flag_input(&input(vec![env(Some(50.0), &[Some(1.0), None])])).is_ok());
        assert!(validate_flag_input(&input(vec![env(None, &[Some(0.0), Some(0.0)])])).is_ok());
        assert!(validate_flag_input(&input(vec![])).is_err());
        assert!(validate_flag_input(&input(vec![env(Some(150.0), &[])])).is_err());
        assert!(validate_flag_input(&input(vec![env(None, &[Some(-2.0)])])).is_err());
    }

    #[test]
    fn test_put_body_may_omit_key() {
        let request: UpsertFlagRequest = serde_json::from_value(json!({
            "type": "boolean",
            "envs": [{ "env": "dev", "defaultValue": true }]
        }))
        .unwrap();
        let flag_input = request.into_input("from-path".to_string());
        assert_eq!(flag_input.key, "from-path");
    }
}
