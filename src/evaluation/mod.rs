pub mod hash;
pub mod rollout;
pub mod rules;

use serde_json::Value;
use std::str::FromStr;

use crate::models::{
    Environment, EvaluationContext, EvaluationReason, EvaluationResult, Flag, FlagType,
};

pub use hash::deterministic_hash;
pub use rollout::{passes_rollout, pick_variant, version_salt};
pub use rules::matches_rules;

/// What to serve when a flag has no configuration for the requested env
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvFallback {
    /// Serve the default of the flag's first configured env
    #[default]
    FirstEnv,
    /// Serve `null`
    Null,
}

impl FromStr for EnvFallback {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first-env" => Ok(EnvFallback::FirstEnv),
            "null" => Ok(EnvFallback::Null),
            other => Err(format!(
                "unknown env fallback '{}', expected 'first-env' or 'null'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EvaluationOptions {
    pub env_fallback: EnvFallback,
}

/// Evaluate a flag for `env` and `context` with default options
pub fn evaluate(flag: &Flag, env: Environment, context: &EvaluationContext) -> EvaluationResult {
    evaluate_with_options(flag, env, context, EvaluationOptions::default())
}

/// Evaluate a flag for `env` and `context`.
///
/// Pure and total: never fails for a deserialized flag. Decision order:
/// 1. missing env config
/// 2. targeting rules
/// 3. percentage rollout
/// 4. multivariate / json variant selection
/// 5. env default
pub fn evaluate_with_options(
    flag: &Flag,
    env: Environment,
    context: &EvaluationContext,
    options: EvaluationOptions,
) -> EvaluationResult {
    // Step 1: No config for this env
    let env_config = match flag.env_config(env) {
        Some(config) => config,
        None => {
            let value = match options.env_fallback {
                EnvFallback::FirstEnv => flag
                    .envs
                    .first()
                    .map(|e| e.default_value.clone())
                    .unwrap_or(Value::Null),
                EnvFallback::Null => Value::Null,
            };
            return EvaluationResult::new(&flag.key, value, EvaluationReason::EnvMissingFallback);
        }
    };

    // Step 2: Targeting rules (AND)
    if let Some(rules) = &env_config.rules {
        if !rules.is_empty() && !matches_rules(rules, context) {
            return EvaluationResult::new(
                &flag.key,
                env_config.default_value.clone(),
                EvaluationReason::RulesNoMatchFallback,
            );
        }
    }

    // Step 3: Percentage rollout
    if let Some(rollout) = &env_config.rollout {
        if !passes_rollout(rollout, &flag.key, flag.version, env, context) {
            return EvaluationResult::new(
                &flag.key,
                env_config.default_value.clone(),
                EvaluationReason::RolloutPercentageFallback,
            );
        }
    }

    // Step 4: Variants
    let variants = env_config.variants.as_deref().unwrap_or(&[]);
    let salt_base = version_salt(&flag.key, flag.version, env);
    match flag.flag_type {
        FlagType::Multivariate => {
            if let Some(chosen) = pick_variant(variants, &salt_base, context) {
                let value = chosen
                    .value
                    .clone()
                    .unwrap_or_else(|| Value::String(chosen.key.clone()));
                return EvaluationResult::new(&flag.key, value, EvaluationReason::VariantSelected)
                    .with_variant(&chosen.key);
            }
        }
        FlagType::Json => {
            if let Some(chosen) = pick_variant(variants, &salt_base, context) {
                let value = chosen
                    .value
                    .clone()
                    .unwrap_or_else(|| env_config.default_value.clone());
                return EvaluationResult::new(&flag.key, value, EvaluationReason::JsonSelected)
                    .with_variant(&chosen.key);
            }
        }
        FlagType::Boolean => {}
    }

    // Step 5: Default
    EvaluationResult::new(
        &flag.key,
        env_config.default_value.clone(),
        EvaluationReason::Default,
    )
}
