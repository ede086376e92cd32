pub mod routes;

use serde::{Deserialize, Serialize};

use crate::models::{Environment, EvaluationContext, EvaluationResult};

// MODELS

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub key: String,
    pub env: Environment,
    #[serde(default)]
    pub context: Option<EvaluationContext>,
}

#[derive(Debug, Deserialize)]
pub struct BatchEvaluateRequest {
    pub keys: Vec<String>,
    pub env: Environment,
    #[serde(default)]
    pub context: Option<EvaluationContext>,
}

#[derive(Debug, Serialize)]
pub struct BatchEvaluateResponse {
    pub results: Vec<EvaluationResult>,
}
