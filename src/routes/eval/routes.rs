use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use super::{BatchEvaluateRequest, BatchEvaluateResponse, EvaluateRequest};
use crate::models::EvaluationResult;
use crate::routes::error::ApiError;
use crate::state::AppState;

/// Evaluate a single flag for an environment and context
pub async fn evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluationResult>, ApiError> {
    let Json(request) = payload?;
    let context = request.context.unwrap_or_default();

    match state
        .service
        .evaluate(&request.key, request.env, &context)
        .await?
    {
        Some(result) => Ok(Json(result)),
        None => Err(ApiError::NotFound("flag-not-found")),
    }
}

/// Evaluate several flags at once; unknown keys are reported per result
pub async fn evaluate_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchEvaluateRequest>, JsonRejection>,
) -> Result<Json<BatchEvaluateResponse>, ApiError> {
    let Json(request) = payload?;
    let context = request.context.unwrap_or_default();

    let results = state
        .service
        .evaluate_batch(&request.keys, request.env, &context)
        .await?;

    Ok(Json(BatchEvaluateResponse { results }))
}
