use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use super::{
    validate_flag_input, AuditHistoryResponse, FlagListResponse, RollbackRequest,
    UpsertFlagRequest,
};
use crate::models::Flag;
use crate::routes::actor::Actor;
use crate::routes::error::ApiError;
use crate::state::AppState;

/// List all flags ordered by key
pub async fn list(State(state): State<AppState>) -> Result<Json<FlagListResponse>, ApiError> {
    let flags = state.service.list_flags().await?;
    Ok(Json(FlagListResponse { flags }))
}

/// Get a single flag by key
pub async fn get(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Flag>, ApiError> {
    match state.service.get_flag(&key).await? {
        Some(flag) => Ok(Json(flag)),
        None => Err(ApiError::NotFound("flag-not-found")),
    }
}

/// Create or replace a flag; the key comes from the body
pub async fn create(
    State(state): State<AppState>,
    Actor(actor): Actor,
    payload: Result<Json<UpsertFlagRequest>, JsonRejection>,
) -> Result<Json<Flag>, ApiError> {
    let Json(payload) = payload?;
    let key = payload
        .key
        .clone()
        .ok_or_else(|| ApiError::BadRequest("Flag key is required".to_string()))?;

    save(&state, &actor, payload, key).await
}

/// Create or replace a flag; the key comes from the path
pub async fn update(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(key): Path<String>,
    payload: Result<Json<UpsertFlagRequest>, JsonRejection>,
) -> Result<Json<Flag>, ApiError> {
    let Json(payload) = payload?;
    save(&state, &actor, payload, key).await
}

async fn save(
    state: &AppState,
    actor: &str,
    payload: UpsertFlagRequest,
    key: String,
) -> Result<Json<Flag>, ApiError> {
    let input = payload.into_input(key);
    validate_flag_input(&input).map_err(ApiError::BadRequest)?;

    let flag = state.service.upsert_flag(actor, input).await?;
    Ok(Json(flag))
}

/// Restore a flag to a version recorded in its audit history
pub async fn rollback(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(key): Path<String>,
    payload: Result<Json<RollbackRequest>, JsonRejection>,
) -> Result<Json<Flag>, ApiError> {
    let Json(payload) = payload?;

    match state
        .service
        .rollback_flag(&actor, &key, payload.to_version)
        .await?
    {
        Some(flag) => Ok(Json(flag)),
        None => Err(ApiError::NotFound("version-not-found")),
    }
}

/// Audit entries for a flag, newest first
pub async fn history(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<AuditHistoryResponse>, ApiError> {
    let entries = state.service.flag_history(&key).await?;
    Ok(Json(AuditHistoryResponse { entries }))
}
