use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthData {
    ok: bool,
}

pub async fn health() -> Json<HealthData> {
    Json(HealthData { ok: true })
}
