use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod actor;
pub mod error;
mod eval;
mod flags;
mod health;

pub use health::health;

use crate::state::AppState;

const MAX_BODY_BYTES: usize = 256 * 1024;

pub fn routes() -> Router<AppState> {
    let eval_router = Router::new()
        .route("/eval", post(eval::routes::evaluate))
        .route("/eval/batch", post(eval::routes::evaluate_batch));

    let flag_router = Router::new()
        .route("/", get(flags::routes::list).post(flags::routes::create))
        .route(
            "/{key}",
            get(flags::routes::get).put(flags::routes::update),
        )
        .route("/{key}/rollback", post(flags::routes::rollback))
        .route("/{key}/audit", get(flags::routes::history));

    Router::new()
        .route("/health", get(health))
        .nest("/api/eval", eval_router)
        .nest("/api/manage/flags", flag_router)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
