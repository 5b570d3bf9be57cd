use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::auth;
use crate::response::AppError;
use crate::services::engagement;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(my_stats))
}

async fn my_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let stats = engagement::stats(state.db(), &learner.id).await;
    Ok(Json(SuccessResponse {
        success: true,
        data: stats,
    }))
}
