use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::response::AppError;
use crate::services::review;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteReviewRequest {
    score: Option<f64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/due", get(due_reviews))
        .route("/:reviewId/complete", post(complete_review))
}

async fn due_reviews(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let due = review::due_items(state.db(), &learner.id, Utc::now()).await?;
    Ok(Json(SuccessResponse {
        success: true,
        data: due,
    }))
}

async fn complete_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(review_id): Path<String>,
    Json(payload): Json<CompleteReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let score = payload.score.unwrap_or(0.0);
    let completion = review::complete_review(state.db(), &learner.id, &review_id, score).await?;

    Ok(Json(SuccessResponse {
        success: true,
        data: completion,
    }))
}
