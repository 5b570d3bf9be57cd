use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::response::AppError;
use crate::services::mastery::{self, SubmittedAnswer};
use crate::services::topics;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatchProgressRequest {
    progress: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestSubmitRequest {
    answers: Vec<SubmittedAnswer>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_topics))
        .route("/:topicId", get(topic_detail))
        .route("/:topicId/watch-progress", post(watch_progress))
        .route("/:topicId/test", post(submit_test))
}

async fn list_topics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    auth::require_learner(&headers)?;

    let topics = topics::list_topics(state.db()).await?;
    Ok(Json(SuccessResponse {
        success: true,
        data: topics,
    }))
}

async fn topic_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(topic_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let detail = topics::topic_detail(state.db(), &learner.id, &topic_id).await?;
    Ok(Json(SuccessResponse {
        success: true,
        data: detail,
    }))
}

async fn watch_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(topic_id): Path<String>,
    Json(payload): Json<WatchProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let outcome =
        mastery::record_watch_progress(state.db(), &learner.id, &topic_id, payload.progress)
            .await?;

    Ok(Json(SuccessResponse {
        success: true,
        data: outcome,
    }))
}

async fn submit_test(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(topic_id): Path<String>,
    Json(payload): Json<TestSubmitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let outcome =
        mastery::record_test_submission(state.db(), &learner.id, &topic_id, &payload.answers)
            .await?;

    Ok(Json(SuccessResponse {
        success: true,
        data: outcome,
    }))
}
