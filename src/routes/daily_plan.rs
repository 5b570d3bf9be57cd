use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::response::AppError;
use crate::scheduler::plan::PlanItemKind;
use crate::services::daily_plan;
use crate::state::AppState;

#[derive(Serialize)]
struct SuccessResponse<T> {
    success: bool,
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanQuery {
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignItemRequest {
    date: Option<NaiveDate>,
    kind: String,
    title: Option<String>,
    topic_id: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/today", get(today_plan))
        .route("/items", post(assign_item))
        .route("/items/:itemId/done", post(mark_item_done))
}

async fn today_plan(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PlanQuery>,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let now = Utc::now();
    let date = query.date.unwrap_or_else(|| now.date_naive());

    let plan = daily_plan::get_or_build_plan(state.db(), &learner.id, date, now).await?;
    Ok(Json(SuccessResponse {
        success: true,
        data: plan,
    }))
}

async fn mark_item_done(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let today = Utc::now().date_naive();
    let result = daily_plan::mark_item_done(state.db(), &learner.id, &item_id, today).await?;

    Ok(Json(SuccessResponse {
        success: true,
        data: result,
    }))
}

async fn assign_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AssignItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let learner = auth::require_learner(&headers)?;

    let kind = PlanItemKind::parse(&payload.kind)
        .ok_or_else(|| AppError::validation(format!("unknown plan item kind: {}", payload.kind)))?;

    let now = Utc::now();
    let date = payload.date.unwrap_or_else(|| now.date_naive());

    let item = daily_plan::assign_item(
        state.db(),
        &learner.id,
        date,
        kind,
        payload.title,
        payload.topic_id,
        now,
    )
    .await?;

    Ok(Json(SuccessResponse {
        success: true,
        data: item,
    }))
}
