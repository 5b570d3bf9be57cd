mod daily_plan;
mod health;
mod reviews;
mod stats;
mod topics;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/topics", topics::router())
        .nest("/api/reviews", reviews::router())
        .nest("/api/plan", daily_plan::router())
        .nest("/api/me", stats::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
