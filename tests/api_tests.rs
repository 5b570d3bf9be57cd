mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use common::{create_test_app, seed_question, seed_topic};

const AUTH: &str = "Bearer learner-1";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, AUTH)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, AUTH)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let (app, _ctx) = create_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/plan/today")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("UNAUTHORIZED"));
}

#[tokio::test]
async fn unknown_routes_fall_back_to_the_error_envelope() {
    let (app, _ctx) = create_test_app().await;

    let response = app.oneshot(get("/api/nope")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn health_reports_connected_database() {
    let (app, _ctx) = create_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["database"], json!("connected"));
}

#[tokio::test]
async fn watch_progress_round_trip_clamps_and_returns_the_snapshot() {
    let (app, ctx) = create_test_app().await;
    seed_topic(&ctx.db, "t1", "Fractions", 1).await;

    let response = app
        .oneshot(post_json(
            "/api/topics/t1/watch-progress",
            &json!({ "progress": 150 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["watchProgress"], json!(100));
    assert_eq!(body["data"]["watchComplete"], json!(true));
    assert_eq!(body["data"]["mastered"], json!(false));
}

#[tokio::test]
async fn empty_test_submissions_are_a_validation_error() {
    let (app, ctx) = create_test_app().await;
    seed_topic(&ctx.db, "t1", "Fractions", 1).await;

    let response = app
        .oneshot(post_json("/api/topics/t1/test", &json!({ "answers": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_submission_flows_through_to_the_due_review_list() {
    let (app, ctx) = create_test_app().await;
    seed_topic(&ctx.db, "t1", "Fractions", 1).await;
    seed_question(&ctx.db, "q1", "t1", "1/2 + 1/4 = ?", "B").await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/topics/t1/test",
            &json!({ "answers": [{ "questionId": "q1", "answer": "C" }] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["score"], json!(0.0));
    assert_eq!(body["data"]["wrong"], json!(1));

    let response = app.oneshot(get("/api/reviews/due")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let due = body["data"].as_array().expect("due list missing");
    assert_eq!(due.len(), 1);
    assert_eq!(due[0]["topicId"], json!("t1"));
    assert_eq!(due[0]["stage"], json!(0));
}

#[tokio::test]
async fn plan_endpoint_builds_and_returns_ordered_items() {
    let (app, ctx) = create_test_app().await;
    seed_topic(&ctx.db, "t1", "Fractions", 1).await;

    let response = app.clone().oneshot(get("/api/plan/today")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let items = body["data"]["items"].as_array().expect("items missing");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["kind"], json!("new_topic"));
    assert_eq!(items[1]["kind"], json!("mini_test"));
    assert_eq!(body["data"]["completionRate"], json!(0));

    // marking the first item through the API updates the aggregate
    let item_id = items[0]["id"].as_str().unwrap().to_string();
    let response = app
        .oneshot(post_json(
            &format!("/api/plan/items/{item_id}/done"),
            &json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["completionRate"], json!(50));
    assert_eq!(body["data"]["isCompleted"], json!(false));
}

#[tokio::test]
async fn stats_endpoint_defaults_to_zeros() {
    let (app, _ctx) = create_test_app().await;

    let response = app.oneshot(get("/api/me/stats")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["xp"], json!(0));
    assert_eq!(body["data"]["streak"], json!(0));
}

#[tokio::test]
async fn unknown_plan_item_kinds_are_rejected() {
    let (app, _ctx) = create_test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/plan/items",
            &json!({ "kind": "video", "title": "Watch intro" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
}
