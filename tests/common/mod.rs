#![allow(dead_code)]

use axum::Router;
use chrono::{DateTime, Utc};
use tempfile::TempDir;

use studyplan_backend::db::{self, Db};

pub struct TestDb {
    pub db: Db,
    _temp_dir: TempDir,
}

pub async fn create_test_db() -> TestDb {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let db = Db::connect(&temp_dir.path().join("test.db"))
        .await
        .expect("failed to open test database");

    TestDb {
        db,
        _temp_dir: temp_dir,
    }
}

pub async fn create_test_app() -> (Router, TestDb) {
    let ctx = create_test_db().await;
    let app = studyplan_backend::create_app(ctx.db.clone());
    (app, ctx)
}

pub async fn seed_topic(db: &Db, id: &str, title: &str, position: i64) {
    sqlx::query(r#"INSERT INTO "topics" ("id", "title", "position") VALUES ($1, $2, $3)"#)
        .bind(id)
        .bind(title)
        .bind(position)
        .execute(db.pool())
        .await
        .expect("failed to seed topic");
}

pub async fn seed_question(db: &Db, id: &str, topic_id: &str, text: &str, correct: &str) {
    sqlx::query(
        r#"
        INSERT INTO "topic_questions" ("id", "topicId", "text", "correctChoice", "position")
        VALUES ($1, $2, $3, $4, 0)
        "#,
    )
    .bind(id)
    .bind(topic_id)
    .bind(text)
    .bind(correct)
    .execute(db.pool())
    .await
    .expect("failed to seed question");
}

pub async fn mark_topic_mastered(db: &Db, learner_id: &str, topic_id: &str) {
    sqlx::query(
        r#"
        INSERT INTO "topic_progress"
          ("id", "learnerId", "topicId", "watchProgress", "watchComplete", "testScore", "mastered", "updatedAt")
        VALUES ($1, $2, $3, 100, 1, 100, 1, $4)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(learner_id)
    .bind(topic_id)
    .bind(db::format_timestamp(Utc::now()))
    .execute(db.pool())
    .await
    .expect("failed to seed mastered progress");
}

pub async fn seed_review_item(
    db: &Db,
    id: &str,
    learner_id: &str,
    topic_id: &str,
    stage: i64,
    next_due: DateTime<Utc>,
    active: bool,
) {
    sqlx::query(
        r#"
        INSERT INTO "review_items"
          ("id", "learnerId", "topicId", "stage", "nextDueAt", "isActive", "wrongTotal", "lastWrongAt")
        VALUES ($1, $2, $3, $4, $5, $6, 0, NULL)
        "#,
    )
    .bind(id)
    .bind(learner_id)
    .bind(topic_id)
    .bind(stage)
    .bind(db::format_timestamp(next_due))
    .bind(active)
    .execute(db.pool())
    .await
    .expect("failed to seed review item");
}
