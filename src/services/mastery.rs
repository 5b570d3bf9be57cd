use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use crate::db::{self, Db};
use crate::scheduler::grading;
use crate::services::{daily_plan, review, topics, ServiceError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgressOutcome {
    pub watch_progress: i64,
    pub watch_complete: bool,
    pub mastered: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestOutcome {
    pub score: f64,
    pub correct: i64,
    pub total: i64,
    pub wrong: i64,
    pub mastered: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default)]
struct ProgressSnapshot {
    watch_complete: bool,
    test_score: f64,
    mastered: bool,
}

/// Records a watch-progress event. Out-of-range values are clamped, not
/// rejected. When this flips the topic to mastered, today's plan items
/// for the topic are synced as done.
pub async fn record_watch_progress(
    db: &Db,
    learner_id: &str,
    topic_id: &str,
    progress: i64,
) -> Result<WatchProgressOutcome, ServiceError> {
    topics::require_topic(db.pool(), topic_id).await?;

    let clamped = grading::clamp_progress(progress);
    let watch_complete = grading::is_watch_complete(clamped);
    let now = Utc::now();

    let mut tx = db.pool().begin().await.map_err(ServiceError::Sql)?;

    let prior = fetch_progress(&mut tx, learner_id, topic_id)
        .await
        .map_err(ServiceError::Sql)?
        .unwrap_or_default();
    let mastered = prior.mastered || grading::is_mastered(watch_complete, prior.test_score);

    sqlx::query(
        r#"
        INSERT INTO "topic_progress"
          ("id", "learnerId", "topicId", "watchProgress", "watchComplete", "testScore", "mastered", "updatedAt")
        VALUES ($1, $2, $3, $4, $5, 0, $6, $7)
        ON CONFLICT ("learnerId", "topicId") DO UPDATE SET
          "watchProgress" = excluded."watchProgress",
          "watchComplete" = excluded."watchComplete",
          "mastered" = MAX("topic_progress"."mastered", excluded."mastered"),
          "updatedAt" = excluded."updatedAt"
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(learner_id)
    .bind(topic_id)
    .bind(clamped)
    .bind(watch_complete)
    .bind(mastered)
    .bind(db::format_timestamp(now))
    .execute(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    tx.commit().await.map_err(ServiceError::Sql)?;

    if mastered && !prior.mastered {
        notify_topic_mastered(db, learner_id, topic_id, now).await?;
    }

    Ok(WatchProgressOutcome {
        watch_progress: clamped,
        watch_complete,
        mastered,
    })
}

/// Grades a test submission and records the outcome. The latest
/// submission always wins; wrong answers feed the review scheduler in
/// the same unit of work.
pub async fn record_test_submission(
    db: &Db,
    learner_id: &str,
    topic_id: &str,
    answers: &[SubmittedAnswer],
) -> Result<TestOutcome, ServiceError> {
    if answers.is_empty() {
        return Err(ServiceError::Validation("answers are required".to_string()));
    }
    if answers.iter().any(|a| a.question_id.trim().is_empty()) {
        return Err(ServiceError::Validation(
            "each answer needs a questionId".to_string(),
        ));
    }

    topics::require_topic(db.pool(), topic_id).await?;
    let key = topics::answer_key(db.pool(), topic_id)
        .await
        .map_err(ServiceError::Sql)?;

    let graded: Vec<(String, String)> = answers
        .iter()
        .map(|a| (a.question_id.clone(), a.answer.clone()))
        .collect();
    let outcome = grading::grade_answers(&graded, &key);

    let now = Utc::now();
    let mut tx = db.pool().begin().await.map_err(ServiceError::Sql)?;

    let prior = fetch_progress(&mut tx, learner_id, topic_id)
        .await
        .map_err(ServiceError::Sql)?
        .unwrap_or_default();
    let mastered = prior.mastered || grading::is_mastered(prior.watch_complete, outcome.score);

    sqlx::query(
        r#"
        INSERT INTO "topic_progress"
          ("id", "learnerId", "topicId", "watchProgress", "watchComplete", "testScore", "mastered", "updatedAt")
        VALUES ($1, $2, $3, 0, 0, $4, $5, $6)
        ON CONFLICT ("learnerId", "topicId") DO UPDATE SET
          "testScore" = excluded."testScore",
          "mastered" = MAX("topic_progress"."mastered", excluded."mastered"),
          "updatedAt" = excluded."updatedAt"
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(learner_id)
    .bind(topic_id)
    .bind(outcome.score)
    .bind(mastered)
    .bind(db::format_timestamp(now))
    .execute(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    if outcome.wrong > 0 {
        review::register_wrong(&mut tx, learner_id, topic_id, outcome.wrong, now)
            .await
            .map_err(ServiceError::Sql)?;
    }

    tx.commit().await.map_err(ServiceError::Sql)?;

    if mastered && !prior.mastered {
        notify_topic_mastered(db, learner_id, topic_id, now).await?;
    }

    Ok(TestOutcome {
        score: outcome.score,
        correct: outcome.correct,
        total: outcome.total,
        wrong: outcome.wrong,
        mastered,
    })
}

/// Mastery observer seam: an explicit call into the plan compositor so
/// the coupling stays visible and both sides stay testable on their own.
async fn notify_topic_mastered(
    db: &Db,
    learner_id: &str,
    topic_id: &str,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    daily_plan::mark_topic_done_today(db, learner_id, topic_id, now.date_naive()).await
}

async fn fetch_progress(
    conn: &mut SqliteConnection,
    learner_id: &str,
    topic_id: &str,
) -> Result<Option<ProgressSnapshot>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "watchComplete", "testScore", "mastered"
        FROM "topic_progress"
        WHERE "learnerId" = $1 AND "topicId" = $2
        "#,
    )
    .bind(learner_id)
    .bind(topic_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(|row| {
        Ok(ProgressSnapshot {
            watch_complete: row.try_get("watchComplete")?,
            test_score: row.try_get("testScore")?,
            mastered: row.try_get("mastered")?,
        })
    })
    .transpose()
}
