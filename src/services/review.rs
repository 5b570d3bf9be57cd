use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use crate::db::{self, Db};
use crate::scheduler::intervals;
use crate::services::ServiceError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueReview {
    pub id: String,
    pub topic_id: String,
    pub topic_title: String,
    pub stage: i64,
    pub next_due_at: String,
    pub wrong_total: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCompletion {
    pub active: bool,
    pub stage: i64,
    pub next_due_at: Option<String>,
}

/// Records wrong answers against the (learner, topic) review item as one
/// atomic upsert. A fresh, stage-0 or retired item restarts the schedule
/// at stage 0 due tomorrow; a mid-schedule item keeps its stage and only
/// has its due date pulled forward.
pub(crate) async fn register_wrong(
    conn: &mut SqliteConnection,
    learner_id: &str,
    topic_id: &str,
    wrong_count: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    if wrong_count <= 0 {
        return Ok(());
    }

    let reset_due = db::format_timestamp(intervals::wrong_answer_due(now));

    sqlx::query(
        r#"
        INSERT INTO "review_items"
          ("id", "learnerId", "topicId", "stage", "nextDueAt", "isActive", "wrongTotal", "lastWrongAt")
        VALUES ($1, $2, $3, 0, $4, 1, $5, $6)
        ON CONFLICT ("learnerId", "topicId") DO UPDATE SET
          "stage" = CASE
              WHEN "review_items"."isActive" = 0 OR "review_items"."stage" = 0 THEN 0
              ELSE "review_items"."stage"
          END,
          "nextDueAt" = CASE
              WHEN "review_items"."isActive" = 0 OR "review_items"."stage" = 0 THEN excluded."nextDueAt"
              WHEN "review_items"."nextDueAt" IS NULL THEN excluded."nextDueAt"
              WHEN "review_items"."nextDueAt" > excluded."nextDueAt" THEN excluded."nextDueAt"
              ELSE "review_items"."nextDueAt"
          END,
          "isActive" = 1,
          "wrongTotal" = "review_items"."wrongTotal" + excluded."wrongTotal",
          "lastWrongAt" = excluded."lastWrongAt"
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(learner_id)
    .bind(topic_id)
    .bind(&reset_due)
    .bind(wrong_count)
    .bind(db::format_timestamp(now))
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Active items due within the lookahead window, earliest first with the
/// item id as tie-break so the ordering is deterministic.
pub async fn due_items(db: &Db, learner_id: &str, now: DateTime<Utc>) -> Result<Vec<DueReview>, ServiceError> {
    let mut conn = db.pool().acquire().await.map_err(ServiceError::Sql)?;

    let rows = match due_rows(&mut conn, learner_id, now).await {
        Err(err) if db::is_transient(&err) => due_rows(&mut conn, learner_id, now).await,
        other => other,
    }
    .map_err(ServiceError::Sql)?;

    Ok(rows)
}

pub(crate) async fn due_rows(
    conn: &mut SqliteConnection,
    learner_id: &str,
    now: DateTime<Utc>,
) -> Result<Vec<DueReview>, sqlx::Error> {
    let horizon = db::format_timestamp(intervals::due_horizon(now));

    let rows = sqlx::query(
        r#"
        SELECT r."id", r."topicId", t."title" AS "topicTitle",
               r."stage", r."nextDueAt", r."wrongTotal"
        FROM "review_items" r
        JOIN "topics" t ON t."id" = r."topicId"
        WHERE r."learnerId" = $1 AND r."isActive" = 1 AND r."nextDueAt" <= $2
        ORDER BY r."nextDueAt", r."id"
        "#,
    )
    .bind(learner_id)
    .bind(&horizon)
    .fetch_all(&mut *conn)
    .await?;

    let mut due = Vec::with_capacity(rows.len());
    for row in rows {
        due.push(DueReview {
            id: row.try_get("id")?,
            topic_id: row.try_get("topicId")?,
            topic_title: row.try_get("topicTitle")?,
            stage: row.try_get("stage")?,
            next_due_at: row.try_get("nextDueAt")?,
            wrong_total: row.try_get("wrongTotal")?,
        });
    }
    Ok(due)
}

/// Completes one review cycle: appends the attempt to the audit trail and
/// advances the item along the schedule, retiring it past the last stage.
pub async fn complete_review(
    db: &Db,
    learner_id: &str,
    review_id: &str,
    score: f64,
) -> Result<ReviewCompletion, ServiceError> {
    let now = Utc::now();
    let mut tx = db.pool().begin().await.map_err(ServiceError::Sql)?;

    let row = sqlx::query(
        r#"SELECT "learnerId", "stage", "isActive" FROM "review_items" WHERE "id" = $1"#,
    )
    .bind(review_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    let Some(row) = row else {
        return Err(ServiceError::NotFound("review item not found".to_string()));
    };

    let owner: String = row.try_get("learnerId").map_err(ServiceError::Sql)?;
    let active: bool = row.try_get("isActive").map_err(ServiceError::Sql)?;
    if owner != learner_id || !active {
        return Err(ServiceError::NotFound("review item not found".to_string()));
    }

    let stage: i64 = row.try_get("stage").map_err(ServiceError::Sql)?;

    sqlx::query(
        r#"
        INSERT INTO "review_attempts" ("id", "reviewItemId", "score", "attemptedAt")
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(review_id)
    .bind(score)
    .bind(db::format_timestamp(now))
    .execute(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    let advance = intervals::advance_stage(stage, now);
    let next_due_at = advance.next_due.map(db::format_timestamp);

    sqlx::query(
        r#"
        UPDATE "review_items"
        SET "stage" = $2, "isActive" = $3, "nextDueAt" = $4
        WHERE "id" = $1
        "#,
    )
    .bind(review_id)
    .bind(advance.stage)
    .bind(advance.active)
    .bind(&next_due_at)
    .execute(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    tx.commit().await.map_err(ServiceError::Sql)?;

    Ok(ReviewCompletion {
        active: advance.active,
        stage: advance.stage,
        next_due_at,
    })
}
