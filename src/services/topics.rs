use std::collections::HashMap;

use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Row, SqlitePool};

use crate::db::{self, Db};
use crate::services::ServiceError;

/// Topic catalog reads. The catalog is owned by the surrounding platform;
/// this module only consumes existence, canonical ordering and the
/// per-topic answer key.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub id: String,
    pub title: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicQuestionView {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgressView {
    pub watch_progress: i64,
    pub watch_complete: bool,
    pub test_score: f64,
    pub mastered: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    pub topic: TopicSummary,
    pub questions: Vec<TopicQuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<TopicProgressView>,
}

pub async fn list_topics(db: &Db) -> Result<Vec<TopicSummary>, ServiceError> {
    let rows = match fetch_topic_rows(db.pool()).await {
        Err(err) if db::is_transient(&err) => fetch_topic_rows(db.pool()).await,
        other => other,
    }?;

    Ok(rows)
}

async fn fetch_topic_rows(pool: &SqlitePool) -> Result<Vec<TopicSummary>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "id", "title", "position" FROM "topics" ORDER BY "position", "id""#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(map_topic_row).collect()
}

pub async fn require_topic(pool: &SqlitePool, topic_id: &str) -> Result<TopicSummary, ServiceError> {
    let row = sqlx::query(r#"SELECT "id", "title", "position" FROM "topics" WHERE "id" = $1"#)
        .bind(topic_id)
        .fetch_optional(pool)
        .await
        .map_err(ServiceError::Sql)?;

    match row {
        Some(row) => map_topic_row(&row).map_err(ServiceError::Sql),
        None => Err(ServiceError::NotFound(format!("topic {topic_id} not found"))),
    }
}

/// The next topic to introduce: first in canonical (position, id) order
/// without a mastered progress row for this learner.
pub(crate) async fn first_unmastered(
    conn: &mut SqliteConnection,
    learner_id: &str,
) -> Result<Option<TopicSummary>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT t."id", t."title", t."position"
        FROM "topics" t
        LEFT JOIN "topic_progress" p
          ON p."topicId" = t."id" AND p."learnerId" = $1
        WHERE COALESCE(p."mastered", 0) = 0
        ORDER BY t."position", t."id"
        LIMIT 1
        "#,
    )
    .bind(learner_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(map_topic_row).transpose()
}

/// Question id to correct choice for one topic.
pub async fn answer_key(
    pool: &SqlitePool,
    topic_id: &str,
) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows = sqlx::query(
        r#"SELECT "id", "correctChoice" FROM "topic_questions" WHERE "topicId" = $1"#,
    )
    .bind(topic_id)
    .fetch_all(pool)
    .await?;

    let mut key = HashMap::with_capacity(rows.len());
    for row in rows {
        key.insert(row.try_get("id")?, row.try_get("correctChoice")?);
    }
    Ok(key)
}

/// Topic detail with the learner's own progress embedded. Correct
/// choices never leave the server.
pub async fn topic_detail(
    db: &Db,
    learner_id: &str,
    topic_id: &str,
) -> Result<TopicDetail, ServiceError> {
    let topic = require_topic(db.pool(), topic_id).await?;

    let question_rows = sqlx::query(
        r#"
        SELECT "id", "text" FROM "topic_questions"
        WHERE "topicId" = $1
        ORDER BY "position", "id"
        "#,
    )
    .bind(topic_id)
    .fetch_all(db.pool())
    .await
    .map_err(ServiceError::Sql)?;

    let mut questions = Vec::with_capacity(question_rows.len());
    for row in &question_rows {
        questions.push(TopicQuestionView {
            id: row.try_get("id").map_err(ServiceError::Sql)?,
            text: row.try_get("text").map_err(ServiceError::Sql)?,
        });
    }

    let progress_row = sqlx::query(
        r#"
        SELECT "watchProgress", "watchComplete", "testScore", "mastered"
        FROM "topic_progress"
        WHERE "learnerId" = $1 AND "topicId" = $2
        "#,
    )
    .bind(learner_id)
    .bind(topic_id)
    .fetch_optional(db.pool())
    .await
    .map_err(ServiceError::Sql)?;

    let progress = match progress_row {
        Some(row) => Some(TopicProgressView {
            watch_progress: row.try_get("watchProgress").map_err(ServiceError::Sql)?,
            watch_complete: row.try_get("watchComplete").map_err(ServiceError::Sql)?,
            test_score: row.try_get("testScore").map_err(ServiceError::Sql)?,
            mastered: row.try_get("mastered").map_err(ServiceError::Sql)?,
        }),
        None => None,
    };

    Ok(TopicDetail {
        topic,
        questions,
        progress,
    })
}

fn map_topic_row(row: &sqlx::sqlite::SqliteRow) -> Result<TopicSummary, sqlx::Error> {
    Ok(TopicSummary {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        position: row.try_get("position")?,
    })
}
