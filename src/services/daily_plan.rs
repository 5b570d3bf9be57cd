use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use crate::db::{self, Db};
use crate::scheduler::plan::{self, PlanItemKind};
use crate::services::{engagement, review, topics, ServiceError};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanView {
    pub id: String,
    pub date: String,
    pub completion_rate: i64,
    pub is_completed: bool,
    pub items: Vec<PlanItemView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItemView {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub is_done: bool,
    pub position: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_item_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanItemDone {
    pub completion_rate: i64,
    pub is_completed: bool,
}

/// Returns the learner's plan for the date, building it exactly once.
/// The UNIQUE (learner, date) index arbitrates concurrent builders: the
/// loser's INSERT OR IGNORE is a no-op and it reads the winner's items.
/// An existing plan is returned untouched, whatever has happened to the
/// review queue since.
pub async fn get_or_build_plan(
    db: &Db,
    learner_id: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<PlanView, ServiceError> {
    let date_str = db::format_date(date);
    let mut tx = db.pool().begin().await.map_err(ServiceError::Sql)?;

    let plan_id = uuid::Uuid::new_v4().to_string();
    let created = sqlx::query(
        r#"
        INSERT OR IGNORE INTO "daily_plans"
          ("id", "learnerId", "planDate", "completionRate", "isCompleted")
        VALUES ($1, $2, $3, 0, 0)
        "#,
    )
    .bind(&plan_id)
    .bind(learner_id)
    .bind(&date_str)
    .execute(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?
    .rows_affected()
        == 1;

    if created {
        build_plan_items(&mut tx, &plan_id, learner_id, now)
            .await
            .map_err(ServiceError::Sql)?;
    }

    tx.commit().await.map_err(ServiceError::Sql)?;

    read_plan(db, learner_id, &date_str).await
}

/// Item order is fixed: due reviews first (earliest due wins), then the
/// next unmastered topic with its paired mini test.
async fn build_plan_items(
    conn: &mut SqliteConnection,
    plan_id: &str,
    learner_id: &str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let mut position = 1i64;

    for due in review::due_rows(conn, learner_id, now).await? {
        insert_item(
            conn,
            plan_id,
            PlanItemKind::Review,
            &PlanItemKind::Review.auto_title(Some(&due.topic_title)),
            Some(&due.topic_id),
            Some(&due.id),
            position,
        )
        .await?;
        position += 1;
    }

    if let Some(topic) = topics::first_unmastered(conn, learner_id).await? {
        insert_item(
            conn,
            plan_id,
            PlanItemKind::NewTopic,
            &PlanItemKind::NewTopic.auto_title(Some(&topic.title)),
            Some(&topic.id),
            None,
            position,
        )
        .await?;
        position += 1;

        insert_item(
            conn,
            plan_id,
            PlanItemKind::MiniTest,
            &PlanItemKind::MiniTest.auto_title(Some(&topic.title)),
            Some(&topic.id),
            None,
            position,
        )
        .await?;
    }

    Ok(())
}

/// One-way done flip. Re-marking an already-done item is a no-op, not an
/// error. The aggregate recompute shares the transaction with the flip so
/// completion_rate is never observed out of step with item states.
pub async fn mark_item_done(
    db: &Db,
    learner_id: &str,
    item_id: &str,
    today: NaiveDate,
) -> Result<PlanItemDone, ServiceError> {
    let mut tx = db.pool().begin().await.map_err(ServiceError::Sql)?;

    let row = sqlx::query(
        r#"
        SELECT i."isDone", p."id" AS "planId", p."learnerId", p."isCompleted"
        FROM "daily_plan_items" i
        JOIN "daily_plans" p ON p."id" = i."planId"
        WHERE i."id" = $1
        "#,
    )
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    let Some(row) = row else {
        return Err(ServiceError::NotFound("plan item not found".to_string()));
    };

    let owner: String = row.try_get("learnerId").map_err(ServiceError::Sql)?;
    if owner != learner_id {
        return Err(ServiceError::Forbidden(
            "plan item belongs to another learner".to_string(),
        ));
    }

    let was_done: bool = row.try_get("isDone").map_err(ServiceError::Sql)?;
    let was_completed: bool = row.try_get("isCompleted").map_err(ServiceError::Sql)?;
    let plan_id: String = row.try_get("planId").map_err(ServiceError::Sql)?;

    let transitioned = !was_done;
    if transitioned {
        sqlx::query(r#"UPDATE "daily_plan_items" SET "isDone" = 1 WHERE "id" = $1"#)
            .bind(item_id)
            .execute(&mut *tx)
            .await
            .map_err(ServiceError::Sql)?;
    }

    let (completion_rate, is_completed) = recompute_plan(&mut tx, &plan_id)
        .await
        .map_err(ServiceError::Sql)?;

    tx.commit().await.map_err(ServiceError::Sql)?;

    if transitioned {
        let newly_completed = is_completed && !was_completed;
        engagement::award(db, learner_id, today, true, newly_completed).await;
    }

    Ok(PlanItemDone {
        completion_rate,
        is_completed,
    })
}

/// Plan sync invoked when a topic becomes mastered: bulk-completes
/// today's study items for the topic. Reviews are exempt; only the
/// review cycle itself satisfies them. No-op without a plan for today.
pub async fn mark_topic_done_today(
    db: &Db,
    learner_id: &str,
    topic_id: &str,
    today: NaiveDate,
) -> Result<(), ServiceError> {
    let date_str = db::format_date(today);
    let mut tx = db.pool().begin().await.map_err(ServiceError::Sql)?;

    let plan_row = sqlx::query(
        r#"SELECT "id", "isCompleted" FROM "daily_plans" WHERE "learnerId" = $1 AND "planDate" = $2"#,
    )
    .bind(learner_id)
    .bind(&date_str)
    .fetch_optional(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    let Some(plan_row) = plan_row else {
        return Ok(());
    };

    let plan_id: String = plan_row.try_get("id").map_err(ServiceError::Sql)?;
    let was_completed: bool = plan_row.try_get("isCompleted").map_err(ServiceError::Sql)?;

    let changed = sqlx::query(
        r#"
        UPDATE "daily_plan_items"
        SET "isDone" = 1
        WHERE "planId" = $1 AND "topicId" = $2 AND "isDone" = 0
          AND "kind" IN ('new_topic', 'mini_test')
        "#,
    )
    .bind(&plan_id)
    .bind(topic_id)
    .execute(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?
    .rows_affected();

    if changed == 0 {
        return Ok(());
    }

    let (_, is_completed) = recompute_plan(&mut tx, &plan_id)
        .await
        .map_err(ServiceError::Sql)?;

    tx.commit().await.map_err(ServiceError::Sql)?;

    // Plan sync awards no per-item XP; only the day-completion award
    // applies when the sync finishes the plan.
    if is_completed && !was_completed {
        engagement::award(db, learner_id, today, false, true).await;
    }

    Ok(())
}

/// Appends a manually assigned item at the next unused position,
/// building the plan first if the date has none yet.
pub async fn assign_item(
    db: &Db,
    learner_id: &str,
    date: NaiveDate,
    kind: PlanItemKind,
    title: Option<String>,
    topic_id: Option<String>,
    now: DateTime<Utc>,
) -> Result<PlanItemView, ServiceError> {
    let topic = match topic_id.as_deref() {
        Some(id) => Some(topics::require_topic(db.pool(), id).await?),
        None => None,
    };

    get_or_build_plan(db, learner_id, date, now).await?;

    let date_str = db::format_date(date);
    let mut tx = db.pool().begin().await.map_err(ServiceError::Sql)?;

    let plan_id: String = sqlx::query_scalar(
        r#"SELECT "id" FROM "daily_plans" WHERE "learnerId" = $1 AND "planDate" = $2"#,
    )
    .bind(learner_id)
    .bind(&date_str)
    .fetch_one(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    let position: i64 = sqlx::query_scalar(
        r#"SELECT COALESCE(MAX("position"), 0) + 1 FROM "daily_plan_items" WHERE "planId" = $1"#,
    )
    .bind(&plan_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| kind.auto_title(topic.as_ref().map(|t| t.title.as_str())));

    let item_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO "daily_plan_items"
          ("id", "planId", "kind", "title", "topicId", "reviewItemId", "position", "isDone")
        VALUES ($1, $2, $3, $4, $5, NULL, $6, 0)
        "#,
    )
    .bind(&item_id)
    .bind(&plan_id)
    .bind(kind.as_str())
    .bind(&title)
    .bind(topic.as_ref().map(|t| t.id.as_str()))
    .bind(position)
    .execute(&mut *tx)
    .await
    .map_err(ServiceError::Sql)?;

    // A fresh undone item can take a completed plan back below 100%.
    recompute_plan(&mut tx, &plan_id)
        .await
        .map_err(ServiceError::Sql)?;

    tx.commit().await.map_err(ServiceError::Sql)?;

    Ok(PlanItemView {
        id: item_id,
        kind: kind.as_str().to_string(),
        title,
        is_done: false,
        position,
        topic_id: topic.map(|t| t.id),
        review_item_id: None,
    })
}

async fn insert_item(
    conn: &mut SqliteConnection,
    plan_id: &str,
    kind: PlanItemKind,
    title: &str,
    topic_id: Option<&str>,
    review_item_id: Option<&str>,
    position: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "daily_plan_items"
          ("id", "planId", "kind", "title", "topicId", "reviewItemId", "position", "isDone")
        VALUES ($1, $2, $3, $4, $5, $6, $7, 0)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(plan_id)
    .bind(kind.as_str())
    .bind(title)
    .bind(topic_id)
    .bind(review_item_id)
    .bind(position)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn recompute_plan(
    conn: &mut SqliteConnection,
    plan_id: &str,
) -> Result<(i64, bool), sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS "total", COALESCE(SUM("isDone"), 0) AS "done"
        FROM "daily_plan_items"
        WHERE "planId" = $1
        "#,
    )
    .bind(plan_id)
    .fetch_one(&mut *conn)
    .await?;

    let total: i64 = row.try_get("total")?;
    let done: i64 = row.try_get("done")?;

    let completion_rate = plan::completion_rate(done, total);
    let is_completed = plan::is_completed(completion_rate);

    sqlx::query(
        r#"UPDATE "daily_plans" SET "completionRate" = $2, "isCompleted" = $3 WHERE "id" = $1"#,
    )
    .bind(plan_id)
    .bind(completion_rate)
    .bind(is_completed)
    .execute(&mut *conn)
    .await?;

    Ok((completion_rate, is_completed))
}

async fn read_plan(db: &Db, learner_id: &str, date_str: &str) -> Result<PlanView, ServiceError> {
    let plan_row = sqlx::query(
        r#"
        SELECT "id", "planDate", "completionRate", "isCompleted"
        FROM "daily_plans"
        WHERE "learnerId" = $1 AND "planDate" = $2
        "#,
    )
    .bind(learner_id)
    .bind(date_str)
    .fetch_one(db.pool())
    .await
    .map_err(ServiceError::Sql)?;

    let plan_id: String = plan_row.try_get("id").map_err(ServiceError::Sql)?;

    let item_rows = sqlx::query(
        r#"
        SELECT "id", "kind", "title", "isDone", "position", "topicId", "reviewItemId"
        FROM "daily_plan_items"
        WHERE "planId" = $1
        ORDER BY "position"
        "#,
    )
    .bind(&plan_id)
    .fetch_all(db.pool())
    .await
    .map_err(ServiceError::Sql)?;

    let mut items = Vec::with_capacity(item_rows.len());
    for row in &item_rows {
        items.push(PlanItemView {
            id: row.try_get("id").map_err(ServiceError::Sql)?,
            kind: row.try_get("kind").map_err(ServiceError::Sql)?,
            title: row.try_get("title").map_err(ServiceError::Sql)?,
            is_done: row.try_get("isDone").map_err(ServiceError::Sql)?,
            position: row.try_get("position").map_err(ServiceError::Sql)?,
            topic_id: row.try_get("topicId").map_err(ServiceError::Sql)?,
            review_item_id: row.try_get("reviewItemId").map_err(ServiceError::Sql)?,
        });
    }

    Ok(PlanView {
        id: plan_id,
        date: plan_row.try_get("planDate").map_err(ServiceError::Sql)?,
        completion_rate: plan_row.try_get("completionRate").map_err(ServiceError::Sql)?,
        is_completed: plan_row.try_get("isCompleted").map_err(ServiceError::Sql)?,
        items,
    })
}
