use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::db::{self, Db};
use crate::scheduler::engagement::{apply_award, LedgerState};

/// Gamification is best-effort: a storage failure here is logged and
/// reported as Degraded, never surfaced to the study flow that
/// triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    Applied,
    Skipped,
    Degraded,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementStats {
    pub xp: i64,
    pub streak: i64,
}

pub async fn award(
    db: &Db,
    learner_id: &str,
    today: NaiveDate,
    item_completed: bool,
    plan_completed: bool,
) -> AwardOutcome {
    if !item_completed && !plan_completed {
        return AwardOutcome::Skipped;
    }

    match persist_award(db.pool(), learner_id, today, item_completed, plan_completed).await {
        Ok(()) => AwardOutcome::Applied,
        Err(err) => {
            tracing::warn!(error = %err, learner_id, "engagement award dropped");
            AwardOutcome::Degraded
        }
    }
}

async fn persist_award(
    pool: &SqlitePool,
    learner_id: &str,
    today: NaiveDate,
    item_completed: bool,
    plan_completed: bool,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"SELECT "xp", "streak", "lastStreakDate" FROM "engagement_ledgers" WHERE "learnerId" = $1"#,
    )
    .bind(learner_id)
    .fetch_optional(&mut *tx)
    .await?;

    let state = match row {
        Some(row) => LedgerState {
            xp: row.try_get("xp")?,
            streak: row.try_get("streak")?,
            last_streak_date: row
                .try_get::<Option<String>, _>("lastStreakDate")?
                .as_deref()
                .and_then(db::parse_date),
        },
        None => LedgerState::default(),
    };

    let next = apply_award(&state, today, item_completed, plan_completed);

    sqlx::query(
        r#"
        INSERT INTO "engagement_ledgers" ("learnerId", "xp", "streak", "lastStreakDate")
        VALUES ($1, $2, $3, $4)
        ON CONFLICT ("learnerId") DO UPDATE SET
          "xp" = excluded."xp",
          "streak" = excluded."streak",
          "lastStreakDate" = excluded."lastStreakDate"
        "#,
    )
    .bind(learner_id)
    .bind(next.xp)
    .bind(next.streak)
    .bind(next.last_streak_date.map(db::format_date))
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

/// Current XP and streak; zeros when the learner has no ledger row yet,
/// and zeros again when storage is unavailable.
pub async fn stats(db: &Db, learner_id: &str) -> EngagementStats {
    match fetch_stats(db.pool(), learner_id).await {
        Ok(stats) => stats,
        Err(err) => {
            tracing::warn!(error = %err, learner_id, "engagement stats degraded to zeros");
            EngagementStats::default()
        }
    }
}

async fn fetch_stats(pool: &SqlitePool, learner_id: &str) -> Result<EngagementStats, sqlx::Error> {
    let row = sqlx::query(
        r#"SELECT "xp", "streak" FROM "engagement_ledgers" WHERE "learnerId" = $1"#,
    )
    .bind(learner_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(EngagementStats {
            xp: row.try_get("xp")?,
            streak: row.try_get("streak")?,
        }),
        None => Ok(EngagementStats::default()),
    }
}
