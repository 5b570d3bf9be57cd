use chrono::{DateTime, Duration, Utc};

/// Fixed spaced-repetition schedule: days until the next review at each
/// stage. Items past the last stage retire.
pub const REVIEW_SCHEDULE_DAYS: [i64; 4] = [1, 3, 7, 14];

pub fn interval_days(stage: i64) -> Option<i64> {
    if stage < 0 {
        return None;
    }
    REVIEW_SCHEDULE_DAYS.get(stage as usize).copied()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAdvance {
    pub stage: i64,
    pub active: bool,
    pub next_due: Option<DateTime<Utc>>,
}

/// Stage transition for a successfully completed review. Items walk the
/// schedule one stage at a time and retire once they step past its end.
pub fn advance_stage(stage: i64, now: DateTime<Utc>) -> ReviewAdvance {
    let next_stage = stage + 1;
    match interval_days(next_stage) {
        Some(days) => ReviewAdvance {
            stage: next_stage,
            active: true,
            next_due: Some(now + Duration::days(days)),
        },
        None => ReviewAdvance {
            stage: next_stage,
            active: false,
            next_due: None,
        },
    }
}

/// Due date assigned when a wrong answer creates or resets an item.
pub fn wrong_answer_due(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(1)
}

/// A wrong answer on a mid-schedule item pulls the next review forward
/// but never pushes it further out.
pub fn accelerated_due(current: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = wrong_answer_due(now);
    match current {
        Some(due) if due < floor => due,
        _ => floor,
    }
}

/// Lookahead window for the due-review listing.
pub fn due_horizon(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(1)
}
