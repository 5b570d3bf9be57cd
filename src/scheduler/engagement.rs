use chrono::{Duration, NaiveDate};

pub const ITEM_XP: i64 = 10;
pub const PLAN_COMPLETION_XP: i64 = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub xp: i64,
    pub streak: i64,
    pub last_streak_date: Option<NaiveDate>,
}

/// Applies one award event. The streak counts consecutive calendar days
/// on which the plan reached 100%; any gap, including the very first
/// award, restarts it at 1.
pub fn apply_award(
    state: &LedgerState,
    today: NaiveDate,
    item_completed: bool,
    plan_completed: bool,
) -> LedgerState {
    let mut next = state.clone();

    if item_completed {
        next.xp += ITEM_XP;
    }

    if plan_completed {
        next.xp += PLAN_COMPLETION_XP;
        let yesterday = today - Duration::days(1);
        next.streak = if state.last_streak_date == Some(yesterday) {
            state.streak + 1
        } else {
            1
        };
        next.last_streak_date = Some(today);
    }

    next
}
