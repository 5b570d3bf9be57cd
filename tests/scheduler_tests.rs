use std::collections::HashMap;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;

use studyplan_backend::scheduler::engagement::{apply_award, LedgerState};
use studyplan_backend::scheduler::grading::{
    clamp_progress, grade_answers, is_mastered, is_watch_complete,
};
use studyplan_backend::scheduler::intervals::{accelerated_due, advance_stage, interval_days};
use studyplan_backend::scheduler::plan::{completion_rate, is_completed, PlanItemKind};

proptest! {
    #[test]
    fn watch_progress_always_clamps_to_percent_range(progress in i64::MIN..i64::MAX) {
        let clamped = clamp_progress(progress);
        prop_assert!((0..=100).contains(&clamped));
        prop_assert_eq!(is_watch_complete(progress), clamped >= 80);
    }

    #[test]
    fn completion_rate_stays_in_percent_range(done in 0i64..500, extra in 0i64..500) {
        let total = done + extra;
        let rate = completion_rate(done, total);
        prop_assert!((0..=100).contains(&rate));
        if total > 0 && done == total {
            prop_assert!(is_completed(rate));
        }
    }
}

#[test]
fn spaced_repetition_walks_fixed_schedule() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

    let third = advance_stage(2, now);
    assert_eq!(third.stage, 3);
    assert!(third.active);
    assert_eq!(third.next_due, Some(now + Duration::days(7)));

    let retired = advance_stage(third.stage, now);
    assert_eq!(retired.stage, 4);
    assert!(!retired.active);
    assert_eq!(retired.next_due, None);
}

#[test]
fn schedule_lookup_matches_one_three_seven_fourteen() {
    assert_eq!(
        (0..5).map(interval_days).collect::<Vec<_>>(),
        vec![Some(1), Some(3), Some(7), Some(14), None]
    );
}

#[test]
fn wrong_answer_pulls_due_date_forward_only() {
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

    let delayed = Some(now + Duration::days(10));
    assert_eq!(accelerated_due(delayed, now), now + Duration::days(1));

    let imminent = Some(now + Duration::hours(3));
    assert_eq!(accelerated_due(imminent, now), now + Duration::hours(3));
}

#[test]
fn grading_matches_case_insensitively_and_skips_unknown_ids() {
    let key: HashMap<String, String> = [("q1".to_string(), "B".to_string())].into();

    let perfect = grade_answers(&[("q1".to_string(), " b".to_string())], &key);
    assert_eq!(perfect.score, 100.0);
    assert_eq!(perfect.correct, 1);
    assert_eq!(perfect.wrong, 0);

    let miss = grade_answers(&[("q1".to_string(), "C".to_string())], &key);
    assert_eq!(miss.score, 0.0);
    assert_eq!(miss.wrong, 1);

    let only_unknown = grade_answers(&[("ghost".to_string(), "B".to_string())], &key);
    assert_eq!(only_unknown.total, 0);
    assert_eq!(only_unknown.score, 0.0);
}

#[test]
fn mastery_requires_watch_and_score_thresholds() {
    assert!(!is_mastered(true, 69.9));
    assert!(!is_mastered(false, 100.0));
    assert!(is_mastered(true, 70.0));
}

#[test]
fn streak_counts_consecutive_completed_days() {
    let day = |d: u32| NaiveDate::from_ymd_opt(2025, 7, d).unwrap();
    let mut state = LedgerState::default();

    state = apply_award(&state, day(1), false, true);
    assert_eq!(state.streak, 1);

    state = apply_award(&state, day(2), false, true);
    assert_eq!(state.streak, 2);

    state = apply_award(&state, day(4), false, true);
    assert_eq!(state.streak, 1);
    assert_eq!(state.xp, 150);
}

#[test]
fn empty_plan_is_never_reported_complete() {
    assert_eq!(completion_rate(0, 0), 0);
    assert!(!is_completed(completion_rate(0, 0)));
}

#[test]
fn auto_titles_follow_the_assign_label_map() {
    assert_eq!(
        PlanItemKind::Review.auto_title(Some("Fractions")),
        "Review: Fractions"
    );
    assert_eq!(
        PlanItemKind::NewTopic.auto_title(Some("Fractions")),
        "New topic: Fractions"
    );
    assert_eq!(PlanItemKind::Custom.auto_title(None), "Task");
}
