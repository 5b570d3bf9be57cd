use std::collections::HashMap;

pub const WATCH_COMPLETE_THRESHOLD: i64 = 80;
pub const MASTERY_SCORE_THRESHOLD: f64 = 70.0;

pub fn clamp_progress(progress: i64) -> i64 {
    progress.clamp(0, 100)
}

pub fn is_watch_complete(progress: i64) -> bool {
    clamp_progress(progress) >= WATCH_COMPLETE_THRESHOLD
}

/// A topic counts as mastered once both signals are in: the video was
/// watched through and the latest test score clears the bar. Mastery is
/// monotonic; the persistence layer never clears it again.
pub fn is_mastered(watch_complete: bool, test_score: f64) -> bool {
    watch_complete && test_score >= MASTERY_SCORE_THRESHOLD
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeOutcome {
    pub score: f64,
    pub correct: i64,
    pub total: i64,
    pub wrong: i64,
}

/// Grades a submission against the topic's answer key. Only question ids
/// present in the key count toward the total; unknown ids are skipped.
/// Choice comparison ignores case and surrounding whitespace.
pub fn grade_answers(answers: &[(String, String)], key: &HashMap<String, String>) -> GradeOutcome {
    let mut total = 0i64;
    let mut correct = 0i64;

    for (question_id, answer) in answers {
        let Some(expected) = key.get(question_id) else {
            continue;
        };
        total += 1;
        if normalize_choice(answer) == normalize_choice(expected) {
            correct += 1;
        }
    }

    let score = if total > 0 {
        correct as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    GradeOutcome {
        score,
        correct,
        total,
        wrong: total - correct,
    }
}

fn normalize_choice(choice: &str) -> String {
    choice.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(q, c)| (q.to_string(), c.to_string()))
            .collect()
    }

    fn answers_of(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(q, a)| (q.to_string(), a.to_string()))
            .collect()
    }

    #[test]
    fn grading_is_case_and_whitespace_insensitive() {
        let key = key_of(&[("q1", "B")]);
        let outcome = grade_answers(&answers_of(&[("q1", " b ")]), &key);

        assert_eq!(outcome.correct, 1);
        assert_eq!(outcome.wrong, 0);
        assert_eq!(outcome.score, 100.0);
    }

    #[test]
    fn wrong_choice_counts_against_score() {
        let key = key_of(&[("q1", "B")]);
        let outcome = grade_answers(&answers_of(&[("q1", "C")]), &key);

        assert_eq!(outcome.correct, 0);
        assert_eq!(outcome.wrong, 1);
        assert_eq!(outcome.score, 0.0);
    }

    #[test]
    fn unknown_question_ids_are_ignored() {
        let key = key_of(&[("q1", "A"), ("q2", "C")]);
        let outcome = grade_answers(
            &answers_of(&[("q1", "A"), ("ghost", "A"), ("q2", "B")]),
            &key,
        );

        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.correct, 1);
        assert_eq!(outcome.wrong, 1);
        assert_eq!(outcome.score, 50.0);
    }

    #[test]
    fn empty_effective_total_scores_zero() {
        let key = HashMap::new();
        let outcome = grade_answers(&answers_of(&[("q1", "A")]), &key);

        assert_eq!(outcome.total, 0);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.wrong, 0);
    }

    #[test]
    fn mastery_needs_both_signals() {
        assert!(!is_mastered(false, 100.0));
        assert!(!is_mastered(true, 69.9));
        assert!(is_mastered(true, 70.0));
    }

    #[test]
    fn watch_complete_threshold_is_eighty() {
        assert!(!is_watch_complete(79));
        assert!(is_watch_complete(80));
        assert!(is_watch_complete(1000));
    }
}
