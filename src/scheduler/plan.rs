use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanItemKind {
    Review,
    NewTopic,
    MiniTest,
    Custom,
}

impl PlanItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanItemKind::Review => "review",
            PlanItemKind::NewTopic => "new_topic",
            PlanItemKind::MiniTest => "mini_test",
            PlanItemKind::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "review" => Some(PlanItemKind::Review),
            "new_topic" => Some(PlanItemKind::NewTopic),
            "mini_test" => Some(PlanItemKind::MiniTest),
            "custom" => Some(PlanItemKind::Custom),
            _ => None,
        }
    }

    /// Title used when plan generation or the assign form leaves the
    /// title blank.
    pub fn auto_title(&self, topic_title: Option<&str>) -> String {
        let base = match self {
            PlanItemKind::Review => "Review",
            PlanItemKind::NewTopic => "New topic",
            PlanItemKind::MiniTest => "Mini test",
            PlanItemKind::Custom => "Task",
        };

        match topic_title {
            Some(title) => format!("{base}: {title}"),
            None => base.to_string(),
        }
    }

    /// Mastering a topic satisfies its study items for the day, but a
    /// review is only satisfied by completing its own review cycle.
    pub fn satisfied_by_mastery(&self) -> bool {
        matches!(self, PlanItemKind::NewTopic | PlanItemKind::MiniTest)
    }
}

/// Completion percentage, floored. An empty plan is 0, not 100, so a
/// no-task day never reads as "day complete".
pub fn completion_rate(done: i64, total: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        done * 100 / total
    }
}

pub fn is_completed(rate: i64) -> bool {
    rate == 100
}
