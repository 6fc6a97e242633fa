//! Built-in defaults: session length, starter tags, quotes and demo data.

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;

use crate::types::{Tag, Task, Tree, TreeStatus, TreeType};

/// Default session length in minutes.
pub const DEFAULT_DURATION_MINUTES: u32 = 25;

/// Shortest allowed session in minutes.
pub const MIN_DURATION_MINUTES: u32 = 10;

/// Longest allowed session in minutes.
pub const MAX_DURATION_MINUTES: u32 = 120;

/// Shown when a tree references a tag that no longer resolves.
pub const UNKNOWN_TAG_NAME: &str = "Unknown";

/// Color used when a tree references a tag that no longer resolves.
pub const UNKNOWN_TAG_COLOR: &str = "#64748b";

/// Quotes shown when a session starts.
pub const MOTIVATIONAL_QUOTES: [&str; 5] = [
    "The best time to plant a tree was 20 years ago. The second best time is now.",
    "Stay focused, go green.",
    "Put down the phone, pick up your life.",
    "Focus is the key to success.",
    "Every tree counts.",
];

/// The tags every new forest starts with, in declaration order.
#[must_use]
pub fn default_tags() -> Vec<Tag> {
    [
        ("work", "Work", "#3b82f6", 8),
        ("study", "Study", "#a855f7", 6),
        ("social", "Social", "#ec4899", 2),
        ("rest", "Rest", "#10b981", 3),
        ("entertainment", "Entertainment", "#f59e0b", 2),
    ]
    .into_iter()
    .map(|(id, name, color, daily_goal)| Tag {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
        daily_goal,
    })
    .collect()
}

/// Picks a random motivational quote.
#[must_use]
pub fn random_quote() -> &'static str {
    MOTIVATIONAL_QUOTES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(MOTIVATIONAL_QUOTES[0])
}

/// Sample tasks matching [`default_tags`].
#[must_use]
pub fn demo_tasks() -> Vec<Task> {
    vec![
        Task {
            id: "t1".to_string(),
            tag_id: "study".to_string(),
            name: "Read Chapter".to_string(),
            daily_goal: 2,
        },
        Task {
            id: "t2".to_string(),
            tag_id: "work".to_string(),
            name: "Clear Inbox".to_string(),
            daily_goal: 1,
        },
    ]
}

/// A small forest relative to `now`: two alive trees on previous days and a
/// withered one from earlier today or late yesterday.
#[must_use]
pub fn demo_trees(now: DateTime<Utc>) -> Vec<Tree> {
    vec![
        Tree {
            id: "1".to_string(),
            created_at: now - Duration::days(1),
            duration_minutes: 25,
            tag_id: "work".to_string(),
            task_id: None,
            status: TreeStatus::Alive,
            tree_type: TreeType::Oak,
            ai_story: Some("A sturdy oak of productivity.".to_string()),
        },
        Tree {
            id: "2".to_string(),
            created_at: now - Duration::days(2),
            duration_minutes: 45,
            tag_id: "study".to_string(),
            task_id: None,
            status: TreeStatus::Alive,
            tree_type: TreeType::Pine,
            ai_story: Some("Deep roots of knowledge.".to_string()),
        },
        Tree {
            id: "3".to_string(),
            created_at: now - Duration::milliseconds(20_000_000),
            duration_minutes: 15,
            tag_id: "social".to_string(),
            task_id: None,
            status: TreeStatus::Withered,
            tree_type: TreeType::Willow,
            ai_story: None,
        },
    ]
}
