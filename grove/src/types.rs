//! Domain types for Grove.
//!
//! This module defines the records shared by the session engine, the forest
//! store and the statistics engine. All types serialize to camelCase JSON,
//! with tree timestamps encoded as milliseconds since the Unix epoch.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of the random alphanumeric suffix in generated IDs.
const ID_SUFFIX_LEN: usize = 20;

/// Prefix for generated tree IDs.
pub const TREE_ID_PREFIX: &str = "tree";

/// Prefix for generated tag IDs.
pub const TAG_ID_PREFIX: &str = "tag";

/// Prefix for generated task IDs.
pub const TASK_ID_PREFIX: &str = "task";

/// A project that sessions are tagged with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Unique tag identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Display color hint (e.g. `#3b82f6`).
    pub color: String,

    /// Number of completed sessions aimed for each day. Always at least 1.
    pub daily_goal: u32,
}

/// A unit of work inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    /// The owning tag.
    pub tag_id: String,

    pub name: String,

    /// Number of completed sessions aimed for each day. Always at least 1.
    pub daily_goal: u32,
}

/// Outcome recorded on a tree when it is planted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TreeStatus {
    /// The session ran to completion.
    Alive,
    /// The session was abandoned.
    Withered,
}

/// Species of tree grown by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TreeType {
    Oak,
    Pine,
    Willow,
    Bamboo,
    Cactus,
}

impl TreeType {
    /// Every tree type, in picker order.
    pub const ALL: [TreeType; 5] = [
        TreeType::Oak,
        TreeType::Pine,
        TreeType::Willow,
        TreeType::Bamboo,
        TreeType::Cactus,
    ];

    /// Human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Oak => "Oak",
            Self::Pine => "Pine",
            Self::Willow => "Willow",
            Self::Bamboo => "Bamboo",
            Self::Cactus => "Cactus",
        }
    }

    /// Parses a tree type name, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.label().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for TreeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tree in the forest, planted once when a session ends.
///
/// Only `ai_story` may change after creation, and only through
/// [`ForestStore::patch_story`](crate::forest::ForestStore::patch_story).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: String,

    /// When the session ended.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    /// Configured session length, whatever the outcome.
    pub duration_minutes: u32,

    pub tag_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    pub status: TreeStatus,

    #[serde(rename = "type")]
    pub tree_type: TreeType,

    /// Generated description, attached after creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_story: Option<String>,
}

impl Tree {
    /// Plants a new tree with a freshly generated ID and no story.
    #[must_use]
    pub fn new(
        created_at: DateTime<Utc>,
        duration_minutes: u32,
        tag_id: String,
        task_id: Option<String>,
        status: TreeStatus,
        tree_type: TreeType,
    ) -> Self {
        Self {
            id: generate_id(TREE_ID_PREFIX),
            created_at,
            duration_minutes,
            tag_id,
            task_id,
            status,
            tree_type,
            ai_story: None,
        }
    }

    /// Returns true if the session that planted this tree was completed.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status == TreeStatus::Alive
    }
}

/// Generates a unique ID with the format `{prefix}_` followed by 20
/// lowercase alphanumeric characters.
#[must_use]
pub fn generate_id(prefix: &str) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    format!("{prefix}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_tree() -> Tree {
        Tree {
            id: "tree_1".to_string(),
            created_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            duration_minutes: 25,
            tag_id: "work".to_string(),
            task_id: None,
            status: TreeStatus::Alive,
            tree_type: TreeType::Oak,
            ai_story: None,
        }
    }

    #[test]
    fn generated_id_has_prefix_and_suffix() {
        let id = generate_id(TREE_ID_PREFIX);
        assert!(id.starts_with("tree_"));
        assert_eq!(id.len(), 25);
        assert!(id[5..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(generate_id(TAG_ID_PREFIX), generate_id(TAG_ID_PREFIX));
    }

    #[test]
    fn tree_type_parse_ignores_case() {
        assert_eq!(TreeType::parse("oak"), Some(TreeType::Oak));
        assert_eq!(TreeType::parse(" BAMBOO "), Some(TreeType::Bamboo));
        assert_eq!(TreeType::parse("maple"), None);
    }

    #[test]
    fn tree_type_display_uses_label() {
        assert_eq!(TreeType::Willow.to_string(), "Willow");
    }

    #[test]
    fn tree_serializes_to_camel_case_with_millis() {
        let json = serde_json::to_value(sample_tree()).unwrap();

        assert_eq!(json["createdAt"], 1_700_000_000_123_i64);
        assert_eq!(json["durationMinutes"], 25);
        assert_eq!(json["tagId"], "work");
        assert_eq!(json["status"], "ALIVE");
        assert_eq!(json["type"], "OAK");
        assert!(json.get("taskId").is_none());
        assert!(json.get("aiStory").is_none());
    }

    #[test]
    fn tree_deserializes_without_optional_fields() {
        let json = r#"{
            "id": "3",
            "createdAt": 1700000000000,
            "durationMinutes": 15,
            "tagId": "social",
            "status": "WITHERED",
            "type": "WILLOW"
        }"#;

        let tree: Tree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.status, TreeStatus::Withered);
        assert_eq!(tree.tree_type, TreeType::Willow);
        assert!(tree.task_id.is_none());
        assert!(tree.ai_story.is_none());
        assert!(!tree.is_alive());
    }

    #[test]
    fn new_tree_has_no_story() {
        let tree = Tree::new(
            Utc::now(),
            30,
            "study".to_string(),
            Some("t1".to_string()),
            TreeStatus::Alive,
            TreeType::Pine,
        );
        assert!(tree.id.starts_with("tree_"));
        assert!(tree.ai_story.is_none());
        assert!(tree.is_alive());
    }
}
