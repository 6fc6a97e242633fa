//! Forest store: the append-only history of planted trees.
//!
//! # Thread Safety
//!
//! [`ForestStore`] is a cheap handle around shared state guarded by an
//! [`RwLock`]. Clones share the same forest, which lets a story enrichment
//! task patch a tree while the session engine keeps appending.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use grove::forest::ForestStore;
//! use grove::types::{Tree, TreeStatus, TreeType};
//!
//! let forest = ForestStore::new();
//! let tree = Tree::new(
//!     Utc::now(),
//!     25,
//!     "work".to_string(),
//!     None,
//!     TreeStatus::Alive,
//!     TreeType::Oak,
//! );
//! let id = tree.id.clone();
//!
//! forest.append(tree).expect("fresh id");
//! assert!(forest.patch_story(&id, "A sturdy oak."));
//! assert_eq!(forest.all()[0].ai_story.as_deref(), Some("A sturdy oak."));
//! ```

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, trace};

use crate::types::{Tree, TreeStatus};

/// Errors that can occur when writing to the forest.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForestError {
    /// A tree with this ID is already planted.
    #[error("tree id already exists: {0}")]
    DuplicateId(String),
}

/// Shared, append-only collection of trees in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ForestStore {
    trees: Arc<RwLock<Vec<Tree>>>,
}

impl ForestStore {
    /// Creates an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a forest pre-populated with trees, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DuplicateId`] if two trees share an ID.
    pub fn with_trees(trees: impl IntoIterator<Item = Tree>) -> Result<Self, ForestError> {
        let forest = Self::new();
        for tree in trees {
            forest.append(tree)?;
        }
        Ok(forest)
    }

    /// Plants a tree.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::DuplicateId`] if the ID is already in use; the
    /// forest is left unchanged.
    pub fn append(&self, tree: Tree) -> Result<(), ForestError> {
        let mut trees = self.trees.write().unwrap();
        if trees.iter().any(|t| t.id == tree.id) {
            return Err(ForestError::DuplicateId(tree.id));
        }
        debug!(
            tree_id = %tree.id,
            status = ?tree.status,
            duration_minutes = tree.duration_minutes,
            "Tree planted"
        );
        trees.push(tree);
        Ok(())
    }

    /// Attaches a story to an existing tree.
    ///
    /// Returns `false` without touching anything if the tree is not found.
    /// No other field of the tree is modified.
    pub fn patch_story(&self, tree_id: &str, story: &str) -> bool {
        let mut trees = self.trees.write().unwrap();
        match trees.iter_mut().find(|t| t.id == tree_id) {
            Some(tree) => {
                tree.ai_story = Some(story.to_string());
                trace!(tree_id, "Story attached");
                true
            }
            None => {
                debug!(tree_id, "Story dropped, tree not found");
                false
            }
        }
    }

    /// Snapshot of every tree in insertion order.
    ///
    /// The returned vector is independent of later writes.
    #[must_use]
    pub fn all(&self) -> Vec<Tree> {
        self.trees.read().unwrap().clone()
    }

    /// Snapshot sorted by creation time, newest first.
    #[must_use]
    pub fn newest_first(&self) -> Vec<Tree> {
        let mut trees = self.all();
        trees.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        trees
    }

    /// Looks up a single tree by ID.
    #[must_use]
    pub fn get(&self, tree_id: &str) -> Option<Tree> {
        self.trees
            .read()
            .unwrap()
            .iter()
            .find(|t| t.id == tree_id)
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.read().unwrap().is_empty()
    }

    /// Number of trees from completed sessions.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.count_status(TreeStatus::Alive)
    }

    /// Number of trees from abandoned sessions.
    #[must_use]
    pub fn withered_count(&self) -> usize {
        self.count_status(TreeStatus::Withered)
    }

    fn count_status(&self, status: TreeStatus) -> usize {
        self.trees
            .read()
            .unwrap()
            .iter()
            .filter(|t| t.status == status)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TreeType;
    use chrono::{Duration, Utc};
    use tokio_test::{assert_err, assert_ok};

    fn tree(id: &str, status: TreeStatus, minutes_ago: i64) -> Tree {
        Tree {
            id: id.to_string(),
            created_at: Utc::now() - Duration::minutes(minutes_ago),
            duration_minutes: 25,
            tag_id: "work".to_string(),
            task_id: None,
            status,
            tree_type: TreeType::Oak,
            ai_story: None,
        }
    }

    #[test]
    fn append_preserves_insertion_order() {
        let forest = ForestStore::new();
        assert_ok!(forest.append(tree("a", TreeStatus::Alive, 0)));
        assert_ok!(forest.append(tree("b", TreeStatus::Withered, 10)));

        let ids: Vec<String> = forest.all().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(forest.len(), 2);
    }

    #[test]
    fn append_rejects_duplicate_id() {
        let forest = ForestStore::new();
        assert_ok!(forest.append(tree("a", TreeStatus::Alive, 0)));

        let err = assert_err!(forest.append(tree("a", TreeStatus::Withered, 0)));
        assert_eq!(err, ForestError::DuplicateId("a".to_string()));
        assert_eq!(forest.len(), 1);
        assert_eq!(forest.all()[0].status, TreeStatus::Alive);
    }

    #[test]
    fn patch_story_sets_only_story() {
        let forest = ForestStore::new();
        let original = tree("a", TreeStatus::Alive, 0);
        forest.append(original.clone()).unwrap();

        assert!(forest.patch_story("a", "A tall oak."));

        let patched = forest.get("a").unwrap();
        assert_eq!(patched.ai_story.as_deref(), Some("A tall oak."));
        assert_eq!(
            Tree {
                ai_story: None,
                ..patched
            },
            original
        );
    }

    #[test]
    fn patch_story_on_missing_tree_is_noop() {
        let forest = ForestStore::new();
        forest.append(tree("a", TreeStatus::Alive, 0)).unwrap();

        assert!(!forest.patch_story("missing", "story"));
        assert!(forest.get("a").unwrap().ai_story.is_none());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_writes() {
        let forest = ForestStore::new();
        forest.append(tree("a", TreeStatus::Alive, 0)).unwrap();

        let snapshot = forest.all();
        forest.append(tree("b", TreeStatus::Alive, 0)).unwrap();
        forest.patch_story("a", "later");

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].ai_story.is_none());
    }

    #[test]
    fn clones_share_the_same_forest() {
        let forest = ForestStore::new();
        let handle = forest.clone();
        handle.append(tree("a", TreeStatus::Alive, 0)).unwrap();
        assert_eq!(forest.len(), 1);
    }

    #[test]
    fn newest_first_sorts_by_creation_time() {
        let forest = ForestStore::with_trees(vec![
            tree("old", TreeStatus::Alive, 120),
            tree("new", TreeStatus::Alive, 1),
            tree("mid", TreeStatus::Withered, 60),
        ])
        .unwrap();

        let ids: Vec<String> = forest.newest_first().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[test]
    fn counts_by_status() {
        let forest = ForestStore::with_trees(vec![
            tree("a", TreeStatus::Alive, 0),
            tree("b", TreeStatus::Withered, 0),
            tree("c", TreeStatus::Alive, 0),
        ])
        .unwrap();

        assert_eq!(forest.alive_count(), 2);
        assert_eq!(forest.withered_count(), 1);
        assert!(!forest.is_empty());
    }
}
