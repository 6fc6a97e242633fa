//! Tag and task registries.
//!
//! Both registries are plain owned stores: callers hold them and pass them
//! by reference to whatever needs to resolve IDs. Tags are never deleted and
//! only their daily goal may change; tasks can be created and deleted.

use thiserror::Error;
use tracing::{debug, info};

use crate::defaults::{default_tags, UNKNOWN_TAG_COLOR, UNKNOWN_TAG_NAME};
use crate::types::{generate_id, Tag, Task, TAG_ID_PREFIX, TASK_ID_PREFIX};

/// Errors from tag and task registry operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Name was empty after trimming.
    #[error("name cannot be empty")]
    EmptyName,

    /// Daily goal must be at least 1.
    #[error("daily goal must be at least 1, got {0}")]
    InvalidGoal(u32),

    #[error("unknown tag: {0}")]
    UnknownTag(String),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    /// An entry with this ID is already registered.
    #[error("duplicate id: {0}")]
    DuplicateId(String),
}

fn validate_name(name: &str) -> Result<String, RegistryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::EmptyName);
    }
    Ok(trimmed.to_string())
}

fn validate_goal(goal: u32) -> Result<u32, RegistryError> {
    if goal == 0 {
        return Err(RegistryError::InvalidGoal(goal));
    }
    Ok(goal)
}

/// Ordered collection of tags. Declaration order is kept.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: Vec<Tag>,
}

impl TagRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in tags.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            tags: default_tags(),
        }
    }

    /// Creates a new tag with a generated ID and appends it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyName`] for a blank name and
    /// [`RegistryError::InvalidGoal`] for a zero goal.
    pub fn create(
        &mut self,
        name: &str,
        color: &str,
        daily_goal: u32,
    ) -> Result<Tag, RegistryError> {
        let tag = Tag {
            id: generate_id(TAG_ID_PREFIX),
            name: validate_name(name)?,
            color: color.to_string(),
            daily_goal: validate_goal(daily_goal)?,
        };
        self.insert(tag.clone())?;
        Ok(tag)
    }

    /// Appends an already-built tag, validating it like [`create`](Self::create).
    ///
    /// # Errors
    ///
    /// Fails on a blank name, a zero goal, or an ID already in use.
    pub fn insert(&mut self, tag: Tag) -> Result<(), RegistryError> {
        validate_name(&tag.name)?;
        validate_goal(tag.daily_goal)?;
        if self.get(&tag.id).is_some() {
            return Err(RegistryError::DuplicateId(tag.id));
        }
        info!(tag_id = %tag.id, name = %tag.name, "Project created");
        self.tags.push(tag);
        Ok(())
    }

    /// Changes the daily goal of an existing tag.
    ///
    /// # Errors
    ///
    /// Fails if the goal is zero or the tag does not exist.
    pub fn update_goal(&mut self, tag_id: &str, daily_goal: u32) -> Result<&Tag, RegistryError> {
        let goal = validate_goal(daily_goal)?;
        let tag = self
            .tags
            .iter_mut()
            .find(|t| t.id == tag_id)
            .ok_or_else(|| RegistryError::UnknownTag(tag_id.to_string()))?;
        tag.daily_goal = goal;
        info!(tag_id = %tag.id, daily_goal = goal, "Daily goal updated");
        Ok(tag)
    }

    #[must_use]
    pub fn get(&self, tag_id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == tag_id)
    }

    /// All tags in declaration order.
    #[must_use]
    pub fn all(&self) -> &[Tag] {
        &self.tags
    }

    /// Name for display, falling back for unresolved IDs.
    #[must_use]
    pub fn display_name(&self, tag_id: &str) -> &str {
        self.get(tag_id).map_or(UNKNOWN_TAG_NAME, |t| t.name.as_str())
    }

    /// Color for display, falling back for unresolved IDs.
    #[must_use]
    pub fn display_color(&self, tag_id: &str) -> &str {
        self.get(tag_id).map_or(UNKNOWN_TAG_COLOR, |t| t.color.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Collection of tasks, each belonging to one tag.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a task under an existing tag.
    ///
    /// # Errors
    ///
    /// Fails if the tag is unknown, the name is blank, or the goal is zero.
    pub fn create(
        &mut self,
        tags: &TagRegistry,
        tag_id: &str,
        name: &str,
        daily_goal: u32,
    ) -> Result<Task, RegistryError> {
        if tags.get(tag_id).is_none() {
            return Err(RegistryError::UnknownTag(tag_id.to_string()));
        }
        let task = Task {
            id: generate_id(TASK_ID_PREFIX),
            tag_id: tag_id.to_string(),
            name: validate_name(name)?,
            daily_goal: validate_goal(daily_goal)?,
        };
        info!(task_id = %task.id, tag_id = %task.tag_id, name = %task.name, "Task added");
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Appends an already-built task, validating it like [`create`](Self::create).
    ///
    /// # Errors
    ///
    /// Fails on an unknown tag, invalid fields, or an ID already in use.
    pub fn insert(&mut self, tags: &TagRegistry, task: Task) -> Result<(), RegistryError> {
        if tags.get(&task.tag_id).is_none() {
            return Err(RegistryError::UnknownTag(task.tag_id));
        }
        validate_name(&task.name)?;
        validate_goal(task.daily_goal)?;
        if self.get(&task.id).is_some() {
            return Err(RegistryError::DuplicateId(task.id));
        }
        self.tasks.push(task);
        Ok(())
    }

    /// Removes a task and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownTask`] if no task has this ID.
    pub fn delete(&mut self, task_id: &str) -> Result<Task, RegistryError> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| RegistryError::UnknownTask(task_id.to_string()))?;
        let task = self.tasks.remove(idx);
        debug!(task_id = %task.id, "Task deleted");
        Ok(task)
    }

    #[must_use]
    pub fn get(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    /// Tasks belonging to one tag, in creation order.
    pub fn for_tag<'a>(&'a self, tag_id: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |t| t.tag_id == tag_id)
    }

    #[must_use]
    pub fn all(&self) -> &[Task] {
        &self.tasks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_tag_trims_name_and_keeps_order() {
        let mut tags = TagRegistry::with_defaults();
        let tag = tags.create("  Side Project ", "#ef4444", 3).unwrap();

        assert_eq!(tag.name, "Side Project");
        assert!(tag.id.starts_with("tag_"));
        assert_eq!(tags.all().last().unwrap().id, tag.id);
        assert_eq!(tags.len(), 6);
    }

    #[test]
    fn create_tag_rejects_blank_name() {
        let mut tags = TagRegistry::new();
        assert_eq!(tags.create("   ", "#fff", 2), Err(RegistryError::EmptyName));
        assert!(tags.is_empty());
    }

    #[test]
    fn create_tag_rejects_zero_goal() {
        let mut tags = TagRegistry::new();
        assert_eq!(tags.create("Work", "#fff", 0), Err(RegistryError::InvalidGoal(0)));
    }

    #[test]
    fn insert_rejects_duplicate_id() {
        let mut tags = TagRegistry::with_defaults();
        let dup = tags.get("work").unwrap().clone();
        assert_eq!(tags.insert(dup), Err(RegistryError::DuplicateId("work".to_string())));
    }

    #[test]
    fn update_goal_changes_only_goal() {
        let mut tags = TagRegistry::with_defaults();
        let updated = tags.update_goal("work", 3).unwrap().clone();

        assert_eq!(updated.daily_goal, 3);
        assert_eq!(updated.name, "Work");
        assert_eq!(tags.get("work").unwrap().daily_goal, 3);
    }

    #[test]
    fn update_goal_rejects_zero_and_unknown() {
        let mut tags = TagRegistry::with_defaults();
        assert_eq!(tags.update_goal("work", 0), Err(RegistryError::InvalidGoal(0)));
        assert_eq!(
            tags.update_goal("nope", 2),
            Err(RegistryError::UnknownTag("nope".to_string()))
        );
        assert_eq!(tags.get("work").unwrap().daily_goal, 8);
    }

    #[test]
    fn display_falls_back_for_unknown_tag() {
        let tags = TagRegistry::with_defaults();
        assert_eq!(tags.display_name("study"), "Study");
        assert_eq!(tags.display_name("gone"), "Unknown");
        assert_eq!(tags.display_color("gone"), "#64748b");
    }

    #[test]
    fn task_requires_known_tag() {
        let tags = TagRegistry::with_defaults();
        let mut tasks = TaskRegistry::new();

        let err = tasks.create(&tags, "missing", "Read", 1).unwrap_err();
        assert_eq!(err, RegistryError::UnknownTag("missing".to_string()));

        let task = tasks.create(&tags, "study", "Read Chapter", 2).unwrap();
        assert_eq!(task.tag_id, "study");
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn tasks_filter_by_tag() {
        let tags = TagRegistry::with_defaults();
        let mut tasks = TaskRegistry::new();
        tasks.create(&tags, "study", "Read", 1).unwrap();
        tasks.create(&tags, "work", "Inbox", 1).unwrap();
        tasks.create(&tags, "study", "Notes", 1).unwrap();

        let names: Vec<&str> = tasks.for_tag("study").map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Read", "Notes"]);
    }

    #[test]
    fn delete_task_removes_it() {
        let tags = TagRegistry::with_defaults();
        let mut tasks = TaskRegistry::new();
        let task = tasks.create(&tags, "work", "Inbox", 1).unwrap();

        let removed = tasks.delete(&task.id).unwrap();
        assert_eq!(removed, task);
        assert!(tasks.is_empty());
        assert_eq!(
            tasks.delete(&task.id),
            Err(RegistryError::UnknownTask(task.id.clone()))
        );
    }
}
