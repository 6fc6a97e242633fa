//! Statistics derived from the forest.
//!
//! Every function here is pure: it reads a tree snapshot, the tag list and a
//! reference time, and recomputes its answer from scratch. Only alive trees
//! count toward focused time; withered trees only affect the success rate.
//!
//! Calendar days are taken in the time zone of `now`, so callers pass
//! `Local::now()` in production and a fixed offset in tests.

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::Serialize;

use crate::types::{Tag, Task, Tree};

/// Number of days covered by [`seven_day_trend`].
pub const TREND_DAYS: usize = 7;

/// Focused minutes for one tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMinutes {
    pub tag_id: String,
    pub name: String,
    pub color: String,
    pub minutes: u64,
}

/// Focused minutes on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMinutes {
    pub date: NaiveDate,
    pub minutes: u64,
}

impl DayMinutes {
    /// Short weekday name, e.g. `Mon`.
    #[must_use]
    pub fn weekday_label(&self) -> String {
        self.date.format("%a").to_string()
    }
}

/// Completed sessions today against a daily goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GoalProgress {
    pub current: u32,
    pub goal: u32,
}

impl GoalProgress {
    /// Progress as a fraction capped at 1.0.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.goal == 0 {
            return 1.0;
        }
        (f64::from(self.current) / f64::from(self.goal)).min(1.0)
    }

    #[must_use]
    pub fn is_met(&self) -> bool {
        self.current >= self.goal
    }
}

/// Per-project insight row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInsight {
    pub tag_id: String,
    pub name: String,
    pub total_minutes: u64,
    pub total_trees: usize,
    pub today: GoalProgress,
}

/// Every aggregate the stats view shows, computed in one pass over the inputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub total_minutes: u64,
    pub total_hours: f64,
    pub trees_grown: usize,
    pub trees_withered: usize,
    pub success_rate: f64,
    pub top_project: Option<TagMinutes>,
    pub distribution: Vec<TagMinutes>,
    pub trend: Vec<DayMinutes>,
    pub insights: Vec<TagInsight>,
}

fn alive(trees: &[Tree]) -> impl Iterator<Item = &Tree> {
    trees.iter().filter(|t| t.is_alive())
}

fn local_date<Tz: TimeZone>(tree: &Tree, tz: &Tz) -> NaiveDate {
    tree.created_at.with_timezone(tz).date_naive()
}

fn created_today<Tz: TimeZone>(tree: &Tree, now: &DateTime<Tz>) -> bool {
    local_date(tree, &now.timezone()) >= now.date_naive()
}

/// Sum of durations over all alive trees.
#[must_use]
pub fn total_focused_minutes(trees: &[Tree]) -> u64 {
    alive(trees).map(|t| u64::from(t.duration_minutes)).sum()
}

/// Total focused time in hours.
#[must_use]
pub fn total_focused_hours(trees: &[Tree]) -> f64 {
    total_focused_minutes(trees) as f64 / 60.0
}

/// Number of alive trees.
#[must_use]
pub fn trees_grown(trees: &[Tree]) -> usize {
    alive(trees).count()
}

/// Alive trees over all trees, or 0 for an empty forest.
#[must_use]
pub fn success_rate(trees: &[Tree]) -> f64 {
    if trees.is_empty() {
        return 0.0;
    }
    trees_grown(trees) as f64 / trees.len() as f64
}

/// Focused minutes per tag, in tag declaration order, omitting tags with no
/// alive trees.
#[must_use]
pub fn distribution_by_tag(trees: &[Tree], tags: &[Tag]) -> Vec<TagMinutes> {
    tags.iter()
        .map(|tag| TagMinutes {
            tag_id: tag.id.clone(),
            name: tag.name.clone(),
            color: tag.color.clone(),
            minutes: alive(trees)
                .filter(|t| t.tag_id == tag.id)
                .map(|t| u64::from(t.duration_minutes))
                .sum(),
        })
        .filter(|d| d.minutes > 0)
        .collect()
}

/// The tag with the most focused minutes. Ties go to the earlier declared
/// tag. `None` when nothing has been grown.
#[must_use]
pub fn top_project(trees: &[Tree], tags: &[Tag]) -> Option<TagMinutes> {
    distribution_by_tag(trees, tags)
        .into_iter()
        .fold(None, |best: Option<TagMinutes>, entry| match best {
            Some(b) if b.minutes >= entry.minutes => Some(b),
            _ => Some(entry),
        })
}

/// Focused minutes for the seven calendar days ending on the day of `now`,
/// oldest first.
#[must_use]
pub fn seven_day_trend<Tz: TimeZone>(trees: &[Tree], now: &DateTime<Tz>) -> Vec<DayMinutes> {
    let tz = now.timezone();
    let today = now.date_naive();

    (0..TREND_DAYS as u64)
        .rev()
        .map(|back| {
            let date = today.checked_sub_days(Days::new(back)).unwrap_or(today);
            let minutes = alive(trees)
                .filter(|t| local_date(t, &tz) == date)
                .map(|t| u64::from(t.duration_minutes))
                .sum();
            DayMinutes { date, minutes }
        })
        .collect()
}

/// Alive trees for `tag` created today, against the tag's daily goal.
#[must_use]
pub fn daily_goal_progress<Tz: TimeZone>(
    trees: &[Tree],
    tag: &Tag,
    now: &DateTime<Tz>,
) -> GoalProgress {
    let current = alive(trees)
        .filter(|t| t.tag_id == tag.id && created_today(t, now))
        .count();
    GoalProgress {
        current: u32::try_from(current).unwrap_or(u32::MAX),
        goal: tag.daily_goal,
    }
}

/// Alive trees linked to `task` created today, against the task's goal.
#[must_use]
pub fn task_goal_progress<Tz: TimeZone>(
    trees: &[Tree],
    task: &Task,
    now: &DateTime<Tz>,
) -> GoalProgress {
    let current = alive(trees)
        .filter(|t| t.task_id.as_deref() == Some(task.id.as_str()) && created_today(t, now))
        .count();
    GoalProgress {
        current: u32::try_from(current).unwrap_or(u32::MAX),
        goal: task.daily_goal,
    }
}

/// Lifetime totals and today's progress for every tag.
#[must_use]
pub fn tag_insights<Tz: TimeZone>(
    trees: &[Tree],
    tags: &[Tag],
    now: &DateTime<Tz>,
) -> Vec<TagInsight> {
    tags.iter()
        .map(|tag| {
            let grown: Vec<&Tree> = alive(trees).filter(|t| t.tag_id == tag.id).collect();
            TagInsight {
                tag_id: tag.id.clone(),
                name: tag.name.clone(),
                total_minutes: grown.iter().map(|t| u64::from(t.duration_minutes)).sum(),
                total_trees: grown.len(),
                today: daily_goal_progress(trees, tag, now),
            }
        })
        .collect()
}

/// Computes the full summary.
#[must_use]
pub fn summarize<Tz: TimeZone>(trees: &[Tree], tags: &[Tag], now: &DateTime<Tz>) -> StatsSummary {
    StatsSummary {
        total_minutes: total_focused_minutes(trees),
        total_hours: total_focused_hours(trees),
        trees_grown: trees_grown(trees),
        trees_withered: trees.len() - trees_grown(trees),
        success_rate: success_rate(trees),
        top_project: top_project(trees, tags),
        distribution: distribution_by_tag(trees, tags),
        trend: seven_day_trend(trees, now),
        insights: tag_insights(trees, tags, now),
    }
}
