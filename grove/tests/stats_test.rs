//! Integration tests for forest statistics.
//!
//! These tests drive the statistics from a real forest store and the
//! built-in tags, the way the CLI does.

use chrono::{DateTime, Duration, TimeZone, Utc};
use grove::defaults::{default_tags, demo_tasks, demo_trees};
use grove::forest::ForestStore;
use grove::stats::{self, TREND_DAYS};
use grove::types::{Tag, Tree, TreeStatus, TreeType};

// =============================================================================
// Test Helpers
// =============================================================================

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 12, 18, 0, 0).unwrap()
}

fn tag(id: &str, goal: u32) -> Tag {
    Tag {
        id: id.to_string(),
        name: id.to_string(),
        color: "#000000".to_string(),
        daily_goal: goal,
    }
}

fn plant(forest: &ForestStore, tag_id: &str, status: TreeStatus, minutes: u32, at: DateTime<Utc>) {
    let tree = Tree::new(at, minutes, tag_id.to_string(), None, status, TreeType::Oak);
    forest.append(tree).unwrap();
}

// =============================================================================
// Empty Forest
// =============================================================================

/// Verifies that every statistic has a defined value for an empty forest.
#[test]
fn test_empty_forest_statistics() {
    let trees: Vec<Tree> = Vec::new();
    let tags = default_tags();

    assert_eq!(stats::total_focused_minutes(&trees), 0);
    assert_eq!(stats::trees_grown(&trees), 0);
    assert_eq!(stats::success_rate(&trees), 0.0);
    assert!(stats::distribution_by_tag(&trees, &tags).is_empty());
    assert!(stats::top_project(&trees, &tags).is_none());

    let trend = stats::seven_day_trend(&trees, &now());
    assert_eq!(trend.len(), TREND_DAYS);
    assert!(trend.iter().all(|d| d.minutes == 0));
}

// =============================================================================
// Goals and Rates
// =============================================================================

/// Verifies goal progress with two alive trees today against a goal of two.
#[test]
fn test_daily_goal_met() {
    let forest = ForestStore::new();
    let work = tag("work", 2);
    plant(&forest, "work", TreeStatus::Alive, 25, now() - Duration::hours(3));
    plant(&forest, "work", TreeStatus::Alive, 25, now() - Duration::hours(1));
    plant(&forest, "work", TreeStatus::Withered, 25, now() - Duration::minutes(30));

    let progress = stats::daily_goal_progress(&forest.all(), &work, &now());

    assert_eq!(progress.current, 2);
    assert_eq!(progress.goal, 2);
    assert_eq!(progress.fraction(), 1.0);
    assert!(progress.is_met());
}

/// Verifies that yesterday's trees do not count toward today's goal.
#[test]
fn test_daily_goal_ignores_previous_days() {
    let forest = ForestStore::new();
    let work = tag("work", 2);
    plant(&forest, "work", TreeStatus::Alive, 25, now() - Duration::days(1));

    let progress = stats::daily_goal_progress(&forest.all(), &work, &now());
    assert_eq!(progress.current, 0);
    assert_eq!(progress.fraction(), 0.0);
}

/// Verifies success rate at its extremes and a mixed forest.
#[test]
fn test_success_rate_cases() {
    let forest = ForestStore::new();
    plant(&forest, "work", TreeStatus::Withered, 25, now());
    assert_eq!(stats::success_rate(&forest.all()), 0.0);

    plant(&forest, "work", TreeStatus::Alive, 25, now());
    assert_eq!(stats::success_rate(&forest.all()), 0.5);

    let all_alive = ForestStore::new();
    plant(&all_alive, "rest", TreeStatus::Alive, 10, now());
    assert_eq!(stats::success_rate(&all_alive.all()), 1.0);
}

// =============================================================================
// Properties
// =============================================================================

/// Verifies that statistics are pure: repeated calls agree.
#[test]
fn test_statistics_are_idempotent() {
    let trees = demo_trees(now());
    let tags = default_tags();

    let first = stats::summarize(&trees, &tags, &now());
    let second = stats::summarize(&trees, &tags, &now());

    assert_eq!(first.total_minutes, second.total_minutes);
    assert_eq!(first.distribution, second.distribution);
    assert_eq!(first.trend, second.trend);
    assert_eq!(first.success_rate, second.success_rate);
}

/// Verifies that planting never decreases the total focused minutes.
#[test]
fn test_total_minutes_monotone_under_append() {
    let forest = ForestStore::new();
    let mut previous = 0;

    for (i, status) in [TreeStatus::Alive, TreeStatus::Withered, TreeStatus::Alive]
        .into_iter()
        .enumerate()
    {
        plant(&forest, "study", status, 10 + i as u32 * 10, now());
        let total = stats::total_focused_minutes(&forest.all());
        assert!(total >= previous);
        previous = total;
    }
    assert_eq!(previous, 10 + 30);
}

/// Verifies that the trend always covers seven consecutive days ending today.
#[test]
fn test_trend_covers_last_seven_days() {
    let forest = ForestStore::new();
    plant(&forest, "work", TreeStatus::Alive, 25, now());
    plant(&forest, "work", TreeStatus::Alive, 50, now() - Duration::days(6));
    plant(&forest, "work", TreeStatus::Alive, 99, now() - Duration::days(7));

    let trend = stats::seven_day_trend(&forest.all(), &now());

    assert_eq!(trend.len(), TREND_DAYS);
    assert_eq!(trend[0].date, (now() - Duration::days(6)).date_naive());
    assert_eq!(trend[6].date, now().date_naive());
    assert_eq!(trend[0].minutes, 50);
    assert_eq!(trend[6].minutes, 25);
    assert_eq!(trend.iter().map(|d| d.minutes).sum::<u64>(), 75);
}

// =============================================================================
// Demo Forest
// =============================================================================

/// Verifies the summary of the sample forest shown by `--demo`.
#[test]
fn test_demo_forest_summary() {
    let forest = ForestStore::with_trees(demo_trees(now())).unwrap();
    let summary = stats::summarize(&forest.all(), &default_tags(), &now());

    assert_eq!(summary.total_minutes, 25 + 45);
    assert_eq!(summary.trees_grown, 2);
    assert_eq!(summary.trees_withered, 1);
    assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-9);

    let top = summary.top_project.unwrap();
    assert_eq!(top.tag_id, "study");
    assert_eq!(top.minutes, 45);

    let ids: Vec<&str> = summary.distribution.iter().map(|d| d.tag_id.as_str()).collect();
    assert_eq!(ids, ["work", "study"]);
}

/// Verifies that the sample tasks start with no progress today.
#[test]
fn test_demo_tasks_progress() {
    let trees = demo_trees(now());
    for task in demo_tasks() {
        let progress = stats::task_goal_progress(&trees, &task, &now());
        assert_eq!(progress.current, 0);
        assert_eq!(progress.goal, task.daily_goal);
    }
}
