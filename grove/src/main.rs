//! Grove - focus timer that grows a forest.
//!
//! This binary runs focus sessions in the terminal and prints the resulting
//! forest and statistics.
//!
//! # Commands
//!
//! - `grove run`: Run one focus session; Ctrl+C abandons it
//! - `grove stats`: Print focus statistics
//! - `grove forest`: List planted trees, newest first
//! - `grove tags`: List projects and their tasks
//!
//! # Environment Variables
//!
//! See the [`config`] module for available configuration options.

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use grove::config::Config;
use grove::defaults::{demo_tasks, demo_trees};
use grove::forest::ForestStore;
use grove::narrative::{Enricher, GeminiClient};
use grove::registry::{TagRegistry, TaskRegistry};
use grove::session::{SessionEngine, SessionError, SessionPhase, SessionPlan};
use grove::stats::{self, StatsSummary};
use grove::types::{TreeStatus, TreeType};

/// Grove - focus timer that grows a forest.
///
/// Every completed session grows a tree; every abandoned one withers.
#[derive(Parser, Debug)]
#[command(name = "grove")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    GROVE_API_KEY              Gemini API key (enables generated tree stories)
    GROVE_STORY_MODEL          Story model (default: gemini-2.5-flash)
    GROVE_STORY_URL            Story API base URL
    GROVE_STORY_TIMEOUT_SECS   Story timeout in seconds (default: 30)
    GROVE_STORY_RETRY_LIMIT    Story request attempts, 1-10 (default: 3)
    GROVE_DEFAULT_DURATION     Session length in minutes, 10-120 (default: 25)

EXAMPLES:
    # Focus on work for 25 minutes, growing an oak
    grove run --tag work --tree oak

    # A 50 minute study session on a sample task
    grove run --demo --tag study --task t1 --duration 50

    # Statistics for the sample forest as JSON
    grove stats --demo --json
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run one focus session.
    ///
    /// The tree grows when the countdown reaches zero. Ctrl+C abandons the
    /// session and the tree withers.
    Run {
        /// Session length in minutes (10-120).
        #[arg(short, long)]
        duration: Option<u32>,

        /// Project tag ID.
        #[arg(short, long, default_value = "work")]
        tag: String,

        /// Tree type: oak, pine, willow, bamboo or cactus.
        #[arg(long, default_value = "oak", value_parser = parse_tree_type)]
        tree: TreeType,

        /// Task ID within the tag.
        #[arg(long)]
        task: Option<String>,

        /// Start from the sample forest and tasks.
        #[arg(long)]
        demo: bool,
    },

    /// Print focus statistics.
    Stats {
        #[arg(long)]
        demo: bool,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List planted trees, newest first.
    Forest {
        #[arg(long)]
        demo: bool,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List projects and their tasks.
    Tags {
        #[arg(long)]
        demo: bool,
    },
}

fn parse_tree_type(s: &str) -> Result<TreeType, String> {
    TreeType::parse(s).ok_or_else(|| format!("unknown tree type '{s}'"))
}

/// Tags, tasks and trees held for the lifetime of the process.
struct Garden {
    tags: TagRegistry,
    tasks: TaskRegistry,
    forest: ForestStore,
}

impl Garden {
    fn new(demo: bool) -> Result<Self> {
        let tags = TagRegistry::with_defaults();
        let mut tasks = TaskRegistry::new();
        let forest = if demo {
            for task in demo_tasks() {
                tasks.insert(&tags, task).context("Failed to load sample tasks")?;
            }
            ForestStore::with_trees(demo_trees(Utc::now())).context("Failed to load sample forest")?
        } else {
            ForestStore::new()
        };

        Ok(Self { tags, tasks, forest })
    }

    fn summary(&self) -> StatsSummary {
        stats::summarize(&self.forest.all(), self.tags.all(), &Local::now())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            duration,
            tag,
            tree,
            task,
            demo,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;

            runtime.block_on(run_session(duration, tag, tree, task, demo))
        }
        Command::Stats { demo, json } => run_stats(demo, json),
        Command::Forest { demo, json } => run_forest(demo, json),
        Command::Tags { demo } => run_tags(demo),
    }
}

/// Runs a single session to completion or abandonment.
async fn run_session(
    duration: Option<u32>,
    tag_id: String,
    tree_type: TreeType,
    task_id: Option<String>,
    demo: bool,
) -> Result<()> {
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    let garden = Garden::new(demo)?;

    let enricher = match &config.narrative {
        Some(narrative) => {
            info!(model = %narrative.model, "Tree stories enabled");
            let client =
                GeminiClient::new(narrative.clone()).context("Failed to create story client")?;
            Enricher::new(client, narrative.timeout)
        }
        None => {
            info!("GROVE_API_KEY not set, tree stories use the fallback text");
            Enricher::disabled()
        }
    };

    let mut plan = SessionPlan::new(tag_id, tree_type)
        .with_duration(duration.unwrap_or(config.default_duration_minutes));
    plan.task_id = task_id;

    let mut engine = SessionEngine::new(garden.forest.clone(), enricher);
    engine
        .configure(plan, &garden.tags, &garden.tasks)
        .context("Invalid session settings")?;
    engine.start().context("Failed to start session")?;

    let mut updates = engine.subscribe();
    let snapshot = updates.borrow_and_update().clone();
    if let Some(quote) = snapshot.quote {
        println!("{quote}");
    }
    println!(
        "Growing a {} for {} minutes. Press Ctrl+C to give up.",
        tree_type, snapshot.duration_minutes
    );

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                println!();
                match engine.abandon() {
                    Ok(tree) => println!(
                        "Oh no! Your {} withered. ({} minutes, {})",
                        tree.tree_type,
                        tree.duration_minutes,
                        garden.tags.display_name(&tree.tag_id)
                    ),
                    // The countdown finished first; report the grown tree
                    Err(SessionError::NotRunning) => {
                        debug!("Shutdown arrived after completion");
                    }
                    Err(e) => return Err(e).context("Failed to abandon session"),
                }
                break;
            }

            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("Session updates closed");
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.phase == SessionPhase::Idle {
                    println!();
                    break;
                }
                print!("\r{}  {:>3.0}%", snapshot.clock(), snapshot.progress() * 100.0);
                io::stdout().flush()?;
            }
        }
    }

    engine.story_settled().await;

    if let Some(outcome) = engine.snapshot().last_outcome {
        if outcome.status == TreeStatus::Alive {
            if let Some(tree) = garden.forest.get(&outcome.tree_id) {
                println!("Great job! You grew a {}!", tree.tree_type);
                if let Some(story) = tree.ai_story {
                    println!("\"{story}\"");
                }
            }
        }
    }

    println!();
    print_summary(&garden.summary());
    Ok(())
}

fn run_stats(demo: bool, json: bool) -> Result<()> {
    let garden = Garden::new(demo)?;
    let summary = garden.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn run_forest(demo: bool, json: bool) -> Result<()> {
    let garden = Garden::new(demo)?;
    let trees = garden.forest.newest_first();

    if json {
        println!("{}", serde_json::to_string_pretty(&trees)?);
        return Ok(());
    }

    if trees.is_empty() {
        println!("Your forest is empty. Run a session to plant your first tree.");
        return Ok(());
    }

    for tree in &trees {
        let status = match tree.status {
            TreeStatus::Alive => "grown",
            TreeStatus::Withered => "withered",
        };
        println!(
            "{}  {:<7} {:<9} {:>3} min  {}",
            tree.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            tree.tree_type,
            status,
            tree.duration_minutes,
            garden.tags.display_name(&tree.tag_id),
        );
        if let Some(story) = &tree.ai_story {
            println!("    {story}");
        }
    }
    println!(
        "{} grown, {} withered",
        garden.forest.alive_count(),
        garden.forest.withered_count()
    );
    Ok(())
}

fn run_tags(demo: bool) -> Result<()> {
    let garden = Garden::new(demo)?;
    let forest = garden.forest.all();
    let now = Local::now();

    for tag in garden.tags.all() {
        let today = stats::daily_goal_progress(&forest, tag, &now);
        println!(
            "{:<15} {:<14} {} today {}/{}",
            tag.id, tag.name, tag.color, today.current, today.goal
        );
        for task in garden.tasks.for_tag(&tag.id) {
            let progress = stats::task_goal_progress(&forest, task, &now);
            println!(
                "    {:<10} {:<20} {}/{}",
                task.id, task.name, progress.current, progress.goal
            );
        }
    }
    Ok(())
}

fn print_summary(summary: &StatsSummary) {
    println!("Total focus:   {:.1}h", summary.total_hours);
    println!(
        "Top project:   {}",
        summary.top_project.as_ref().map_or("none", |t| t.name.as_str())
    );
    println!("Trees grown:   {}", summary.trees_grown);
    println!("Success rate:  {:.0}%", summary.success_rate * 100.0);

    println!();
    println!("Last 7 days:");
    for day in &summary.trend {
        println!("  {} {:>4} min", day.weekday_label(), day.minutes);
    }

    if !summary.distribution.is_empty() {
        println!();
        println!("By project:");
        for entry in &summary.distribution {
            println!("  {:<15} {:>4} min", entry.name, entry.minutes);
        }
    }

    println!();
    println!("Today's goals:");
    for insight in &summary.insights {
        println!(
            "  {:<15} {}/{} ({:.0}%)  {} trees, {} min total",
            insight.name,
            insight.today.current,
            insight.today.goal,
            insight.today.fraction() * 100.0,
            insight.total_trees,
            insight.total_minutes,
        );
    }
}

/// Initializes the logging subsystem.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
