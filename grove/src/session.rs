//! Focus session lifecycle.
//!
//! # Architecture
//!
//! [`Session`] is the synchronous state machine
//! (`Idle → Running → {Completed | Abandoned} → Idle`). It owns the countdown
//! and turns each outcome into a [`Tree`], but never touches a clock or a
//! store on its own.
//!
//! [`SessionEngine`] drives a `Session` on the tokio runtime:
//!
//! 1. `start` spawns a ticker task that calls [`Session::tick`] once a second
//! 2. When the countdown reaches zero the ticker plants the alive tree,
//!    requests a story, publishes a snapshot and exits
//! 3. `abandon` aborts the ticker first, then plants the withered tree
//!
//! The ticker handle is aborted on every exit path, including drop, and a
//! tick that arrives after the session left `Running` is ignored.
//!
//! Observers follow progress through a [`tokio::sync::watch`] channel of
//! [`SessionSnapshot`]s.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info};

use crate::defaults::{
    random_quote, DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES,
};
use crate::forest::{ForestError, ForestStore};
use crate::narrative::{Enricher, StoryGenerator};
use crate::registry::{TagRegistry, TaskRegistry};
use crate::types::{Tag, Tree, TreeStatus, TreeType};

/// Countdown resolution.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from session transitions. A rejected call leaves the session as it was.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Duration outside the allowed range.
    #[error("duration must be between 10 and 120 minutes, got {0}")]
    InvalidDuration(u32),

    #[error("unknown tag: {0}")]
    UnknownTag(String),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    /// The task exists but belongs to another tag.
    #[error("task {task_id} does not belong to tag {tag_id}")]
    TaskTagMismatch { task_id: String, tag_id: String },

    /// `start` was called before `configure`.
    #[error("session has not been configured")]
    NotConfigured,

    #[error("session is already running")]
    AlreadyRunning,

    #[error("session is not running")]
    NotRunning,

    /// Duration cannot change while the countdown runs.
    #[error("duration is locked while the session is running")]
    DurationLocked,

    /// The planted tree could not be stored.
    #[error("forest error: {0}")]
    Forest(#[from] ForestError),
}

/// Whether a countdown is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
}

/// Parameters for the next session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub duration_minutes: u32,
    pub tag_id: String,
    pub tree_type: TreeType,
    pub task_id: Option<String>,
}

impl SessionPlan {
    /// Plan with the default duration and no task.
    #[must_use]
    pub fn new(tag_id: impl Into<String>, tree_type: TreeType) -> Self {
        Self {
            duration_minutes: DEFAULT_DURATION_MINUTES,
            tag_id: tag_id.into(),
            tree_type,
            task_id: None,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = minutes;
        self
    }

    #[must_use]
    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }
}

/// How the most recent session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub tree_id: String,
    pub status: TreeStatus,
}

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub duration_minutes: u32,
    pub remaining_seconds: u32,
    pub tag_id: Option<String>,
    pub quote: Option<&'static str>,
    pub last_outcome: Option<SessionOutcome>,
}

impl SessionSnapshot {
    /// Elapsed fraction of the countdown, in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let total = self.duration_minutes * 60;
        if total == 0 {
            return 0.0;
        }
        f64::from(total.saturating_sub(self.remaining_seconds)) / f64::from(total)
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn clock(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

/// Formats seconds as zero-padded `MM:SS`.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Result of one countdown tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// The session was not running; nothing changed.
    Ignored,
    /// Still counting down.
    Running { remaining_seconds: u32 },
    /// The countdown reached zero and the session completed.
    Completed { tree: Tree, tag: Tag },
}

/// Synchronous session state machine.
#[derive(Debug, Clone)]
pub struct Session {
    phase: SessionPhase,
    duration_minutes: u32,
    remaining_seconds: u32,
    tag: Option<Tag>,
    tree_type: TreeType,
    task_id: Option<String>,
    quote: Option<&'static str>,
    last_outcome: Option<SessionOutcome>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            remaining_seconds: DEFAULT_DURATION_MINUTES * 60,
            tag: None,
            tree_type: TreeType::Oak,
            task_id: None,
            quote: None,
            last_outcome: None,
        }
    }
}

fn check_duration(minutes: u32) -> Result<u32, SessionError> {
    if (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(SessionError::InvalidDuration(minutes))
    }
}

impl Session {
    /// Idle session with the default duration and nothing configured.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the parameters for the next session.
    ///
    /// # Errors
    ///
    /// Rejected while running, for a duration outside `[10, 120]`, for an
    /// unknown tag, or for a task that is unknown or belongs to another tag.
    pub fn configure(
        &mut self,
        plan: SessionPlan,
        tags: &TagRegistry,
        tasks: &TaskRegistry,
    ) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Running {
            return Err(SessionError::AlreadyRunning);
        }
        let duration = check_duration(plan.duration_minutes)?;
        let tag = tags
            .get(&plan.tag_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownTag(plan.tag_id.clone()))?;
        if let Some(task_id) = &plan.task_id {
            let task = tasks
                .get(task_id)
                .ok_or_else(|| SessionError::UnknownTask(task_id.clone()))?;
            if task.tag_id != tag.id {
                return Err(SessionError::TaskTagMismatch {
                    task_id: task_id.clone(),
                    tag_id: tag.id,
                });
            }
        }

        self.duration_minutes = duration;
        self.remaining_seconds = duration * 60;
        self.tag = Some(tag);
        self.tree_type = plan.tree_type;
        self.task_id = plan.task_id;
        Ok(())
    }

    /// Changes the duration while idle and resets the countdown to match.
    ///
    /// # Errors
    ///
    /// [`SessionError::DurationLocked`] while running,
    /// [`SessionError::InvalidDuration`] outside `[10, 120]`.
    pub fn set_duration(&mut self, minutes: u32) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Running {
            return Err(SessionError::DurationLocked);
        }
        let minutes = check_duration(minutes)?;
        self.duration_minutes = minutes;
        self.remaining_seconds = minutes * 60;
        Ok(())
    }

    /// Begins the countdown.
    ///
    /// # Errors
    ///
    /// Rejected if already running or not configured.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase == SessionPhase::Running {
            return Err(SessionError::AlreadyRunning);
        }
        if self.tag.is_none() {
            return Err(SessionError::NotConfigured);
        }
        self.phase = SessionPhase::Running;
        self.remaining_seconds = self.duration_minutes * 60;
        self.quote = Some(random_quote());
        Ok(())
    }

    /// Advances the countdown by one second, completing at zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.phase != SessionPhase::Running {
            return Tick::Ignored;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return Tick::Running {
                remaining_seconds: self.remaining_seconds,
            };
        }

        match self.finish(now, TreeStatus::Alive) {
            Some((tree, tag)) => Tick::Completed { tree, tag },
            None => Tick::Ignored,
        }
    }

    /// Gives up on the running session and returns the withered tree.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotRunning`] if no countdown is in progress.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<Tree, SessionError> {
        if self.phase != SessionPhase::Running {
            return Err(SessionError::NotRunning);
        }
        self.finish(now, TreeStatus::Withered)
            .map(|(tree, _)| tree)
            .ok_or(SessionError::NotConfigured)
    }

    /// Drops a running countdown without planting anything.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Idle;
        self.remaining_seconds = self.duration_minutes * 60;
        self.quote = None;
    }

    fn finish(&mut self, now: DateTime<Utc>, status: TreeStatus) -> Option<(Tree, Tag)> {
        let tag = self.tag.clone()?;
        let task_id = match status {
            TreeStatus::Alive => self.task_id.clone(),
            TreeStatus::Withered => None,
        };
        let tree = Tree::new(
            now,
            self.duration_minutes,
            tag.id.clone(),
            task_id,
            status,
            self.tree_type,
        );

        self.reset();
        self.last_outcome = Some(SessionOutcome {
            tree_id: tree.id.clone(),
            status,
        });
        Some((tree, tag))
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// The configured tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            duration_minutes: self.duration_minutes,
            remaining_seconds: self.remaining_seconds,
            tag_id: self.tag.as_ref().map(|t| t.id.clone()),
            quote: self.quote,
            last_outcome: self.last_outcome.clone(),
        }
    }
}

/// Runs sessions against a forest, with a background ticker and story
/// enrichment on completion.
///
/// `start` must be called from within a tokio runtime.
pub struct SessionEngine<G: StoryGenerator> {
    session: Arc<Mutex<Session>>,
    forest: ForestStore,
    enricher: Enricher<G>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    ticker: Option<JoinHandle<()>>,
    pending_story: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<G: StoryGenerator> SessionEngine<G> {
    /// Creates an idle engine that plants into `forest`.
    #[must_use]
    pub fn new(forest: ForestStore, enricher: Enricher<G>) -> Self {
        let session = Session::new();
        let (snapshots, _) = watch::channel(session.snapshot());
        Self {
            session: Arc::new(Mutex::new(session)),
            forest,
            enricher,
            snapshots: Arc::new(snapshots),
            ticker: None,
            pending_story: Arc::new(Mutex::new(None)),
        }
    }

    /// The forest this engine plants into.
    #[must_use]
    pub fn forest(&self) -> &ForestStore {
        &self.forest
    }

    /// Receives a new snapshot after every transition and tick.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().unwrap().snapshot()
    }

    /// See [`Session::configure`].
    ///
    /// # Errors
    ///
    /// Propagates the session's validation errors.
    pub fn configure(
        &self,
        plan: SessionPlan,
        tags: &TagRegistry,
        tasks: &TaskRegistry,
    ) -> Result<(), SessionError> {
        self.update(|s| s.configure(plan, tags, tasks))
    }

    /// See [`Session::set_duration`].
    ///
    /// # Errors
    ///
    /// Propagates the session's validation errors.
    pub fn set_duration(&self, minutes: u32) -> Result<(), SessionError> {
        self.update(|s| s.set_duration(minutes))
    }

    /// Starts the countdown and its ticker.
    ///
    /// # Errors
    ///
    /// Rejected if already running or not configured.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.update(Session::start)?;
        self.stop_ticker();

        let snapshot = self.snapshot();
        info!(
            duration_minutes = snapshot.duration_minutes,
            tag_id = snapshot.tag_id.as_deref().unwrap_or_default(),
            "Session started"
        );

        self.ticker = Some(tokio::spawn(run_ticker(
            Arc::clone(&self.session),
            self.forest.clone(),
            self.enricher.clone(),
            Arc::clone(&self.snapshots),
            Arc::clone(&self.pending_story),
        )));
        Ok(())
    }

    /// Abandons the running session, planting a withered tree.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotRunning`] if no countdown is in progress, or a
    /// forest error if the tree cannot be stored.
    pub fn abandon(&mut self) -> Result<Tree, SessionError> {
        self.stop_ticker();

        let tree = self.update(|s| s.abandon(Utc::now()))?;
        self.forest.append(tree.clone())?;
        info!(
            tree_id = %tree.id,
            duration_minutes = tree.duration_minutes,
            "Session abandoned, tree withered"
        );
        Ok(tree)
    }

    /// Stops any countdown without planting a tree.
    pub fn shutdown(&mut self) {
        self.stop_ticker();
        let mut session = self.session.lock().unwrap();
        session.reset();
        self.snapshots.send_replace(session.snapshot());
    }

    /// Waits for the story request of the last completed session, if any.
    pub async fn story_settled(&self) {
        let handle = self.pending_story.lock().unwrap().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Story task failed");
            }
        }
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut Session) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let mut session = self.session.lock().unwrap();
        let result = f(&mut *session)?;
        self.snapshots.send_replace(session.snapshot());
        Ok(result)
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            debug!("Session ticker stopped");
        }
    }
}

impl<G: StoryGenerator> Drop for SessionEngine<G> {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

async fn run_ticker<G: StoryGenerator>(
    session: Arc<Mutex<Session>>,
    forest: ForestStore,
    enricher: Enricher<G>,
    snapshots: Arc<watch::Sender<SessionSnapshot>>,
    pending_story: Arc<Mutex<Option<JoinHandle<()>>>>,
) {
    let mut interval = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);

    loop {
        interval.tick().await;

        let (tick, snapshot) = {
            let mut session = session.lock().unwrap();
            let tick = session.tick(Utc::now());
            (tick, session.snapshot())
        };

        match tick {
            Tick::Ignored => {
                debug!("Tick after session left running, ticker exiting");
                return;
            }
            Tick::Running { .. } => {
                snapshots.send_replace(snapshot);
            }
            Tick::Completed { tree, tag } => {
                match forest.append(tree.clone()) {
                    Ok(()) => {
                        info!(
                            tree_id = %tree.id,
                            tree_type = %tree.tree_type,
                            tag_id = %tag.id,
                            "Session completed, tree grown"
                        );
                        let handle = enricher.enrich(&forest, &tree, &tag);
                        *pending_story.lock().unwrap() = handle;
                    }
                    Err(e) => {
                        error!(tree_id = %tree.id, error = %e, "Failed to plant completed tree")
                    }
                }
                snapshots.send_replace(snapshot);
                return;
            }
        }
    }
}
