//! Grove - a focus timer that grows a forest.
//!
//! Each focus session is tagged to a project and, when it ends, plants a
//! tree: alive if the countdown ran out, withered if the session was
//! abandoned. The forest is the session history, and statistics are derived
//! from it on demand.
//!
//! # Overview
//!
//! A [`SessionEngine`] counts down once a second on the tokio runtime. On
//! completion it appends an alive [`Tree`] to the [`ForestStore`] and asks an
//! [`Enricher`] for a short story, which is patched onto the tree later.
//! Story generation is optional: without an API key, or when the request
//! fails, a fixed sentence is used instead.
//!
//! # Modules
//!
//! - [`types`]: Tags, tasks and trees
//! - [`defaults`]: Built-in tags, quotes, duration bounds and demo data
//! - [`registry`]: Tag and task registries
//! - [`forest`]: Append-only tree store
//! - [`stats`]: Pure statistics over the forest
//! - [`session`]: Session state machine and its async driver
//! - [`narrative`]: Story generation client and enrichment
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types

pub mod config;
pub mod defaults;
pub mod error;
pub mod forest;
pub mod narrative;
pub mod registry;
pub mod session;
pub mod stats;
pub mod types;

pub use config::{Config, ConfigError, NarrativeConfig};
pub use error::{GroveError, Result};
pub use forest::{ForestError, ForestStore};
pub use narrative::{
    fallback_story, Enricher, GeminiClient, NarrativeError, RetryPolicy, StoryGenerator,
    StoryPrompt,
};
pub use registry::{RegistryError, TagRegistry, TaskRegistry};
pub use session::{
    Session, SessionEngine, SessionError, SessionPhase, SessionPlan, SessionSnapshot,
};
pub use stats::StatsSummary;
pub use types::{Tag, Task, Tree, TreeStatus, TreeType};
