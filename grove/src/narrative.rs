//! Tree stories: a short generated description attached to each completed tree.
//!
//! This module provides:
//!
//! - [`StoryGenerator`], the seam for anything that can turn a finished
//!   session into text
//! - [`GeminiClient`], an HTTP implementation with retry and backoff
//!   (1s → 60s max, ±25% jitter)
//! - [`Enricher`], which runs a generator in the background and patches the
//!   result onto the tree, substituting [`fallback_story`] on any failure
//!
//! Enrichment never blocks or fails the session that planted the tree.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::NarrativeConfig;
use crate::forest::ForestStore;
use crate::types::{Tag, Tree, TreeType};

/// Maximum retry delay in seconds.
const MAX_RETRY_DELAY_SECS: u64 = 60;

/// Jitter factor (±25%).
const JITTER_FACTOR: f64 = 0.25;

/// Errors that can occur while generating a story.
#[derive(Error, Debug)]
pub enum NarrativeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API answered but produced no text.
    #[error("empty response from story generator")]
    EmptyResponse,

    /// Generation took longer than the configured timeout.
    #[error("story generation timed out after {0:?}")]
    Timeout(Duration),

    /// Maximum retry attempts exceeded.
    #[error("max retries exceeded after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },
}

/// What the generator is told about the finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryPrompt {
    pub duration_minutes: u32,
    pub tag_name: String,
    pub tree_type: TreeType,
}

impl StoryPrompt {
    /// Builds a prompt for a tree grown under `tag`.
    #[must_use]
    pub fn for_tree(tree: &Tree, tag: &Tag) -> Self {
        Self {
            duration_minutes: tree.duration_minutes,
            tag_name: tag.name.clone(),
            tree_type: tree.tree_type,
        }
    }

    /// The instruction text sent to the model.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "I just finished a {}-minute focus session tagged as \"{}\". \
             I successfully grew a virtual {} tree. \
             Write a very short (max 20 words), poetic, and whimsical description \
             of this specific tree reflecting the effort. Do not use quotes.",
            self.duration_minutes, self.tag_name, self.tree_type
        )
    }

    /// Deterministic text used when generation is unavailable or fails.
    #[must_use]
    pub fn fallback(&self) -> String {
        fallback_story(self.tree_type, &self.tag_name)
    }
}

/// Deterministic story naming the tree type and project.
#[must_use]
pub fn fallback_story(tree_type: TreeType, tag_name: &str) -> String {
    format!("A strong {tree_type} representing your dedication to {tag_name}.")
}

/// Something that can write a story for a finished session.
pub trait StoryGenerator: Send + Sync + 'static {
    /// Produces story text for the prompt.
    fn generate_story(
        &self,
        prompt: &StoryPrompt,
    ) -> impl Future<Output = Result<String, NarrativeError>> + Send;
}

/// Backoff settings for [`GeminiClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Policy with the given attempt limit and a one second initial delay.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: Duration::from_secs(1),
        }
    }

    /// Three attempts with millisecond delays, for tests against a mock server.
    #[must_use]
    pub fn fast_for_tests() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: String,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Story generator backed by the Gemini `generateContent` API.
pub struct GeminiClient {
    config: NarrativeConfig,
    client: Client,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Creates a client for the configured endpoint and model.
    ///
    /// Each attempt is bounded by an equal share of the story timeout, so a
    /// stalled request leaves time for the remaining attempts.
    ///
    /// # Errors
    ///
    /// Returns [`NarrativeError::Http`] if the HTTP client cannot be built.
    pub fn new(config: NarrativeConfig) -> Result<Self, NarrativeError> {
        let client = Client::builder()
            .timeout(attempt_timeout(&config))
            .pool_max_idle_per_host(2)
            .build()?;
        let retry = RetryPolicy::new(config.retry_limit);

        Ok(Self {
            config,
            client,
            retry,
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn request(&self, prompt: &str) -> Result<String, NarrativeError> {
        let url = self.endpoint();
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let mut attempts = 0;
        let mut delay = self.retry.initial_delay;

        loop {
            attempts += 1;
            debug!(url = %url, attempt = attempts, "Requesting tree story");

            let result = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.config.api_key)
                .json(&body)
                .send()
                .await;

            let retryable = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: GenerateResponse = response.json().await?;
                        return parsed.into_text().ok_or(NarrativeError::EmptyResponse);
                    }

                    let message = response.text().await.unwrap_or_default();
                    if status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error() {
                        return Err(NarrativeError::Api {
                            status: status.as_u16(),
                            message,
                        });
                    }
                    warn!(
                        status = status.as_u16(),
                        message = %message,
                        "Story API error, will retry"
                    );
                    NarrativeError::Api {
                        status: status.as_u16(),
                        message,
                    }
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(error = %e, "Connection error, will retry");
                    NarrativeError::Http(e)
                }
                Err(e) => return Err(NarrativeError::Http(e)),
            };

            if attempts >= self.retry.max_attempts {
                return Err(match retryable {
                    api @ NarrativeError::Api { .. } => api,
                    _ => NarrativeError::MaxRetriesExceeded { attempts },
                });
            }

            let jittered = add_jitter(delay);
            debug!(delay_ms = jittered.as_millis(), "Waiting before retry");
            sleep(jittered).await;
            delay = next_delay(delay);
        }
    }
}

impl StoryGenerator for GeminiClient {
    async fn generate_story(&self, prompt: &StoryPrompt) -> Result<String, NarrativeError> {
        self.request(&prompt.render()).await
    }
}

/// Per-request timeout: the story timeout split across the allowed attempts.
fn attempt_timeout(config: &NarrativeConfig) -> Duration {
    config.timeout / config.retry_limit.max(1)
}

/// Adds ±25% jitter to a duration.
fn add_jitter(duration: Duration) -> Duration {
    let mut rng = rand::rng();
    let base = duration.as_secs_f64();
    let jitter_range = base * JITTER_FACTOR;
    let jitter = if jitter_range > 0.0 {
        rng.random_range(-jitter_range..=jitter_range)
    } else {
        0.0
    };
    Duration::from_secs_f64((base + jitter).max(0.0))
}

/// Doubles the delay up to the maximum.
fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(Duration::from_secs(MAX_RETRY_DELAY_SECS))
}

/// Attaches stories to freshly planted trees.
///
/// Cloning is cheap; clones share the same generator.
pub struct Enricher<G> {
    generator: Option<Arc<G>>,
    timeout: Duration,
}

impl<G> Clone for Enricher<G> {
    fn clone(&self) -> Self {
        Self {
            generator: self.generator.clone(),
            timeout: self.timeout,
        }
    }
}

impl<G: StoryGenerator> Enricher<G> {
    /// Enricher that asks `generator`, giving up after `timeout`.
    #[must_use]
    pub fn new(generator: G, timeout: Duration) -> Self {
        Self {
            generator: Some(Arc::new(generator)),
            timeout,
        }
    }

    /// Enricher with no generator; every tree gets the fallback story.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            generator: None,
            timeout: Duration::ZERO,
        }
    }

    /// Returns true if a generator is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Requests a story for `tree` and patches it onto the forest.
    ///
    /// Without a generator the fallback is applied before returning and
    /// `None` is returned. Otherwise generation runs on a spawned task whose
    /// handle is returned; the result is applied even if the caller has
    /// since moved on.
    pub fn enrich(&self, forest: &ForestStore, tree: &Tree, tag: &Tag) -> Option<JoinHandle<()>> {
        let prompt = StoryPrompt::for_tree(tree, tag);

        let Some(generator) = self.generator.clone() else {
            forest.patch_story(&tree.id, &prompt.fallback());
            return None;
        };

        let forest = forest.clone();
        let tree_id = tree.id.clone();
        let timeout = self.timeout;

        Some(tokio::spawn(async move {
            let generated = tokio::time::timeout(timeout, generator.generate_story(&prompt)).await;
            let story = match generated {
                Ok(Ok(story)) => {
                    info!(tree_id = %tree_id, "Tree story generated");
                    story
                }
                Ok(Err(e)) => {
                    warn!(
                        tree_id = %tree_id,
                        error = %e,
                        "Failed to generate tree story, using fallback"
                    );
                    prompt.fallback()
                }
                Err(_) => {
                    warn!(
                        tree_id = %tree_id,
                        error = %NarrativeError::Timeout(timeout),
                        "Failed to generate tree story, using fallback"
                    );
                    prompt.fallback()
                }
            };
            forest.patch_story(&tree_id, &story);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TreeStatus;
    use chrono::Utc;

    struct Fixed(&'static str);

    impl StoryGenerator for Fixed {
        async fn generate_story(&self, _prompt: &StoryPrompt) -> Result<String, NarrativeError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl StoryGenerator for Failing {
        async fn generate_story(&self, _prompt: &StoryPrompt) -> Result<String, NarrativeError> {
            Err(NarrativeError::EmptyResponse)
        }
    }

    struct Stalled;

    impl StoryGenerator for Stalled {
        async fn generate_story(&self, _prompt: &StoryPrompt) -> Result<String, NarrativeError> {
            sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    fn work_tag() -> Tag {
        Tag {
            id: "work".to_string(),
            name: "Work".to_string(),
            color: "#3b82f6".to_string(),
            daily_goal: 8,
        }
    }

    fn planted(forest: &ForestStore) -> Tree {
        let tree = Tree::new(
            Utc::now(),
            25,
            "work".to_string(),
            None,
            TreeStatus::Alive,
            TreeType::Oak,
        );
        forest.append(tree.clone()).unwrap();
        tree
    }

    #[test]
    fn prompt_mentions_session_details() {
        let prompt = StoryPrompt {
            duration_minutes: 45,
            tag_name: "Study".to_string(),
            tree_type: TreeType::Pine,
        };
        let text = prompt.render();
        assert!(text.contains("45-minute"));
        assert!(text.contains("\"Study\""));
        assert!(text.contains("Pine tree"));
    }

    #[test]
    fn fallback_names_type_and_tag() {
        assert_eq!(
            fallback_story(TreeType::Cactus, "Rest"),
            "A strong Cactus representing your dedication to Rest."
        );
    }

    #[test]
    fn response_text_is_trimmed_and_joined() {
        let json = r#"{"candidates":[{"content":{"parts":[
            {"text":"  A quiet "},{"text":"oak. \n"}
        ]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.into_text().as_deref(), Some("A quiet oak."));
    }

    #[test]
    fn response_without_candidates_is_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.into_text().is_none());
    }

    #[test]
    fn attempt_timeout_splits_story_budget() {
        let mut config = NarrativeConfig::new("key".to_string());
        config.timeout = Duration::from_secs(30);
        config.retry_limit = 3;
        assert_eq!(attempt_timeout(&config), Duration::from_secs(10));

        config.retry_limit = 1;
        assert_eq!(attempt_timeout(&config), Duration::from_secs(30));
    }

    #[test]
    fn next_delay_doubles_and_caps() {
        assert_eq!(next_delay(Duration::from_secs(1)), Duration::from_secs(2));
        assert_eq!(next_delay(Duration::from_secs(45)), Duration::from_secs(60));
    }

    #[test]
    fn add_jitter_stays_within_bounds() {
        for _ in 0..100 {
            let secs = add_jitter(Duration::from_secs(10)).as_secs_f64();
            assert!((7.5..=12.5).contains(&secs), "Jitter out of bounds: {}", secs);
        }
    }

    #[test]
    fn disabled_enricher_applies_fallback_immediately() {
        let forest = ForestStore::new();
        let tree = planted(&forest);

        let handle = Enricher::<Fixed>::disabled().enrich(&forest, &tree, &work_tag());

        assert!(handle.is_none());
        assert_eq!(
            forest.get(&tree.id).unwrap().ai_story.as_deref(),
            Some("A strong Oak representing your dedication to Work.")
        );
    }

    #[tokio::test]
    async fn enricher_patches_generated_story() {
        let forest = ForestStore::new();
        let tree = planted(&forest);

        let enricher = Enricher::new(Fixed("A whispering oak."), Duration::from_secs(5));
        enricher.enrich(&forest, &tree, &work_tag()).unwrap().await.unwrap();

        assert_eq!(forest.get(&tree.id).unwrap().ai_story.as_deref(), Some("A whispering oak."));
    }

    #[tokio::test]
    async fn enricher_falls_back_on_error() {
        let forest = ForestStore::new();
        let tree = planted(&forest);

        let enricher = Enricher::new(Failing, Duration::from_secs(5));
        enricher.enrich(&forest, &tree, &work_tag()).unwrap().await.unwrap();

        assert_eq!(
            forest.get(&tree.id).unwrap().ai_story.as_deref(),
            Some("A strong Oak representing your dedication to Work.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn enricher_falls_back_on_timeout() {
        let forest = ForestStore::new();
        let tree = planted(&forest);

        let enricher = Enricher::new(Stalled, Duration::from_secs(30));
        enricher.enrich(&forest, &tree, &work_tag()).unwrap().await.unwrap();

        assert_eq!(
            forest.get(&tree.id).unwrap().ai_story.as_deref(),
            Some("A strong Oak representing your dedication to Work.")
        );
    }
}
