//! Configuration module for Grove.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `GROVE_API_KEY` | No | - | Gemini API key (enables generated tree stories) |
//! | `GROVE_STORY_MODEL` | No | `gemini-2.5-flash` | Model used for stories |
//! | `GROVE_STORY_URL` | No | `https://generativelanguage.googleapis.com` | API base URL |
//! | `GROVE_STORY_TIMEOUT_SECS` | No | 30 | Seconds before a story request gives up |
//! | `GROVE_STORY_RETRY_LIMIT` | No | 3 | Max request attempts (1-10) |
//! | `GROVE_DEFAULT_DURATION` | No | 25 | Session length in minutes (10-120) |
//!
//! A missing API key is not an error: stories fall back to a fixed sentence.
//!
//! # Example
//!
//! ```no_run
//! use grove::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Stories enabled: {}", config.narrative.is_some());
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::defaults::{DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES, MIN_DURATION_MINUTES};

/// Default story model.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default story timeout (in seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of request attempts.
const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Minimum allowed retry limit.
const MIN_RETRY_LIMIT: u32 = 1;

/// Maximum allowed retry limit.
const MAX_RETRY_LIMIT: u32 = 10;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Settings for the story generator.
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    /// API key sent with every request.
    pub api_key: String,

    /// Model name, e.g. `gemini-2.5-flash`.
    pub model: String,

    /// API base URL without a trailing path.
    pub base_url: String,

    /// Upper bound on one story, retries included.
    pub timeout: Duration,

    /// Maximum request attempts. Between 1 and 10 (inclusive).
    pub retry_limit: u32,
}

impl NarrativeConfig {
    /// Settings with defaults for everything but the key.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry_limit: DEFAULT_RETRY_LIMIT,
        }
    }

    /// Points the client at another base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Configuration for Grove.
#[derive(Debug, Clone)]
pub struct Config {
    /// Session length used when none is given.
    pub default_duration_minutes: u32,

    /// Story generator settings. `None` when no API key is set.
    pub narrative: Option<NarrativeConfig>,
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `GROVE_DEFAULT_DURATION` is not an integer between 10 and 120
    /// - `GROVE_STORY_TIMEOUT_SECS` is not a positive integer
    /// - `GROVE_STORY_RETRY_LIMIT` is not an integer between 1 and 10
    pub fn from_env() -> Result<Self, ConfigError> {
        // Optional: GROVE_DEFAULT_DURATION (default: 25, must be 10-120)
        let default_duration_minutes = match env::var("GROVE_DEFAULT_DURATION") {
            Ok(val) => {
                let minutes = val.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                    key: "GROVE_DEFAULT_DURATION".to_string(),
                    message: format!("expected minutes, got '{val}'"),
                })?;
                if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
                    return Err(ConfigError::InvalidValue {
                        key: "GROVE_DEFAULT_DURATION".to_string(),
                        message: format!(
                            "duration must be between {} and {}, got {}",
                            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES, minutes
                        ),
                    });
                }
                minutes
            }
            Err(_) => DEFAULT_DURATION_MINUTES,
        };

        // Optional: story generation (enabled if GROVE_API_KEY is set and non-empty)
        let narrative = match env::var("GROVE_API_KEY") {
            Ok(api_key) if !api_key.trim().is_empty() => {
                let model = env::var("GROVE_STORY_MODEL")
                    .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
                let base_url = env::var("GROVE_STORY_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

                // Parse timeout (default: 30, must be >= 1)
                let timeout_secs = match env::var("GROVE_STORY_TIMEOUT_SECS") {
                    Ok(val) => {
                        let secs = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                            key: "GROVE_STORY_TIMEOUT_SECS".to_string(),
                            message: format!("expected positive integer, got '{val}'"),
                        })?;
                        if secs == 0 {
                            return Err(ConfigError::InvalidValue {
                                key: "GROVE_STORY_TIMEOUT_SECS".to_string(),
                                message: "timeout must be at least 1 second".to_string(),
                            });
                        }
                        secs
                    }
                    Err(_) => DEFAULT_TIMEOUT_SECS,
                };

                // Parse retry limit (default: 3, must be 1-10)
                let retry_limit = match env::var("GROVE_STORY_RETRY_LIMIT") {
                    Ok(val) => {
                        let limit = val.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                            key: "GROVE_STORY_RETRY_LIMIT".to_string(),
                            message: format!("expected integer 1-10, got '{val}'"),
                        })?;
                        if !(MIN_RETRY_LIMIT..=MAX_RETRY_LIMIT).contains(&limit) {
                            return Err(ConfigError::InvalidValue {
                                key: "GROVE_STORY_RETRY_LIMIT".to_string(),
                                message: format!(
                                    "retry limit must be between {} and {}, got {}",
                                    MIN_RETRY_LIMIT, MAX_RETRY_LIMIT, limit
                                ),
                            });
                        }
                        limit
                    }
                    Err(_) => DEFAULT_RETRY_LIMIT,
                };

                Some(NarrativeConfig {
                    api_key,
                    model,
                    base_url,
                    timeout: Duration::from_secs(timeout_secs),
                    retry_limit,
                })
            }
            _ => None,
        };

        Ok(Self {
            default_duration_minutes,
            narrative,
        })
    }
}
