//! Error types for Grove.
//!
//! Each module owns a focused error enum; [`GroveError`] folds them together
//! for callers that drive several components at once.

use thiserror::Error;

use crate::config::ConfigError;
use crate::forest::ForestError;
use crate::narrative::NarrativeError;
use crate::registry::RegistryError;
use crate::session::SessionError;

/// Errors that can occur anywhere in the crate.
///
/// # Examples
///
/// ```
/// use grove::error::{GroveError, Result};
/// use grove::registry::TagRegistry;
///
/// fn add_project(tags: &mut TagRegistry) -> Result<String> {
///     let tag = tags.create("Side Project", "#ef4444", 3)?;
///     Ok(tag.id)
/// }
///
/// let mut tags = TagRegistry::new();
/// assert!(add_project(&mut tags).is_ok());
/// ```
#[derive(Error, Debug)]
pub enum GroveError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tag or task registry error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Forest store error.
    #[error("forest error: {0}")]
    Forest(#[from] ForestError),

    /// Session transition rejected.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Story generation error.
    #[error("story error: {0}")]
    Narrative(#[from] NarrativeError),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized `Result` type for Grove operations.
pub type Result<T> = std::result::Result<T, GroveError>;
