//! Runtime configuration read from the environment.
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file in the working directory.

use std::env;
use std::path::PathBuf;

/// Default model used for every capability.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default Generative Language API base URL.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default state directory, relative to the working directory.
pub const DEFAULT_HOME: &str = ".workshop";

/// Workshop configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkshopConfig {
    /// API key for the model provider (`GEMINI_API_KEY`, falling back to `API_KEY`).
    pub api_key: Option<String>,
    /// Model identifier (`WORKSHOP_MODEL`).
    pub model: String,
    /// API base URL (`WORKSHOP_API_BASE`).
    pub api_base: String,
    /// Directory holding persisted state (`WORKSHOP_HOME`).
    pub home: PathBuf,
    /// When set, port interactions are recorded to cassettes in this directory
    /// (`WORKSHOP_RECORD`).
    pub record_dir: Option<PathBuf>,
    /// When set, model calls are served from this cassette file instead of
    /// the network (`WORKSHOP_REPLAY`).
    pub replay_cassette: Option<PathBuf>,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            home: PathBuf::from(DEFAULT_HOME),
            record_dir: None,
            replay_cassette: None,
        }
    }
}

impl WorkshopConfig {
    /// Loads configuration from `.env` (if present) and the environment.
    #[must_use]
    pub fn from_env() -> Self {
        // A missing .env is the common case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();
        Self {
            api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
            model: non_empty("WORKSHOP_MODEL").unwrap_or(defaults.model),
            api_base: non_empty("WORKSHOP_API_BASE").unwrap_or(defaults.api_base),
            home: non_empty("WORKSHOP_HOME").map_or(defaults.home, PathBuf::from),
            record_dir: non_empty("WORKSHOP_RECORD").map(PathBuf::from),
            replay_cassette: non_empty("WORKSHOP_REPLAY").map(PathBuf::from),
        }
    }
}
