//! Engine configuration and the settings file it is loaded from.
//!
//! Settings live in `$HOME/.review-core/settings.json`. Environment
//! variables take precedence over file values; the file's `env` map acts
//! as a fallback for variables that are not set in the process.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::analyzer::AnalyzerDescriptor;
use crate::scope::{DEFAULT_BASE_REF, DEFAULT_PULL_REQUEST_REF};

/// Overrides the maximum number of analyzers running at once.
pub const ENV_MAX_CONCURRENCY: &str = "REVIEW_CORE_MAX_CONCURRENCY";
/// Overrides the default analyzer timeout, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "REVIEW_CORE_TIMEOUT_MS";
/// Overrides the base ref of pull request diffs.
pub const ENV_BASE_REF: &str = "REVIEW_CORE_BASE_REF";

/// Timeout used when neither the descriptor nor the configuration sets one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings loaded from `$HOME/.review-core/settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Maximum in-flight analyzers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    /// Default per-analyzer timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_timeout_ms: Option<u64>,
    /// Base ref for pull requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_ref: Option<String>,
    /// Pull request head ref template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request_ref: Option<String>,
    /// Per-analyzer timeout overrides keyed by analyzer id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub analyzer_timeouts_ms: BTreeMap<String, u64>,
    /// Environment variable fallbacks.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

impl Settings {
    /// Loads settings from the default location.
    pub fn load() -> Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Self::load_from_path(&settings_path)
    }

    /// Loads settings from a specific path; a missing file yields defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        serde_json::from_str::<Self>(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Returns the default settings path.
    pub fn get_settings_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Failed to determine home directory")?;
        Ok(home_dir.join(".review-core").join("settings.json"))
    }

    /// Returns an environment variable with fallback to the `env` map.
    pub fn get_env_var(&self, key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) => Some(value),
            Err(_) => self.env.get(key).cloned(),
        }
    }
}

/// Tunables of a review run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum analyzers running at once; at least 1.
    pub max_concurrency: usize,
    /// Budget for analyzers without an explicit one.
    pub default_timeout: Duration,
    /// Base ref pull requests are diffed against.
    pub base_ref: String,
    /// Head ref template for pull requests; `{number}` is substituted.
    pub pull_request_ref: String,
    /// Per-analyzer budgets that win over the descriptor's own.
    pub analyzer_timeouts: BTreeMap<String, Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_concurrency(),
            default_timeout: DEFAULT_TIMEOUT,
            base_ref: DEFAULT_BASE_REF.to_string(),
            pull_request_ref: DEFAULT_PULL_REQUEST_REF.to_string(),
            analyzer_timeouts: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    /// Loads the default settings file and applies environment overrides.
    pub fn load() -> Result<Self> {
        Self::from_settings(&Settings::load()?)
    }

    /// Builds a configuration from settings plus environment overrides.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::from_settings_with(settings, |key| settings.get_env_var(key))
    }

    fn from_settings_with<F>(settings: &Settings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(n) = parse_var::<usize>(&lookup, ENV_MAX_CONCURRENCY)?.or(settings.max_concurrency) {
            config = config.with_max_concurrency(n);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, ENV_TIMEOUT_MS)?.or(settings.default_timeout_ms) {
            config.default_timeout = Duration::from_millis(ms);
        }
        if let Some(base) = lookup(ENV_BASE_REF).or_else(|| settings.base_ref.clone()) {
            config.base_ref = base;
        }
        if let Some(template) = &settings.pull_request_ref {
            config.pull_request_ref.clone_from(template);
        }
        config.analyzer_timeouts = settings
            .analyzer_timeouts_ms
            .iter()
            .map(|(id, ms)| (id.clone(), Duration::from_millis(*ms)))
            .collect();

        Ok(config)
    }

    /// Sets the concurrency limit, clamped to at least 1.
    #[must_use]
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }

    /// Sets the default timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the pull request base ref.
    #[must_use]
    pub fn with_base_ref(mut self, base_ref: impl Into<String>) -> Self {
        self.base_ref = base_ref.into();
        self
    }

    /// Sets the pull request head ref template.
    #[must_use]
    pub fn with_pull_request_ref(mut self, template: impl Into<String>) -> Self {
        self.pull_request_ref = template.into();
        self
    }

    /// Overrides the budget of one analyzer.
    #[must_use]
    pub fn with_analyzer_timeout(mut self, id: impl Into<String>, timeout: Duration) -> Self {
        self.analyzer_timeouts.insert(id.into(), timeout);
        self
    }

    /// Effective budget for `descriptor`: configured override, then the
    /// descriptor's own budget, then the default.
    pub fn timeout_for(&self, descriptor: &AnalyzerDescriptor) -> Duration {
        self.analyzer_timeouts
            .get(&descriptor.id)
            .copied()
            .or(descriptor.timeout_budget)
            .unwrap_or(self.default_timeout)
    }
}

/// Number of available processors, or 1 if unknown.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: {raw:?}"))
        })
        .transpose()
}
