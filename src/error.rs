//! Error taxonomy for review runs.
//!
//! Resolver and registration errors are fatal and reach the caller as-is.
//! Analyzer errors never escape the engine: they are rendered into
//! low-severity findings so a single misbehaving analyzer cannot block a
//! review.

use std::time::Duration;

use thiserror::Error;

use crate::data::Scope;

/// Result alias used by the core's fallible operations.
pub type Result<T> = std::result::Result<T, ReviewError>;

/// Errors produced while resolving, registering or running analyzers.
#[derive(Error, Debug)]
pub enum ReviewError {
    /// The scope/target combination is malformed.
    #[error("Invalid target {target:?} for {scope} scope: {reason}")]
    InvalidTarget {
        /// Scope the target was given for.
        scope: Scope,
        /// The offending target string.
        target: String,
        /// Why the target was rejected.
        reason: String,
    },

    /// A path filter is not a valid glob.
    #[error("Invalid path filter {pattern:?}")]
    InvalidFilter {
        /// The offending pattern.
        pattern: String,
        /// Underlying glob parse error.
        #[source]
        source: globset::Error,
    },

    /// The repository backend could not answer a query.
    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    /// An analyzer with the same id is already registered.
    #[error("Analyzer {0:?} is already registered")]
    DuplicateAnalyzer(String),

    /// An analyzer declared an applicable glob that does not parse.
    #[error("Analyzer {analyzer:?} declares invalid glob {pattern:?}")]
    InvalidAnalyzerGlob {
        /// Analyzer id.
        analyzer: String,
        /// The offending pattern.
        pattern: String,
        /// Underlying glob parse error.
        #[source]
        source: globset::Error,
    },

    /// An analyzer returned an error or panicked.
    #[error("Analyzer {analyzer:?} failed: {message}")]
    AnalyzerFailure {
        /// Analyzer id.
        analyzer: String,
        /// Error text, including its context chain.
        message: String,
    },

    /// An analyzer exceeded its timeout budget.
    #[error("Analyzer {analyzer:?} exceeded its timeout budget of {}ms", budget.as_millis())]
    AnalyzerTimeout {
        /// Analyzer id.
        analyzer: String,
        /// The budget that was exceeded.
        budget: Duration,
    },

    /// The async runtime for a blocking run could not be started.
    #[error("Failed to start async runtime")]
    Runtime(#[source] std::io::Error),
}

impl ReviewError {
    /// Builds an [`InvalidTarget`](Self::InvalidTarget) error.
    pub(crate) fn invalid_target(
        scope: Scope,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidTarget {
            scope,
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an adapter error, keeping its full context chain.
    pub(crate) fn repository(err: &anyhow::Error) -> Self {
        Self::RepositoryUnavailable(format!("{err:#}"))
    }
}
