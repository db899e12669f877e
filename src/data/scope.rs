//! Review request types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Selection mode of a review run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Files changed by a pull request, relative to the configured base ref.
    PullRequest,
    /// Staged and unstaged changes in the working tree.
    Worktree,
    /// Files changed between two refs.
    Diff,
    /// Explicitly named files, reviewed in full.
    File,
    /// Every tracked file.
    Repo,
}

impl Scope {
    /// Returns `true` if the scope reads a `target`.
    pub fn uses_target(self) -> bool {
        matches!(self, Self::PullRequest | Self::Diff | Self::File)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PullRequest => write!(f, "pr"),
            Self::Worktree => write!(f, "worktree"),
            Self::Diff => write!(f, "diff"),
            Self::File => write!(f, "file"),
            Self::Repo => write!(f, "repo"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pr" | "pull-request" | "pullrequest" => Ok(Self::PullRequest),
            "worktree" | "wt" => Ok(Self::Worktree),
            "diff" => Ok(Self::Diff),
            "file" | "files" => Ok(Self::File),
            "repo" | "repository" => Ok(Self::Repo),
            other => Err(format!(
                "unknown scope '{other}' (expected pr, worktree, diff, file or repo)"
            )),
        }
    }
}

/// One review request: what to select and how to narrow it.
///
/// Built once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRequest {
    /// Selection mode.
    pub scope: Scope,
    /// PR number, ref range or path list, depending on `scope`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Glob patterns; empty means "keep everything".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path_filters: Vec<String>,
}

impl ScopeRequest {
    /// Creates a request without a target or filters.
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            target: None,
            path_filters: Vec::new(),
        }
    }

    /// Sets the target.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the path filters.
    #[must_use]
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path_filters = filters.into_iter().map(Into::into).collect();
        self
    }
}
