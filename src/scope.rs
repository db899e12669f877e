//! Scope resolution: from a review request to a concrete artifact list.

pub mod filter;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::data::{coalesce_ranges, ArtifactRef, ChangeKind, ChangedFile, Scope, ScopeRequest};
use crate::error::{Result, ReviewError};
use crate::git::{blob_hash, RepositoryQuery};

pub use filter::{InvalidGlob, PathMatcher};

/// Default base ref for pull request diffs.
pub const DEFAULT_BASE_REF: &str = "main";

/// Default head ref template for pull requests; `{number}` is substituted.
pub const DEFAULT_PULL_REQUEST_REF: &str = "refs/pull/{number}/head";

/// Base used when a diff target names only one side.
const SINGLE_REF_BASE: &str = "HEAD~1";

/// Where artifact content is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ContentSource {
    WorkingTree,
    Revision(String),
}

/// Resolves [`ScopeRequest`]s against a repository backend.
pub struct ScopeResolver<'r> {
    repo: &'r dyn RepositoryQuery,
    base_ref: String,
    pull_request_ref: String,
}

impl<'r> ScopeResolver<'r> {
    /// Creates a resolver with the default base and pull request refs.
    pub fn new(repo: &'r dyn RepositoryQuery) -> Self {
        Self {
            repo,
            base_ref: DEFAULT_BASE_REF.to_string(),
            pull_request_ref: DEFAULT_PULL_REQUEST_REF.to_string(),
        }
    }

    /// Sets the base ref pull requests are diffed against.
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

    /// Resolves a request into deduplicated artifacts ordered by path.
    ///
    /// An empty result is a valid "nothing to review" outcome.
    pub fn resolve(&self, request: &ScopeRequest) -> Result<Vec<ArtifactRef>> {
        let matcher =
            PathMatcher::new(request.path_filters.as_slice()).map_err(|e| ReviewError::InvalidFilter {
                pattern: e.pattern,
                source: e.source,
            })?;

        let (raw, source) = self.raw_changes(request)?;
        let raw_count = raw.len();

        let kept: Vec<ChangedFile> = raw
            .into_iter()
            .filter(|change| matcher.matches(&change.path))
            .collect();
        let merged = dedupe(kept);

        let artifacts = merged
            .into_values()
            .map(|change| self.load(change, &source))
            .collect::<Result<Vec<_>>>()?;

        info!(
            scope = %request.scope,
            raw = raw_count,
            artifacts = artifacts.len(),
            "Resolved review scope"
        );
        Ok(artifacts)
    }

    fn raw_changes(&self, request: &ScopeRequest) -> Result<(Vec<ChangedFile>, ContentSource)> {
        let target = request.target.as_deref().unwrap_or("");

        match request.scope {
            Scope::PullRequest => {
                let number = parse_pull_request(target)?;
                let head = self.pull_request_ref.replace("{number}", &number.to_string());
                debug!(number, base = %self.base_ref, head = %head, "Resolving pull request");
                let changes = self
                    .repo
                    .list_changed_files(&self.base_ref, &head)
                    .map_err(|e| ReviewError::repository(&e))?;
                Ok((changes, ContentSource::Revision(head)))
            }
            Scope::Worktree => {
                let changes = self
                    .repo
                    .list_worktree_changes()
                    .map_err(|e| ReviewError::repository(&e))?;
                Ok((changes, ContentSource::WorkingTree))
            }
            Scope::Diff => {
                let (base, head) = parse_diff_target(target)?;
                debug!(base = %base, head = %head, "Resolving diff");
                let changes = self
                    .repo
                    .list_changed_files(&base, &head)
                    .map_err(|e| ReviewError::repository(&e))?;
                Ok((changes, ContentSource::Revision(head)))
            }
            Scope::File => {
                let changes = parse_file_target(target)?
                    .into_iter()
                    .map(|path| ChangedFile::new(path, ChangeKind::Unchanged, Vec::new()))
                    .collect();
                Ok((changes, ContentSource::WorkingTree))
            }
            Scope::Repo => {
                let changes = self
                    .repo
                    .list_all_files()
                    .map_err(|e| ReviewError::repository(&e))?
                    .into_iter()
                    .map(|path| ChangedFile::new(path, ChangeKind::Unchanged, Vec::new()))
                    .collect();
                Ok((changes, ContentSource::WorkingTree))
            }
        }
    }

    fn load(&self, change: ChangedFile, source: &ContentSource) -> Result<ArtifactRef> {
        let content = if change.change_kind == ChangeKind::Deleted {
            Vec::new()
        } else {
            let read = match source {
                ContentSource::WorkingTree => self.repo.read_file(&change.path),
                ContentSource::Revision(rev) => self.repo.read_file_at(rev, &change.path),
            };
            read.map_err(|e| ReviewError::repository(&e))?
        };

        Ok(ArtifactRef {
            content_hash: blob_hash(&content),
            path: change.path,
            change_kind: change.change_kind,
            line_ranges: change.line_ranges,
            content: Arc::from(content),
        })
    }
}

/// Collapses repeated paths into one entry each, keyed (and so ordered) by path.
///
/// The later entry wins, except that `Unchanged` never overrides a real
/// change. Line ranges are unioned; deletions carry none.
fn dedupe(changes: Vec<ChangedFile>) -> BTreeMap<String, ChangedFile> {
    let mut merged: BTreeMap<String, ChangedFile> = BTreeMap::new();

    for change in changes {
        match merged.get_mut(&change.path) {
            None => {
                merged.insert(change.path.clone(), change);
            }
            Some(existing) => {
                if change.change_kind.is_change() || !existing.change_kind.is_change() {
                    existing.change_kind = change.change_kind;
                }
                if existing.change_kind == ChangeKind::Deleted {
                    existing.line_ranges.clear();
                } else {
                    let mut ranges = std::mem::take(&mut existing.line_ranges);
                    ranges.extend(change.line_ranges);
                    existing.line_ranges = coalesce_ranges(ranges);
                }
            }
        }
    }

    merged
}

/// Parses a pull request identifier such as `42` or `#42`.
pub fn parse_pull_request(target: &str) -> Result<u64> {
    let trimmed = target.trim();
    if trimmed.is_empty() {
        return Err(ReviewError::invalid_target(
            Scope::PullRequest,
            target,
            "a pull request number is required",
        ));
    }

    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
    match digits.parse::<u64>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(ReviewError::invalid_target(
            Scope::PullRequest,
            target,
            "expected a positive pull request number",
        )),
    }
}

/// Parses `base..head`; a single side is diffed against `HEAD~1`.
pub fn parse_diff_target(target: &str) -> Result<(String, String)> {
    let trimmed = target.trim();
    let invalid = |reason: &str| ReviewError::invalid_target(Scope::Diff, target, reason);

    if trimmed.contains("...") {
        return Err(invalid("three-dot ranges are not supported, use base..head"));
    }
    let Some((base, head)) = trimmed.split_once("..") else {
        return Err(invalid("expected a ref range of the form base..head"));
    };

    match (base.trim(), head.trim()) {
        ("", "") => Err(invalid("both sides of the range are empty")),
        (single, "") | ("", single) => Ok((SINGLE_REF_BASE.to_string(), single.to_string())),
        (base, head) => Ok((base.to_string(), head.to_string())),
    }
}

/// Splits a file target on whitespace and commas into canonical paths.
pub fn parse_file_target(target: &str) -> Result<Vec<String>> {
    let tokens: Vec<&str> = target
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Err(ReviewError::invalid_target(
            Scope::File,
            target,
            "at least one path is required",
        ));
    }

    tokens
        .into_iter()
        .map(|token| {
            normalize_path(token).ok_or_else(|| {
                ReviewError::invalid_target(
                    Scope::File,
                    target,
                    format!("path {token:?} is not inside the repository"),
                )
            })
        })
        .collect()
}

/// Normalizes a repository-relative path, rejecting absolute paths and
/// paths that climb above the root.
pub fn normalize_path(path: &str) -> Option<String> {
    if path.starts_with('/') || path.starts_with('\\') {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
