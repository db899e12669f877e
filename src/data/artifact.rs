//! Resolved source artifacts.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// How an artifact changed within the review scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File was added.
    Added,
    /// File was modified.
    Modified,
    /// File was deleted.
    Deleted,
    /// File is reviewed in full without diff semantics.
    Unchanged,
}

impl ChangeKind {
    /// Returns the single-letter git status code.
    pub fn status_code(self) -> char {
        match self {
            Self::Added => 'A',
            Self::Modified => 'M',
            Self::Deleted => 'D',
            Self::Unchanged => ' ',
        }
    }

    /// Returns `true` for an actual change.
    pub fn is_change(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Inclusive 1-based interval of changed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRange {
    /// First line.
    pub start: u32,
    /// Last line.
    pub end: u32,
}

impl LineRange {
    /// Creates a range, swapping the bounds if given in reverse.
    pub fn new(start: u32, end: u32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Returns `true` if `line` falls inside the range.
    pub fn contains(&self, line: u32) -> bool {
        (self.start..=self.end).contains(&line)
    }
}

/// Sorts ranges and merges overlapping or adjacent ones.
pub fn coalesce_ranges(mut ranges: Vec<LineRange>) -> Vec<LineRange> {
    ranges.sort();
    let mut merged: Vec<LineRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// A raw change entry as reported by a repository backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// Repository-relative path.
    pub path: String,
    /// Kind of change.
    pub change_kind: ChangeKind,
    /// Changed lines on the new side.
    pub line_ranges: Vec<LineRange>,
}

impl ChangedFile {
    /// Creates a change entry.
    pub fn new(path: impl Into<String>, change_kind: ChangeKind, line_ranges: Vec<LineRange>) -> Self {
        Self {
            path: path.into(),
            change_kind,
            line_ranges,
        }
    }
}

/// A resolved source unit under review.
///
/// Content travels with the artifact so analyzers never touch the
/// repository; it is shared read-only and not serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Canonical repository-relative path.
    pub path: String,
    /// Git blob id of the content.
    pub content_hash: String,
    /// Kind of change.
    pub change_kind: ChangeKind,
    /// Changed-line intervals; empty for full-file scopes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_ranges: Vec<LineRange>,
    /// File content (empty for deleted files).
    #[serde(skip)]
    pub content: Arc<[u8]>,
}

impl ArtifactRef {
    /// Returns the content as UTF-8, or `None` for binary data.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Returns `true` if `line` should be reviewed.
    ///
    /// Full-file artifacts (no ranges) cover every line.
    pub fn covers_line(&self, line: u32) -> bool {
        self.line_ranges.is_empty() || self.line_ranges.iter().any(|r| r.contains(line))
    }
}
