//! In-memory repository backend for tests and embedding callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, bail, Result};

use crate::data::ChangedFile;
use crate::git::RepositoryQuery;

/// Repository backed by fixed data.
///
/// `files` plays the role of both the tracked tree and the working tree;
/// per-revision contents can be layered on with [`with_revision_file`].
///
/// [`with_revision_file`]: Self::with_revision_file
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    files: BTreeMap<String, Vec<u8>>,
    revision_files: HashMap<(String, String), Vec<u8>>,
    diffs: HashMap<(String, String), Vec<ChangedFile>>,
    worktree: Vec<ChangedFile>,
    unavailable: AtomicBool,
}

impl InMemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tracked file.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Adds a file content visible only at `rev`.
    #[must_use]
    pub fn with_revision_file(
        mut self,
        rev: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        self.revision_files
            .insert((rev.into(), path.into()), content.into());
        self
    }

    /// Registers the changes reported for `base..head`.
    #[must_use]
    pub fn with_diff(
        mut self,
        base: impl Into<String>,
        head: impl Into<String>,
        changes: Vec<ChangedFile>,
    ) -> Self {
        self.diffs.insert((base.into(), head.into()), changes);
        self
    }

    /// Registers the working-tree changes.
    #[must_use]
    pub fn with_worktree(mut self, changes: Vec<ChangedFile>) -> Self {
        self.worktree = changes;
        self
    }

    /// Makes every subsequent query fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("repository backend is offline");
        }
        Ok(())
    }
}

impl RepositoryQuery for InMemoryRepository {
    fn list_changed_files(&self, base_ref: &str, head_ref: &str) -> Result<Vec<ChangedFile>> {
        self.ensure_available()?;
        self.diffs
            .get(&(base_ref.to_string(), head_ref.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("Failed to resolve revision range: {base_ref}..{head_ref}"))
    }

    fn list_all_files(&self) -> Result<Vec<String>> {
        self.ensure_available()?;
        Ok(self.files.keys().cloned().collect())
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.ensure_available()?;
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("Failed to read file: {path}"))
    }

    fn list_worktree_changes(&self) -> Result<Vec<ChangedFile>> {
        self.ensure_available()?;
        Ok(self.worktree.clone())
    }

    fn read_file_at(&self, rev: &str, path: &str) -> Result<Vec<u8>> {
        self.ensure_available()?;
        match self.revision_files.get(&(rev.to_string(), path.to_string())) {
            Some(content) => Ok(content.clone()),
            None => self.read_file(path),
        }
    }
}
