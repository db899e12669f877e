//! git2-backed repository queries.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use git2::{Delta, Diff, DiffOptions, Repository, Tree};
use tracing::debug;

use crate::data::{coalesce_ranges, ChangeKind, ChangedFile, LineRange};
use crate::git::RepositoryQuery;

/// Index mode of a submodule entry.
const GITLINK_MODE: u32 = 0o160_000;

/// Git repository wrapper.
///
/// `git2::Repository` is not `Sync`, so access is serialized through a
/// mutex; every query is short-lived.
pub struct GitRepository {
    repo: Mutex<Repository>,
}

impl GitRepository {
    /// Opens the repository containing the current directory.
    pub fn open() -> Result<Self> {
        let repo = Repository::discover(".").context("Not in a git repository")?;
        Ok(Self::from_repository(repo))
    }

    /// Opens the repository at the specified path.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::open(path).context("Failed to open git repository")?;
        Ok(Self::from_repository(repo))
    }

    /// Wraps an already opened repository.
    pub fn from_repository(repo: Repository) -> Self {
        Self {
            repo: Mutex::new(repo),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Repository>> {
        self.repo
            .lock()
            .map_err(|_| anyhow!("Repository handle poisoned by a panicked query"))
    }
}

impl RepositoryQuery for GitRepository {
    fn list_changed_files(&self, base_ref: &str, head_ref: &str) -> Result<Vec<ChangedFile>> {
        let repo = self.lock()?;
        let base_tree = resolve_tree(&repo, base_ref)?;
        let head_tree = resolve_tree(&repo, head_ref)?;

        let mut opts = diff_options();
        let diff = repo
            .diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut opts))
            .with_context(|| format!("Failed to diff {base_ref}..{head_ref}"))?;

        let changes = collect_changes(&diff)?;
        debug!(base = base_ref, head = head_ref, files = changes.len(), "Listed changed files");
        Ok(changes)
    }

    fn list_all_files(&self) -> Result<Vec<String>> {
        let repo = self.lock()?;
        let index = repo.index().context("Failed to read repository index")?;
        let files: Vec<String> = index
            .iter()
            .filter(|entry| entry.mode != GITLINK_MODE)
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .collect();
        debug!(files = files.len(), "Listed tracked files");
        Ok(files)
    }

    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let repo = self.lock()?;
        let workdir = repo
            .workdir()
            .context("Repository has no working directory")?;
        match std::fs::read(workdir.join(path)) {
            Ok(content) => Ok(content),
            Err(e) => {
                // Tracked files missing on disk or behind a dangling symlink
                // are read from their staged blob.
                let index = repo.index().context("Failed to read repository index")?;
                let Some(entry) = index.get_path(Path::new(path), 0) else {
                    return Err(e).with_context(|| format!("Failed to read file: {path}"));
                };
                debug!(path, error = %e, "Reading tracked file from the index");
                let blob = repo
                    .find_blob(entry.id)
                    .with_context(|| format!("Failed to load staged blob for {path}"))?;
                Ok(blob.content().to_vec())
            }
        }
    }

    fn list_worktree_changes(&self) -> Result<Vec<ChangedFile>> {
        let repo = self.lock()?;

        // An unborn HEAD diffs the index against the empty tree.
        let head_tree = match repo.head() {
            Ok(head) => Some(head.peel_to_tree().context("Failed to peel HEAD to tree")?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e).context("Failed to get HEAD reference"),
        };

        let mut staged_opts = diff_options();
        let staged = repo
            .diff_tree_to_index(head_tree.as_ref(), None, Some(&mut staged_opts))
            .context("Failed to diff HEAD against index")?;

        let mut unstaged_opts = diff_options();
        unstaged_opts
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .show_untracked_content(true);
        let unstaged = repo
            .diff_index_to_workdir(None, Some(&mut unstaged_opts))
            .context("Failed to diff index against working tree")?;

        let mut changes = collect_changes(&staged)?;
        changes.extend(collect_changes(&unstaged)?);
        debug!(entries = changes.len(), "Listed worktree changes");
        Ok(changes)
    }

    fn read_file_at(&self, rev: &str, path: &str) -> Result<Vec<u8>> {
        let repo = self.lock()?;
        let tree = resolve_tree(&repo, rev)?;
        let entry = tree
            .get_path(Path::new(path))
            .with_context(|| format!("File {path} not found at {rev}"))?;
        let blob = entry
            .to_object(&repo)
            .and_then(|object| object.peel_to_blob())
            .with_context(|| format!("Failed to load blob for {path} at {rev}"))?;
        Ok(blob.content().to_vec())
    }
}

fn diff_options() -> DiffOptions {
    let mut opts = DiffOptions::new();
    opts.context_lines(0);
    opts
}

fn resolve_tree<'r>(repo: &'r Repository, spec: &str) -> Result<Tree<'r>> {
    repo.revparse_single(spec)
        .with_context(|| format!("Failed to resolve revision: {spec}"))?
        .peel_to_tree()
        .with_context(|| format!("Failed to peel {spec} to a tree"))
}

fn change_kind(status: Delta) -> Option<ChangeKind> {
    match status {
        Delta::Added | Delta::Untracked | Delta::Copied => Some(ChangeKind::Added),
        Delta::Deleted => Some(ChangeKind::Deleted),
        Delta::Modified | Delta::Renamed | Delta::Typechange | Delta::Conflicted => {
            Some(ChangeKind::Modified)
        }
        Delta::Unmodified | Delta::Ignored | Delta::Unreadable => None,
    }
}

/// Turns each delta of a diff into a change entry with new-side hunk ranges.
fn collect_changes(diff: &Diff<'_>) -> Result<Vec<ChangedFile>> {
    let mut changes = Vec::with_capacity(diff.deltas().len());

    for (idx, delta) in diff.deltas().enumerate() {
        let Some(kind) = change_kind(delta.status()) else {
            continue;
        };

        let file = if kind == ChangeKind::Deleted {
            delta.old_file()
        } else {
            delta.new_file()
        };
        if file.mode() == git2::FileMode::Commit {
            debug!(status = ?delta.status(), "Skipping submodule delta");
            continue;
        }
        let Some(path) = file.path().and_then(Path::to_str) else {
            debug!(status = ?delta.status(), "Skipping delta with non-UTF-8 path");
            continue;
        };

        let mut ranges = Vec::new();
        if kind != ChangeKind::Deleted {
            // Binary files have no patch and therefore no ranges.
            if let Some(patch) =
                git2::Patch::from_diff(diff, idx).context("Failed to build patch")?
            {
                for hunk_idx in 0..patch.num_hunks() {
                    let (hunk, _) = patch.hunk(hunk_idx).context("Failed to read hunk")?;
                    if hunk.new_lines() > 0 {
                        let start = hunk.new_start();
                        ranges.push(LineRange::new(start, start + hunk.new_lines() - 1));
                    }
                }
            }
        }

        changes.push(ChangedFile::new(path, kind, coalesce_ranges(ranges)));
    }

    Ok(changes)
}
