//! Repository query abstraction and its backends.

pub mod memory;
pub mod repository;

use anyhow::Result;

use crate::data::ChangedFile;

pub use memory::InMemoryRepository;
pub use repository::GitRepository;

/// Number of hex characters to show in abbreviated object ids.
pub const SHORT_HASH_LEN: usize = 8;

/// Read-only view of a version-control backend.
///
/// Every method may fail; the scope resolver reports any failure as
/// [`RepositoryUnavailable`](crate::error::ReviewError::RepositoryUnavailable).
pub trait RepositoryQuery: Send + Sync {
    /// Lists files changed between two revisions, with new-side line ranges.
    fn list_changed_files(&self, base_ref: &str, head_ref: &str) -> Result<Vec<ChangedFile>>;

    /// Lists every tracked path.
    fn list_all_files(&self) -> Result<Vec<String>>;

    /// Reads a file from the working tree.
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Lists staged and unstaged changes relative to HEAD.
    ///
    /// A path may appear twice (once staged, once unstaged); staged entries
    /// come first.
    fn list_worktree_changes(&self) -> Result<Vec<ChangedFile>>;

    /// Reads a file as of a revision.
    fn read_file_at(&self, rev: &str, path: &str) -> Result<Vec<u8>> {
        let _ = rev;
        self.read_file(path)
    }
}

/// Returns the git blob id of `content`, used as the artifact fingerprint.
pub fn blob_hash(content: &[u8]) -> String {
    git2::Oid::hash_object(git2::ObjectType::Blob, content)
        .map_or_else(|_| String::new(), |oid| oid.to_string())
}

/// Truncates an object id to [`SHORT_HASH_LEN`] characters.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..SHORT_HASH_LEN).unwrap_or(hash)
}
