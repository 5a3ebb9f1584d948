//! Source-hosting port: an opaque object store with get/put, branch, and
//! change-request operations.
//!
//! Lookups that can legitimately miss (`get_file`, `list_dir`) return
//! `Option` — a not-found response is a valid negative answer, not an
//! error. Everything else that fails is a real error.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future type alias used by [`RepoStore`] to keep the trait dyn-compatible.
pub type RepoFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, Box<dyn Error + Send + Sync>>> + Send + 'a>>;

/// Identifies a repository by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoId {
    /// The owning user or organization.
    pub owner: String,
    /// The repository name.
    pub name: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A file blob retrieved from the store, with its revision marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// The decoded file contents.
    pub content: String,
    /// Revision marker for optimistic writes (e.g. a blob SHA).
    pub revision: String,
}

/// Whether a tree entry is a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Dir,
}

/// One entry in a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// The entry's base name.
    pub name: String,
    /// The entry's full path from the repository root.
    pub path: String,
    /// File or directory.
    pub kind: EntryKind,
}

/// One changed file from a pull-request diff listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Path of the changed file.
    pub path: String,
    /// Raw status tag from the host (`added`, `modified`, `removed`, ...).
    pub status: String,
    /// Unified-diff patch text, when the host provides one.
    pub patch: Option<String>,
}

/// A change request to open (pull request in GitHub terms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    /// Request title.
    pub title: String,
    /// Request body.
    pub body: String,
    /// Head branch containing the changes.
    pub head: String,
    /// Base branch to merge into.
    pub base: String,
    /// Labels to attach.
    pub labels: Vec<String>,
}

/// The created change request, as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedRequest {
    /// Assigned request number.
    pub number: u64,
    /// Web URL of the request.
    pub url: String,
}

/// Reads and writes repository objects through the hosting API.
pub trait RepoStore: Send + Sync {
    /// Fetches a file at `path` on `reference`. `None` means not found.
    fn get_file(&self, repo: &RepoId, path: &str, reference: &str)
        -> RepoFuture<'_, Option<RemoteFile>>;

    /// Creates or updates a file on `branch`. Pass the current `revision`
    /// when updating an existing blob; omit it when creating.
    fn put_file(
        &self,
        repo: &RepoId,
        branch: &str,
        path: &str,
        content: &str,
        message: &str,
        revision: Option<&str>,
    ) -> RepoFuture<'_, ()>;

    /// Lists a directory at `path` on `reference`. `None` means the path
    /// does not exist.
    fn list_dir(&self, repo: &RepoId, path: &str, reference: &str)
        -> RepoFuture<'_, Option<Vec<TreeEntry>>>;

    /// Lists the changed files of a pull request.
    fn list_changed_files(&self, repo: &RepoId, number: u64) -> RepoFuture<'_, Vec<ChangedFile>>;

    /// Returns the head commit SHA of `branch`.
    fn branch_head(&self, repo: &RepoId, branch: &str) -> RepoFuture<'_, String>;

    /// Returns `true` if `branch` exists.
    fn branch_exists(&self, repo: &RepoId, branch: &str) -> RepoFuture<'_, bool>;

    /// Creates `branch` pointing at `from_sha`.
    fn create_branch(&self, repo: &RepoId, branch: &str, from_sha: &str) -> RepoFuture<'_, ()>;

    /// Opens a change request and returns its number and URL.
    fn create_change_request(
        &self,
        repo: &RepoId,
        request: &ChangeRequest,
    ) -> RepoFuture<'_, CreatedRequest>;

    /// Posts a comment on an existing pull request or issue.
    fn add_comment(&self, repo: &RepoId, number: u64, body: &str) -> RepoFuture<'_, ()>;
}
