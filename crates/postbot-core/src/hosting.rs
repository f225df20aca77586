//! Code-hosting port: the few repository operations a publication needs.

use async_trait::async_trait;

use crate::{domain::CommitSha, Result};

/// One file write on a branch (create or update).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutFile {
    pub path: String,
    pub message: String,
    /// Raw file content; adapters handle any transport encoding.
    pub content: String,
    pub branch: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
}

/// Repository operations against one configured repository.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Head commit of `branch`.
    async fn get_ref(&self, branch: &str) -> Result<CommitSha>;

    /// Create `branch` pointing at `sha`.
    ///
    /// Must return [`crate::Error::Conflict`] when the branch already exists.
    async fn create_ref(&self, branch: &str, sha: &CommitSha) -> Result<()>;

    /// Create the file on the branch, or replace it if it already exists there.
    async fn put_file(&self, file: PutFile) -> Result<()>;

    async fn create_pull_request(&self, pr: NewPullRequest) -> Result<PullRequest>;
}
