use std::fmt::Display;

use async_trait::async_trait;

#[cfg(test)]
pub(crate) mod fake;
mod github;

pub(crate) use github::OctocrabForge;

/// An `org/repo` pair on the forge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct RepoId {
    pub org: String,
    pub name: String,
}

impl RepoId {
    pub(crate) fn new(org: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            name: name.into(),
        }
    }
}

impl Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}

/// The parts of a pull request the workflow looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PullRequestInfo {
    pub number: u64,
    pub merged: bool,
    pub base_branch: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IssueComment {
    pub id: u64,
    pub author: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// `owner:branch`
    pub head: String,
    pub base: String,
    pub maintainer_can_modify: bool,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ForgeError {
    #[error("GitHub API error: {0}")]
    Api(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Remote repository operations needed by the cherry-pick workflow.
#[async_trait]
pub(crate) trait Forge: Send + Sync {
    async fn get_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<PullRequestInfo, ForgeError>;

    async fn create_comment(&self, repo: &RepoId, number: u64, body: &str)
        -> Result<(), ForgeError>;

    async fn is_member(&self, org: &str, user: &str) -> Result<bool, ForgeError>;

    /// Comments of an issue or pull request, oldest first.
    async fn list_issue_comments(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<IssueComment>, ForgeError>;

    /// Fork `repo` into the authenticated account. Forking an already forked
    /// repository succeeds.
    async fn create_fork(&self, repo: &RepoId) -> Result<(), ForgeError>;

    /// Number of an open pull request on `repo` from `head` into `base`, if any.
    async fn find_open_pull_request(
        &self,
        repo: &RepoId,
        head: &str,
        base: &str,
    ) -> Result<Option<u64>, ForgeError>;

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<u64, ForgeError>;
}
