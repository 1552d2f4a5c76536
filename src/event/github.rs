use serde::{Deserialize, Serialize};

/// A stripped down version of the `issue_comment` webhook payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct IssueCommentEvent {
    pub action: IssueCommentAction,
    pub issue: Issue,
    pub comment: Comment,
    pub repository: Repository,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum IssueCommentAction {
    Created,
    Edited,
    Deleted,
    #[serde(other)]
    Unknown,
}

/// A stripped down version of the `pull_request` webhook payload.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct PullRequestEvent {
    pub action: PullRequestAction,
    /// The pull request number this event corresponds to.
    pub number: u64,
    pub pull_request: PullRequest,
    pub repository: Repository,
    /// The sender of the event
    pub sender: User,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PullRequestAction {
    Opened,
    Closed,
    Reopened,
    Synchronize,
    #[serde(other)]
    Unknown,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Issue {
    pub number: u64,
    #[serde(default)]
    pub state: String,
    /// Only present when the issue is a pull request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub(crate) fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: String,
    pub user: User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub merged: bool,
    pub base: Branch,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Branch {
    #[serde(rename = "ref")]
    pub ref_field: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct Repository {
    pub name: String,
    pub owner: User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct User {
    pub login: String,
}
