use crate::forge::RepoId;

mod github;

pub(crate) use github::{
    IssueCommentAction, IssueCommentEvent, PullRequestAction, PullRequestEvent,
};

/// A webhook event the cherry-picker reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InboundEvent {
    IssueComment(IssueCommentEvent),
    PullRequest(PullRequestEvent),
}

impl InboundEvent {
    /// Parse a payload according to its `X-GitHub-Event` kind.
    /// Kinds the cherry-picker does not handle yield `Ok(None)`.
    pub(crate) fn from_kind_and_body(
        kind: &str,
        body: &[u8],
    ) -> Result<Option<Self>, serde_json::Error> {
        Ok(Some(match kind {
            "issue_comment" => Self::IssueComment(serde_json::from_slice(body)?),
            "pull_request" => Self::PullRequest(serde_json::from_slice(body)?),
            _ => return Ok(None),
        }))
    }

    pub(crate) fn repo(&self) -> RepoId {
        let repository = match self {
            Self::IssueComment(e) => &e.repository,
            Self::PullRequest(e) => &e.repository,
        };
        RepoId::new(&repository.owner.login, &repository.name)
    }

    /// Issue or pull request the event belongs to.
    pub(crate) fn number(&self) -> u64 {
        match self {
            Self::IssueComment(e) => e.issue.number,
            Self::PullRequest(e) => e.number,
        }
    }
}
