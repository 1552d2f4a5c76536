//! In-memory [`Forge`] recording every mutation, for workflow tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Forge, ForgeError, IssueComment, NewPullRequest, PullRequestInfo, RepoId};

/// A pull request opened through the fake, with the repository it was opened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenedPullRequest {
    pub repo: RepoId,
    pub number: u64,
    pub request: NewPullRequest,
}

#[derive(Debug, Default)]
pub(crate) struct FakeForge {
    pub pr: Mutex<Option<PullRequestInfo>>,
    pub members: Mutex<HashSet<String>>,
    pub pr_comments: Mutex<Vec<IssueComment>>,
    /// `org/repo#number body` for every comment posted.
    pub comments: Mutex<Vec<String>>,
    pub prs: Mutex<Vec<OpenedPullRequest>>,
    pub forks: Mutex<Vec<RepoId>>,
    pub next_number: Mutex<u64>,
    pub fail_membership: Mutex<bool>,
    pub fail_fork: Mutex<bool>,
    pub fail_create_pull_request: Mutex<bool>,
    /// When set, someone else opens this pull request while ours is being
    /// created, and creation fails the way GitHub reports duplicates.
    pub concurrent_pull_request: Mutex<Option<u64>>,
    /// Results handed out by successive lookups; empty means a real lookup.
    pub find_results: Mutex<VecDeque<Result<(), String>>>,
}

impl FakeForge {
    pub(crate) fn new(pr: Option<PullRequestInfo>, members: &[&str]) -> Self {
        Self {
            pr: Mutex::new(pr),
            members: Mutex::new(members.iter().map(|&m| m.to_owned()).collect()),
            next_number: Mutex::new(3),
            ..Self::default()
        }
    }

    pub(crate) fn with_comments(self, comments: &[(&str, &str)]) -> Self {
        *self.pr_comments.lock().unwrap() = comments
            .iter()
            .zip(1..)
            .map(|(&(author, body), id)| IssueComment {
                id,
                author: author.to_owned(),
                body: body.to_owned(),
            })
            .collect();
        self
    }

    pub(crate) fn comments(&self) -> Vec<String> {
        self.comments.lock().unwrap().clone()
    }

    pub(crate) fn prs(&self) -> Vec<OpenedPullRequest> {
        self.prs.lock().unwrap().clone()
    }

    pub(crate) fn forks(&self) -> Vec<RepoId> {
        self.forks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Forge for FakeForge {
    async fn get_pull_request(
        &self,
        _repo: &RepoId,
        number: u64,
    ) -> Result<PullRequestInfo, ForgeError> {
        self.pr
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ForgeError::Api(format!("pull request #{number} not found")))
    }

    async fn create_comment(
        &self,
        repo: &RepoId,
        number: u64,
        body: &str,
    ) -> Result<(), ForgeError> {
        self.comments
            .lock()
            .unwrap()
            .push(format!("{repo}#{number} {body}"));
        Ok(())
    }

    async fn is_member(&self, _org: &str, user: &str) -> Result<bool, ForgeError> {
        if *self.fail_membership.lock().unwrap() {
            return Err(ForgeError::Transport("connection reset".to_owned()));
        }
        Ok(self.members.lock().unwrap().contains(user))
    }

    async fn list_issue_comments(
        &self,
        _repo: &RepoId,
        _number: u64,
    ) -> Result<Vec<IssueComment>, ForgeError> {
        Ok(self.pr_comments.lock().unwrap().clone())
    }

    async fn create_fork(&self, repo: &RepoId) -> Result<(), ForgeError> {
        if *self.fail_fork.lock().unwrap() {
            return Err(ForgeError::Api("Repository access blocked".to_owned()));
        }
        self.forks.lock().unwrap().push(repo.clone());
        Ok(())
    }

    async fn find_open_pull_request(
        &self,
        repo: &RepoId,
        head: &str,
        base: &str,
    ) -> Result<Option<u64>, ForgeError> {
        if let Some(Err(msg)) = self.find_results.lock().unwrap().pop_front() {
            return Err(ForgeError::Transport(msg));
        }
        Ok(self
            .prs
            .lock()
            .unwrap()
            .iter()
            .find(|pr| &pr.repo == repo && pr.request.head == head && pr.request.base == base)
            .map(|pr| pr.number))
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<u64, ForgeError> {
        if let Some(number) = self.concurrent_pull_request.lock().unwrap().take() {
            self.prs.lock().unwrap().push(OpenedPullRequest {
                repo: repo.clone(),
                number,
                request: pr.clone(),
            });
            return Err(ForgeError::Api(format!(
                "A pull request already exists for {}.",
                pr.head
            )));
        }
        if *self.fail_create_pull_request.lock().unwrap() {
            return Err(ForgeError::Api("Validation Failed".to_owned()));
        }
        let mut next = self.next_number.lock().unwrap();
        let number = *next;
        *next += 1;
        self.prs.lock().unwrap().push(OpenedPullRequest {
            repo: repo.clone(),
            number,
            request: pr.clone(),
        });
        Ok(number)
    }
}
