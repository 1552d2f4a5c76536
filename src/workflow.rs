//! The cherry-pick workflow.
//!
//! One invocation per inbound event: authorize the trigger, then drive
//! `Validating → ForkEnsured → BranchCreated → PatchFetched → PatchApplied →
//! Pushed → PullRequestOpened → Reported`. Any step may abort; aborted runs are
//! reported as well. Unauthorized triggers are dropped without a trace on the
//! forge.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};

use secrecy::SecretString;

use crate::command::{self, Directive};
use crate::constants::PUSH_ATTEMPTS;
use crate::event::{
    InboundEvent, IssueCommentAction, IssueCommentEvent, PullRequestAction, PullRequestEvent,
};
use crate::forge::{Forge, ForgeError, IssueComment, NewPullRequest, PullRequestInfo, RepoId};
use crate::git::{GitBackend, GitError, PushTarget};
use crate::patch::{PatchFetchError, PatchFetcher};

mod locks;
mod report;

pub(crate) use locks::RepoLocks;

#[derive(Debug, Clone)]
pub(crate) struct WorkflowConfig {
    /// Account owning the forks and opening the pull requests.
    pub bot_name: String,
    pub push_token: SecretString,
    /// Reject `/approve` comments written by the directive's own author.
    pub require_independent_approval: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkflowState {
    Idle,
    Validating,
    ForkEnsured,
    BranchCreated,
    PatchFetched,
    PatchApplied,
    Pushed,
    PullRequestOpened,
    Reported,
    Aborted,
}

impl Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum CherryPickError {
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    PatchFetch(#[from] PatchFetchError),
    #[error("{0}")]
    PatchApply(String),
    #[error("{0}")]
    Push(String),
    #[error(transparent)]
    Forge(#[from] ForgeError),
    #[error("{0}")]
    Git(String),
}

impl From<GitError> for CherryPickError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Conflict(output) => CherryPickError::PatchApply(output),
            GitError::Push(msg) => CherryPickError::Push(msg),
            GitError::Other(msg) => CherryPickError::Git(msg),
        }
    }
}

/// Why a trigger was dropped without reporting back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum AuthorizationError {
    #[error("{user} is not a member of {org}")]
    NotMember { user: String, org: String },
    #[error("no cherry-pick directive from an org member")]
    NoMemberDirective,
    #[error("pull request was closed without merging")]
    NotMerged,
    #[error("cherry-pick to {0} has not been approved")]
    MissingApproval(String),
}

/// Events that are not cherry-pick triggers at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ignored {
    IrrelevantAction,
    NotAPullRequest,
    OwnComment,
    NoDirective,
}

#[derive(Debug)]
pub(crate) enum Outcome {
    Created(u64),
    /// An open pull request with the same head and base already existed.
    Reused(u64),
    Aborted {
        /// Last state reached before the failure.
        from: WorkflowState,
        error: CherryPickError,
    },
}

#[derive(Debug)]
pub(crate) enum Disposition {
    Ignored(Ignored),
    Rejected(AuthorizationError),
    Reported(Outcome),
}

/// Name of the branch carrying the cherry-pick of `source_pr` onto `target_branch`.
pub(crate) fn working_branch(source_pr: u64, target_branch: &str) -> String {
    format!("cherry-pick-{source_pr}-to-{target_branch}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CherryPickRequest {
    pub repo: RepoId,
    pub source_pr: u64,
    pub base_branch: String,
    pub target_branch: String,
    pub assignee: String,
}

impl CherryPickRequest {
    fn new(
        repo: RepoId,
        pr: &PullRequestInfo,
        directive: &Directive,
    ) -> Result<Self, CherryPickError> {
        if !pr.merged {
            return Err(CherryPickError::Precondition(format!(
                "#{} is not merged, only merged pull requests can be cherry-picked",
                pr.number
            )));
        }
        if directive.target_branch == pr.base_branch {
            return Err(CherryPickError::Precondition(format!(
                "#{} was merged into `{}` already",
                pr.number, pr.base_branch
            )));
        }
        Ok(Self {
            repo,
            source_pr: pr.number,
            base_branch: pr.base_branch.clone(),
            target_branch: directive.target_branch.clone(),
            assignee: directive.requested_by.clone(),
        })
    }

    pub(crate) fn working_branch(&self) -> String {
        working_branch(self.source_pr, &self.target_branch)
    }

    fn title(&self) -> String {
        format!(
            "Automated cherry-pick of #{} on {}",
            self.source_pr, self.target_branch
        )
    }

    fn body(&self) -> String {
        format!(
            "This is an automated cherry-pick of #{}\n\n/assign {}",
            self.source_pr, self.assignee
        )
    }
}

/// An authorized directive and where it came from.
#[derive(Debug, Clone)]
struct Trigger {
    repo: RepoId,
    number: u64,
    directive: Directive,
    /// Already known from the event payload.
    pr: Option<PullRequestInfo>,
}

pub(crate) struct CherryPicker {
    config: WorkflowConfig,
    forge: Arc<dyn Forge>,
    git: Arc<dyn GitBackend>,
    patches: PatchFetcher,
    locks: RepoLocks,
    forks: Mutex<HashSet<RepoId>>,
}

impl CherryPicker {
    pub(crate) fn new(
        config: WorkflowConfig,
        forge: Arc<dyn Forge>,
        git: Arc<dyn GitBackend>,
        patches: PatchFetcher,
    ) -> Self {
        Self {
            config,
            forge,
            git,
            patches,
            locks: RepoLocks::default(),
            forks: Mutex::new(HashSet::new()),
        }
    }

    /// Handle one webhook event to completion.
    ///
    /// Errors are only returned when authorization itself could not be
    /// decided; everything after that ends up in the reported [`Outcome`].
    pub(crate) async fn handle(&self, event: InboundEvent) -> Result<Disposition, CherryPickError> {
        let disposition = match event {
            InboundEvent::IssueComment(e) => self.handle_issue_comment(e).await?,
            InboundEvent::PullRequest(e) => self.handle_pull_request(e).await?,
        };
        match &disposition {
            Disposition::Ignored(reason) => tracing::debug!("Ignored: {reason:?}"),
            Disposition::Rejected(reason) => tracing::info!("Ignoring unauthorized trigger: {reason}"),
            Disposition::Reported(outcome) => tracing::info!("Finished with {outcome:?}"),
        }
        Ok(disposition)
    }

    async fn handle_issue_comment(
        &self,
        event: IssueCommentEvent,
    ) -> Result<Disposition, CherryPickError> {
        if event.action != IssueCommentAction::Created {
            return Ok(Disposition::Ignored(Ignored::IrrelevantAction));
        }
        if !event.issue.is_pull_request() {
            return Ok(Disposition::Ignored(Ignored::NotAPullRequest));
        }
        let author = &event.comment.user.login;
        if *author == self.config.bot_name {
            return Ok(Disposition::Ignored(Ignored::OwnComment));
        }
        let Some(directive) = command::directive_in(author, &event.comment.body) else {
            return Ok(Disposition::Ignored(Ignored::NoDirective));
        };
        let repo = RepoId::new(&event.repository.owner.login, &event.repository.name);
        if !self.forge.is_member(&repo.org, author).await? {
            return Ok(Disposition::Rejected(AuthorizationError::NotMember {
                user: author.clone(),
                org: repo.org,
            }));
        }
        let trigger = Trigger {
            repo,
            number: event.issue.number,
            directive,
            pr: None,
        };
        Ok(Disposition::Reported(self.run(trigger).await))
    }

    async fn handle_pull_request(
        &self,
        event: PullRequestEvent,
    ) -> Result<Disposition, CherryPickError> {
        if event.action != PullRequestAction::Closed {
            return Ok(Disposition::Ignored(Ignored::IrrelevantAction));
        }
        if !event.pull_request.merged {
            return Ok(Disposition::Rejected(AuthorizationError::NotMerged));
        }
        let repo = RepoId::new(&event.repository.owner.login, &event.repository.name);
        let comments: Vec<IssueComment> = self
            .forge
            .list_issue_comments(&repo, event.number)
            .await?
            .into_iter()
            .filter(|c| c.author != self.config.bot_name)
            .collect();

        let mut members = HashMap::new();
        let mut found = None;
        let mut any_directive = false;
        for candidate in command::directives(&comments) {
            any_directive = true;
            if self
                .is_member_cached(&mut members, &repo.org, &candidate.requested_by)
                .await?
            {
                found = Some(candidate);
                break;
            }
        }
        let Some(directive) = found else {
            return Ok(if any_directive {
                Disposition::Rejected(AuthorizationError::NoMemberDirective)
            } else {
                Disposition::Ignored(Ignored::NoDirective)
            });
        };

        let mut approved = false;
        for approval in command::approvals(&comments) {
            if Some(approval.id) == directive.comment_id
                || (self.config.require_independent_approval
                    && approval.author == directive.requested_by)
            {
                continue;
            }
            if self
                .is_member_cached(&mut members, &repo.org, &approval.author)
                .await?
            {
                approved = true;
                break;
            }
        }
        if !approved {
            return Ok(Disposition::Rejected(AuthorizationError::MissingApproval(
                directive.target_branch,
            )));
        }

        let pr = PullRequestInfo {
            number: event.number,
            merged: event.pull_request.merged,
            base_branch: event.pull_request.base.ref_field,
        };
        let trigger = Trigger {
            repo,
            number: event.number,
            directive,
            pr: Some(pr),
        };
        Ok(Disposition::Reported(self.run(trigger).await))
    }

    async fn is_member_cached(
        &self,
        cache: &mut HashMap<String, bool>,
        org: &str,
        user: &str,
    ) -> Result<bool, ForgeError> {
        if let Some(&known) = cache.get(user) {
            return Ok(known);
        }
        let member = self.forge.is_member(org, user).await?;
        cache.insert(user.to_owned(), member);
        Ok(member)
    }

    async fn run(&self, trigger: Trigger) -> Outcome {
        let mut state = WorkflowState::Idle;
        let outcome = match self.execute(&trigger, &mut state).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(
                    "{}#{}: {state} -> {}: {error}",
                    trigger.repo,
                    trigger.number,
                    WorkflowState::Aborted
                );
                Outcome::Aborted { from: state, error }
            }
        };
        self.report(&trigger, &outcome).await;
        outcome
    }

    fn advance(trigger: &Trigger, state: &mut WorkflowState, next: WorkflowState) {
        tracing::info!("{}#{}: {state} -> {next}", trigger.repo, trigger.number);
        *state = next;
    }

    async fn execute(
        &self,
        trigger: &Trigger,
        state: &mut WorkflowState,
    ) -> Result<Outcome, CherryPickError> {
        Self::advance(trigger, state, WorkflowState::Validating);
        let pr = match &trigger.pr {
            Some(pr) => pr.clone(),
            None => {
                self.forge
                    .get_pull_request(&trigger.repo, trigger.number)
                    .await?
            }
        };
        let request = CherryPickRequest::new(trigger.repo.clone(), &pr, &trigger.directive)?;
        tracing::info!(
            "Cherry-picking {}#{} from {} onto {} for {}",
            request.repo,
            request.source_pr,
            request.base_branch,
            request.target_branch,
            request.assignee
        );

        let _guard = self.locks.lock(&request.repo).await;
        self.ensure_fork(&request.repo).await?;
        Self::advance(trigger, state, WorkflowState::ForkEnsured);

        let branch = request.working_branch();
        self.git.sync(&request.repo).await?;
        self.git
            .checkout_new_branch(&request.repo, &request.target_branch, &branch)
            .await?;
        Self::advance(trigger, state, WorkflowState::BranchCreated);

        let patch = self.patches.fetch(&request.repo, request.source_pr).await?;
        Self::advance(trigger, state, WorkflowState::PatchFetched);

        self.git.apply_and_commit(&request.repo, &patch).await?;
        Self::advance(trigger, state, WorkflowState::PatchApplied);

        self.push(&request, &branch).await?;
        Self::advance(trigger, state, WorkflowState::Pushed);

        let outcome = self.open_pull_request(&request, &branch).await?;
        Self::advance(trigger, state, WorkflowState::PullRequestOpened);
        Ok(outcome)
    }

    async fn ensure_fork(&self, repo: &RepoId) -> Result<(), ForgeError> {
        let known = self
            .forks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(repo);
        if !known {
            self.forge.create_fork(repo).await?;
            self.forks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(repo.clone());
        }
        Ok(())
    }

    async fn push(&self, request: &CherryPickRequest, branch: &str) -> Result<(), CherryPickError> {
        let target = PushTarget {
            owner: self.config.bot_name.clone(),
            token: self.config.push_token.clone(),
        };
        let mut attempt = 1;
        loop {
            match self.git.push(&request.repo, branch, &target).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < PUSH_ATTEMPTS => {
                    tracing::warn!("Push attempt {attempt} of {branch} failed, retrying: {e}");
                    attempt += 1;
                }
                Err(e) => return Err(CherryPickError::Push(e.to_string())),
            }
        }
    }

    async fn open_pull_request(
        &self,
        request: &CherryPickRequest,
        branch: &str,
    ) -> Result<Outcome, CherryPickError> {
        let head = format!("{}:{branch}", self.config.bot_name);
        let base = &request.target_branch;
        if let Some(number) = self
            .forge
            .find_open_pull_request(&request.repo, &head, base)
            .await?
        {
            tracing::info!("{head} already has #{number} open against {base}");
            return Ok(Outcome::Reused(number));
        }
        let new = NewPullRequest {
            title: request.title(),
            body: request.body(),
            head,
            base: base.clone(),
            maintainer_can_modify: true,
        };
        match self.forge.create_pull_request(&request.repo, &new).await {
            Ok(number) => Ok(Outcome::Created(number)),
            // someone else may have opened it in the meantime
            Err(err) => match self
                .forge
                .find_open_pull_request(&request.repo, &new.head, base)
                .await
            {
                Ok(Some(number)) => Ok(Outcome::Reused(number)),
                Ok(None) => Err(err.into()),
                Err(lookup) => {
                    tracing::warn!("Lookup of {} after failed creation failed: {lookup}", new.head);
                    Err(err.into())
                }
            },
        }
    }

    async fn report(&self, trigger: &Trigger, outcome: &Outcome) {
        let body = match report::render(
            trigger.number,
            &trigger.directive.target_branch,
            outcome,
        ) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to render report: {e}");
                return;
            }
        };
        match self
            .forge
            .create_comment(&trigger.repo, trigger.number, &body)
            .await
        {
            Ok(()) => tracing::info!(
                "{}#{}: -> {}",
                trigger.repo,
                trigger.number,
                WorkflowState::Reported
            ),
            Err(e) => tracing::error!(
                "Failed to report on {}#{}: {e}",
                trigger.repo,
                trigger.number
            ),
        }
    }
}
