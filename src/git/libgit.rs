use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{
    build::CheckoutBuilder, ApplyLocation, Cred, Diff, PushOptions, RemoteCallbacks, Repository,
    Signature,
};
use secrecy::ExposeSecret;

use super::{split_mbox, GitBackend, GitError, PatchHeader, PushTarget};
use crate::forge::RepoId;
use crate::repo_cache::sync_repo;

/// [`GitBackend`] using libgit2 on clones under a cache directory.
#[derive(Debug, Clone)]
pub(crate) struct LibGit {
    /// Repositories are found at `<base_url>/<owner>/<repo>.git`.
    base_url: String,
    cache_dir: PathBuf,
    committer_name: String,
    committer_email: String,
}

impl LibGit {
    pub(crate) fn new(
        base_url: impl Into<String>,
        cache_dir: PathBuf,
        committer_name: impl Into<String>,
        committer_email: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            cache_dir,
            committer_name: committer_name.into(),
            committer_email: committer_email.into(),
        }
    }

    fn remote_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/{owner}/{repo}.git", self.base_url.trim_end_matches('/'))
    }

    fn clone_path(&self, repo: &RepoId) -> PathBuf {
        self.cache_dir.join(&repo.org).join(&repo.name)
    }
}

async fn blocking<T, F>(func: F) -> Result<T, GitError>
where
    F: FnOnce() -> Result<T, GitError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(func)
        .await
        .map_err(|e| GitError::Other(format!("git task failed: {e}")))?
}

fn force_checkout() -> CheckoutBuilder<'static> {
    let mut checkout = CheckoutBuilder::new();
    checkout.force().remove_untracked(true);
    checkout
}

fn checkout_branch(path: &Path, base: &str, branch: &str) -> Result<(), GitError> {
    let repo = Repository::open(path)?;
    let tip = repo
        .find_reference(&format!("refs/remotes/origin/{base}"))
        .and_then(|r| r.peel_to_commit())
        .map_err(|_| GitError::Other(format!("branch {base} does not exist upstream")))?;
    // A branch that is currently checked out cannot be force-updated.
    repo.set_head_detached(tip.id())?;
    repo.checkout_head(Some(&mut force_checkout()))?;
    repo.branch(branch, &tip, true)?;
    repo.set_head(&format!("refs/heads/{branch}"))?;
    repo.checkout_head(Some(&mut force_checkout()))?;
    tracing::info!("Checked out {branch} at {} ({base})", tip.id());
    Ok(())
}

fn has_diff(message: &[u8]) -> bool {
    message.starts_with(b"diff --git ")
        || message.windows(12).any(|w| w == b"\ndiff --git ")
}

fn apply_mailbox(
    path: &Path,
    patch: &[u8],
    committer_name: &str,
    committer_email: &str,
) -> Result<(), GitError> {
    let repo = Repository::open(path)?;
    let committer = Signature::now(committer_name, committer_email)?;
    let mut committed = false;
    for message in split_mbox(patch) {
        let diff = match Diff::from_buffer(message) {
            Ok(diff) => diff,
            // libgit2 refuses messages that carry no diff at all
            Err(_) if !has_diff(message) => continue,
            Err(e) => {
                return Err(GitError::Conflict(format!(
                    "malformed patch: {}",
                    e.message()
                )))
            }
        };
        if diff.deltas().len() == 0 {
            continue;
        }
        repo.apply(&diff, ApplyLocation::Both, None)
            .map_err(|e| GitError::Conflict(e.message().to_owned()))?;

        let header = PatchHeader::parse(message);
        let author = match (&header.author_name, &header.author_email) {
            (Some(name), Some(email)) => Signature::now(name, email)?,
            _ => committer.clone(),
        };
        let summary = header.subject.as_deref().unwrap_or("Cherry-pick");
        let tree = repo.find_tree(repo.index()?.write_tree()?)?;
        let parent = repo.head()?.peel_to_commit()?;
        let id = repo.commit(
            Some("HEAD"),
            &author,
            &committer,
            summary,
            &tree,
            &[&parent],
        )?;
        tracing::info!("Committed {id}: {summary}");
        committed = true;
    }
    if !committed {
        return Err(GitError::Conflict("patch contains no changes".to_owned()));
    }
    Ok(())
}

fn push_branch(path: &Path, url: &str, branch: &str, target: &PushTarget) -> Result<(), GitError> {
    let repo = Repository::open(path)?;
    let mut remote = repo.remote_anonymous(url)?;
    let mut rejected = None;
    {
        let mut asked = false;
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(|_url, _username, _allowed| {
            // libgit2 asks again after a failed attempt
            if asked {
                return Err(git2::Error::from_str("authentication failed"));
            }
            asked = true;
            Cred::userpass_plaintext(&target.owner, target.token.expose_secret())
        });
        callbacks.push_update_reference(|refname, status| {
            if let Some(status) = status {
                rejected = Some(format!("{refname}: {status}"));
            }
            Ok(())
        });
        let mut options = PushOptions::new();
        options.remote_callbacks(callbacks);
        let refspec = format!("+refs/heads/{branch}:refs/heads/{branch}");
        remote
            .push(&[refspec.as_str()], Some(&mut options))
            .map_err(|e| GitError::Push(e.message().to_owned()))?;
    }
    match rejected {
        Some(reason) => Err(GitError::Push(format!("remote rejected {reason}"))),
        None => Ok(()),
    }
}

#[async_trait]
impl GitBackend for LibGit {
    async fn sync(&self, repo: &RepoId) -> Result<(), GitError> {
        let url = self.remote_url(&repo.org, &repo.name);
        let path = self.clone_path(repo);
        blocking(move || {
            let synced = sync_repo(&url, &path)?;
            tracing::info!("Synced repo to {:?}", synced.path());
            Ok(())
        })
        .await
    }

    async fn checkout_new_branch(
        &self,
        repo: &RepoId,
        base: &str,
        branch: &str,
    ) -> Result<(), GitError> {
        let path = self.clone_path(repo);
        let (base, branch) = (base.to_owned(), branch.to_owned());
        blocking(move || checkout_branch(&path, &base, &branch)).await
    }

    async fn apply_and_commit(&self, repo: &RepoId, patch: &[u8]) -> Result<(), GitError> {
        let path = self.clone_path(repo);
        let patch = patch.to_vec();
        let (name, email) = (self.committer_name.clone(), self.committer_email.clone());
        blocking(move || apply_mailbox(&path, &patch, &name, &email)).await
    }

    async fn push(
        &self,
        repo: &RepoId,
        branch: &str,
        target: &PushTarget,
    ) -> Result<(), GitError> {
        let path = self.clone_path(repo);
        let url = self.remote_url(&target.owner, &repo.name);
        let (branch, target) = (branch.to_owned(), target.clone());
        blocking(move || {
            push_branch(&path, &url, &branch, &target)?;
            tracing::info!("Pushed {branch} to {url}");
            Ok(())
        })
        .await
    }
}
