use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GitBackend, GitError, PushTarget};
use crate::forge::RepoId;

/// Records operations instead of touching a repository.
#[derive(Debug, Default)]
pub(crate) struct FakeGit {
    /// Human readable log, e.g. `checkout foo/bar stage -> cherry-pick-2-to-stage`.
    pub ops: Mutex<Vec<String>>,
    /// When set, applying any patch fails with this output.
    pub conflict: Mutex<Option<String>>,
    /// Results handed out by successive pushes; empty means success.
    pub push_results: Mutex<VecDeque<Result<(), String>>>,
    pub patches: Mutex<Vec<Vec<u8>>>,
}

impl FakeGit {
    pub(crate) fn ops(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub(crate) fn pushes(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter(|op| op.starts_with("push "))
            .collect()
    }

    fn record(&self, op: String) {
        self.ops.lock().unwrap().push(op);
    }
}

#[async_trait]
impl GitBackend for FakeGit {
    async fn sync(&self, repo: &RepoId) -> Result<(), GitError> {
        self.record(format!("sync {repo}"));
        Ok(())
    }

    async fn checkout_new_branch(
        &self,
        repo: &RepoId,
        base: &str,
        branch: &str,
    ) -> Result<(), GitError> {
        self.record(format!("checkout {repo} {base} -> {branch}"));
        Ok(())
    }

    async fn apply_and_commit(&self, repo: &RepoId, patch: &[u8]) -> Result<(), GitError> {
        self.patches.lock().unwrap().push(patch.to_vec());
        if let Some(output) = self.conflict.lock().unwrap().clone() {
            return Err(GitError::Conflict(output));
        }
        self.record(format!("apply {repo}"));
        Ok(())
    }

    async fn push(
        &self,
        repo: &RepoId,
        branch: &str,
        target: &PushTarget,
    ) -> Result<(), GitError> {
        self.record(format!("push {repo} {branch} -> {}", target.owner));
        let result = self.push_results.lock().unwrap().pop_front();
        match result {
            Some(Err(msg)) => Err(GitError::Push(msg)),
            _ => Ok(()),
        }
    }
}
