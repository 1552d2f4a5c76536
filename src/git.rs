use async_trait::async_trait;
use secrecy::SecretString;

use crate::forge::RepoId;

#[cfg(test)]
pub(crate) mod fake;
mod libgit;

pub(crate) use libgit::LibGit;

#[derive(Debug, thiserror::Error)]
pub(crate) enum GitError {
    /// The patch does not apply on top of the working branch.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Push(String),
    #[error("{0}")]
    Other(String),
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Other(err.message().to_owned())
    }
}

/// Where and as whom to push a working branch.
#[derive(Debug, Clone)]
pub(crate) struct PushTarget {
    /// Owner of the fork, also used as the user name for authentication.
    pub owner: String,
    pub token: SecretString,
}

/// A local working clone per repository.
#[async_trait]
pub(crate) trait GitBackend: Send + Sync {
    /// Clone `repo` if needed and fetch all upstream branches.
    async fn sync(&self, repo: &RepoId) -> Result<(), GitError>;

    /// Point `branch` at the upstream tip of `base` and check it out,
    /// discarding whatever `branch` held before.
    async fn checkout_new_branch(
        &self,
        repo: &RepoId,
        base: &str,
        branch: &str,
    ) -> Result<(), GitError>;

    /// Apply a `git format-patch` mailbox onto the checked out branch,
    /// one commit per message.
    async fn apply_and_commit(&self, repo: &RepoId, patch: &[u8]) -> Result<(), GitError>;

    async fn push(&self, repo: &RepoId, branch: &str, target: &PushTarget)
        -> Result<(), GitError>;
}

/// Author and subject of one mailbox message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct PatchHeader {
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub subject: Option<String>,
}

impl PatchHeader {
    /// Reads the `From:` and `Subject:` lines before the first blank line.
    /// Header bytes that are not UTF-8 are replaced.
    pub(crate) fn parse(message: &[u8]) -> Self {
        let end = message
            .windows(2)
            .position(|w| w == b"\n\n")
            .map_or(message.len(), |i| i + 1);
        let head = String::from_utf8_lossy(&message[..end]);
        let mut header = Self::default();
        for line in head.lines().take_while(|l| !l.trim().is_empty()) {
            if let Some(from) = line.strip_prefix("From: ") {
                if let Some((name, rest)) = from.split_once('<') {
                    header.author_name = Some(name.trim().trim_matches('"').to_owned());
                    header.author_email = Some(rest.trim_end_matches('>').trim().to_owned());
                }
            } else if let Some(subject) = line.strip_prefix("Subject: ") {
                let subject = if subject.starts_with("[PATCH") {
                    subject.split_once(']').map_or(subject, |(_, s)| s)
                } else {
                    subject
                };
                header.subject = Some(subject.trim().to_owned());
            }
        }
        header
    }
}

/// Splits a `git format-patch` mailbox into its messages. Input without
/// mailbox separators is returned as a single message. The patch is raw
/// bytes, file contents need not be UTF-8.
pub(crate) fn split_mbox(patch: &[u8]) -> Vec<&[u8]> {
    let starts: Vec<usize> = (0..patch.len())
        .filter(|&i| i == 0 || patch[i - 1] == b'\n')
        .filter(|&i| is_mbox_separator(first_line(&patch[i..])))
        .collect();
    if starts.is_empty() {
        return vec![patch];
    }
    let mut messages = Vec::with_capacity(starts.len());
    if starts[0] > 0 && !patch[..starts[0]].trim_ascii().is_empty() {
        messages.push(&patch[..starts[0]]);
    }
    for (n, &start) in starts.iter().enumerate() {
        let end = starts.get(n + 1).copied().unwrap_or(patch.len());
        messages.push(&patch[start..end]);
    }
    messages
}

fn first_line(bytes: &[u8]) -> &[u8] {
    bytes.split(|&b| b == b'\n').next().unwrap_or(bytes)
}

/// `From <sha> Mon Sep 17 00:00:00 2001`
fn is_mbox_separator(line: &[u8]) -> bool {
    let mut parts = line
        .split(u8::is_ascii_whitespace)
        .filter(|part| !part.is_empty());
    parts.next() == Some(b"From".as_slice())
        && parts
            .next()
            .is_some_and(|sha| sha.len() >= 7 && sha.iter().all(u8::is_ascii_hexdigit))
}
