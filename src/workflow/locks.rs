use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::forge::RepoId;

/// One async lock per repository, guarding its working clone.
#[derive(Debug, Default)]
pub(crate) struct RepoLocks {
    locks: Mutex<HashMap<RepoId, Arc<AsyncMutex<()>>>>,
}

impl RepoLocks {
    pub(crate) async fn lock(&self, repo: &RepoId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(repo.clone())
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}
