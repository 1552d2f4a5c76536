use std::time::Duration;

use crate::forge::RepoId;
use crate::utils::PipeMap;

#[derive(Debug, thiserror::Error)]
pub(crate) enum PatchFetchError {
    #[error("GET {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Downloads the raw patch of a pull request.
#[derive(Debug, Clone)]
pub(crate) struct PatchFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl PatchFetcher {
    pub(crate) fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .pipe_map(timeout, reqwest::ClientBuilder::timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub(crate) fn url(&self, repo: &RepoId, number: u64) -> String {
        format!(
            "{}/raw/{}/{}/pull/{number}.patch",
            self.base_url.trim_end_matches('/'),
            repo.org,
            repo.name
        )
    }

    /// One GET, no retries. Anything but `200 OK` is an error.
    pub(crate) async fn fetch(&self, repo: &RepoId, number: u64) -> Result<Vec<u8>, PatchFetchError> {
        let url = self.url(repo, number);
        let transport = |source| PatchFetchError::Transport {
            url: url.clone(),
            source,
        };
        let response = self.client.get(&url).send().await.map_err(transport)?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(PatchFetchError::Status {
                status: response.status(),
                url,
            });
        }
        let body = response.bytes().await.map_err(transport)?;
        tracing::info!("Fetched {} bytes from {url}", body.len());
        Ok(body.to_vec())
    }
}
