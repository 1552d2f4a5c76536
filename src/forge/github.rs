use std::sync::Arc;

use async_trait::async_trait;
use octocrab::{models::pulls::PullRequest, params::State, Octocrab};

use super::{Forge, ForgeError, IssueComment, NewPullRequest, PullRequestInfo, RepoId};

/// [`Forge`] backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub(crate) struct OctocrabForge {
    client: Arc<Octocrab>,
}

impl OctocrabForge {
    pub(crate) fn new(client: Arc<Octocrab>) -> Self {
        Self { client }
    }
}

impl From<octocrab::Error> for ForgeError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => ForgeError::Api(source.message),
            other => ForgeError::Transport(other.to_string()),
        }
    }
}

fn pull_request_info(pr: &PullRequest) -> PullRequestInfo {
    PullRequestInfo {
        number: pr.number,
        merged: pr.merged_at.is_some(),
        base_branch: pr.base.ref_field.clone(),
    }
}

#[async_trait]
impl Forge for OctocrabForge {
    async fn get_pull_request(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<PullRequestInfo, ForgeError> {
        let pr = self.client.pulls(&repo.org, &repo.name).get(number).await?;
        Ok(pull_request_info(&pr))
    }

    async fn create_comment(
        &self,
        repo: &RepoId,
        number: u64,
        body: &str,
    ) -> Result<(), ForgeError> {
        let comment = self
            .client
            .issues(&repo.org, &repo.name)
            .create_comment(number, body)
            .await?;
        tracing::info!("Created comment at {}", comment.html_url);
        Ok(())
    }

    async fn is_member(&self, org: &str, user: &str) -> Result<bool, ForgeError> {
        Ok(self.client.orgs(org).check_membership(user).await?)
    }

    async fn list_issue_comments(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<IssueComment>, ForgeError> {
        let first = self
            .client
            .issues(&repo.org, &repo.name)
            .list_comments(number)
            .per_page(100)
            .send()
            .await?;
        let comments = self.client.all_pages(first).await?;
        Ok(comments
            .into_iter()
            .map(|c| IssueComment {
                id: c.id.into_inner(),
                author: c.user.login,
                body: c.body.unwrap_or_default(),
            })
            .collect())
    }

    async fn create_fork(&self, repo: &RepoId) -> Result<(), ForgeError> {
        let fork = self
            .client
            .repos(&repo.org, &repo.name)
            .create_fork()
            .send()
            .await?;
        tracing::info!(
            "Fork of {repo} available as {}",
            fork.full_name.as_deref().unwrap_or(&fork.name)
        );
        Ok(())
    }

    async fn find_open_pull_request(
        &self,
        repo: &RepoId,
        head: &str,
        base: &str,
    ) -> Result<Option<u64>, ForgeError> {
        let page = self
            .client
            .pulls(&repo.org, &repo.name)
            .list()
            .state(State::Open)
            .head(head)
            .base(base)
            .per_page(100)
            .send()
            .await?;
        Ok(page
            .items
            .into_iter()
            .find(|pr| pr.base.ref_field == base)
            .map(|pr| pr.number))
    }

    async fn create_pull_request(
        &self,
        repo: &RepoId,
        pr: &NewPullRequest,
    ) -> Result<u64, ForgeError> {
        let created = self
            .client
            .pulls(&repo.org, &repo.name)
            .create(&pr.title, &pr.head, &pr.base)
            .body(&pr.body)
            .maintainer_can_modify(pr.maintainer_can_modify)
            .send()
            .await?;
        Ok(created.number)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    use super::*;

    fn pull_request_json(merged_at: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "url": "https://api.github.com/repos/foo/bar/pulls/2",
            "id": 1337,
            "number": 2,
            "state": "closed",
            "merged_at": merged_at,
            "head": { "ref": "magic", "sha": "af468c9e69dfdf39db591f1e3e8de5b64b0e62a2" },
            "base": { "ref": "master", "sha": "1ea52dc0000000000000000000000000000000a0" },
        })
    }

    async fn forge_for(mock_server: &MockServer) -> OctocrabForge {
        let client = Octocrab::builder()
            .base_uri(mock_server.uri())
            .unwrap()
            .build()
            .unwrap();
        OctocrabForge::new(Arc::new(client))
    }

    #[tokio::test]
    async fn membership_is_reported_for_members() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/foo/members/wiseguy"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;
        let forge = forge_for(&mock_server).await;

        assert!(forge.is_member("foo", "wiseguy").await.unwrap());
    }

    #[tokio::test]
    async fn membership_is_denied_for_strangers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orgs/foo/members/stranger"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        let forge = forge_for(&mock_server).await;

        assert!(!forge.is_member("foo", "stranger").await.unwrap());
    }

    #[rstest::rstest]
    #[case(Some("2017-10-19T13:14:36Z"), true)]
    #[case(None, false)]
    #[tokio::test]
    async fn merge_state_follows_merged_at(
        #[case] merged_at: Option<&str>,
        #[case] merged: bool,
    ) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/foo/bar/pulls/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pull_request_json(merged_at)))
            .mount(&mock_server)
            .await;
        let forge = forge_for(&mock_server).await;

        let pr = forge
            .get_pull_request(&RepoId::new("foo", "bar"), 2)
            .await
            .unwrap();
        assert_eq!(
            pr,
            PullRequestInfo {
                number: 2,
                merged,
                base_branch: "master".to_owned(),
            }
        );
    }
}
