use crate::core::PullRequestRef;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};

const DEFAULT_API_URL: &str = "https://api.github.com";
const COMMITS_PER_PAGE: usize = 100;

/// Base and head branches of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub base_ref: String,
    pub head_ref: String,
}

/// Payload of `POST /repos/{owner}/{repo}/pulls/{number}/comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewCommentRequest {
    pub body: String,
    pub commit_id: String,
    pub path: String,
    pub line: u64,
    pub side: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_side: Option<String>,
}

/// The pull-request operations a review needs from the hosting service.
#[async_trait]
pub trait ReviewHost: Send + Sync {
    async fn pull_request(&self, pr: &PullRequestRef) -> Result<PullRequestInfo>;
    /// SHA of the most recent commit on the pull request.
    async fn latest_commit(&self, pr: &PullRequestRef) -> Result<Option<String>>;
    async fn create_review_comment(
        &self,
        pr: &PullRequestRef,
        comment: &ReviewCommentRequest,
    ) -> Result<()>;
    async fn create_issue_comment(&self, pr: &PullRequestRef, body: &str) -> Result<()>;
}

pub struct GitHubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct PullRequestResponse {
    base: BranchRef,
    head: BranchRef,
}

#[derive(Deserialize)]
struct BranchRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
}

impl GitHubClient {
    pub fn new(api_url: Option<&str>, token: Option<&str>) -> Result<Self> {
        let api_url = api_url
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .user_agent(concat!("guideline-review/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url,
            token: token.map(str::to_string),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: reqwest::Method, route: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.api_url, route))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to {}", what))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GitHub API error {} while trying to {}: {}", status, what, body);
        }
        Ok(response)
    }
}

#[async_trait]
impl ReviewHost for GitHubClient {
    async fn pull_request(&self, pr: &PullRequestRef) -> Result<PullRequestInfo> {
        let route = format!("/repos/{}/{}/pulls/{}", pr.owner, pr.repo, pr.number);
        let response = Self::send(
            self.request(reqwest::Method::GET, &route),
            &format!("fetch pull request {}", pr),
        )
        .await?;
        let pull: PullRequestResponse = response
            .json()
            .await
            .context("Failed to parse pull request response")?;

        Ok(PullRequestInfo {
            base_ref: pull.base.name,
            head_ref: pull.head.name,
        })
    }

    async fn latest_commit(&self, pr: &PullRequestRef) -> Result<Option<String>> {
        let route = format!("/repos/{}/{}/pulls/{}/commits", pr.owner, pr.repo, pr.number);
        let mut latest = None;
        let mut page = 1;

        loop {
            let builder = self
                .request(reqwest::Method::GET, &route)
                .query(&[("per_page", COMMITS_PER_PAGE), ("page", page)]);
            let response = Self::send(builder, &format!("list commits of {}", pr)).await?;
            let commits: Vec<CommitResponse> = response
                .json()
                .await
                .context("Failed to parse commit list")?;

            let count = commits.len();
            if let Some(last) = commits.into_iter().last() {
                latest = Some(last.sha);
            }
            if count < COMMITS_PER_PAGE {
                return Ok(latest);
            }
            page += 1;
        }
    }

    async fn create_review_comment(
        &self,
        pr: &PullRequestRef,
        comment: &ReviewCommentRequest,
    ) -> Result<()> {
        let route = format!("/repos/{}/{}/pulls/{}/comments", pr.owner, pr.repo, pr.number);
        Self::send(
            self.request(reqwest::Method::POST, &route).json(comment),
            &format!("comment on {}:{}", comment.path, comment.line),
        )
        .await?;
        Ok(())
    }

    async fn create_issue_comment(&self, pr: &PullRequestRef, body: &str) -> Result<()> {
        let route = format!("/repos/{}/{}/issues/{}/comments", pr.owner, pr.repo, pr.number);
        Self::send(
            self.request(reqwest::Method::POST, &route)
                .json(&serde_json::json!({ "body": body })),
            &format!("comment on {}", pr),
        )
        .await?;
        Ok(())
    }
}
