//! GitHub adapter (REST API v3).
//!
//! Implements the `postbot-core` `RepoHost` port against one repository.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{header, Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use postbot_core::{
    config::{Config, RepoId},
    domain::CommitSha,
    errors::Error,
    hosting::{NewPullRequest, PullRequest, PutFile, RepoHost},
    Result,
};

const SERVICE: &str = "github";
const USER_AGENT: &str = concat!("postbot/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

#[derive(Clone, Debug)]
pub struct GitHubClient {
    api_url: Url,
    repo: RepoId,
    token: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    /// Blob being replaced; GitHub requires it when the file already exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Serialize)]
struct CreatePull<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    sha: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    html_url: String,
}

impl GitHubClient {
    pub fn new(api_url: &str, repo: RepoId, token: impl Into<String>) -> Result<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| Error::Config(format!("invalid GitHub API url {api_url:?}: {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "invalid GitHub API url {api_url}: not a base url"
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::External(format!("github client build error: {e}")))?;

        Ok(Self {
            api_url,
            repo,
            token: token.into(),
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            &cfg.github_api_url,
            cfg.github_repo.clone(),
            cfg.github_token.clone(),
        )
    }

    /// `{api}/repos/{owner}/{name}/{segments...}`, each segment percent-encoded.
    fn endpoint<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["repos", self.repo.owner.as_str(), self.repo.name.as_str()])
                .extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = req
            .send()
            .await
            .map_err(|e| Error::External(format!("github request error: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(map_status(status, &body))
    }

    fn contents_url(&self, path: &str) -> Url {
        self.endpoint(std::iter::once("contents").chain(path.split('/')))
    }

    /// Blob sha of `path` on `branch`, or `None` if it does not exist there.
    async fn existing_sha(&self, path: &str, branch: &str) -> Result<Option<String>> {
        let mut url = self.contents_url(path);
        url.query_pairs_mut().append_pair("ref", branch);

        match self.send(self.request(Method::GET, url)).await {
            Ok(resp) => {
                let parsed: ContentsResponse = resp
                    .json()
                    .await
                    .map_err(|e| Error::External(format!("github json error: {e}")))?;
                Ok(Some(parsed.sha))
            }
            Err(Error::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Map a failed response to the core error type.
///
/// GitHub reports an existing ref as `422 Reference already exists`.
fn map_status(status: StatusCode, body: &str) -> Error {
    if status == StatusCode::UNPROCESSABLE_ENTITY && body.contains("already exists") {
        return Error::Conflict(github_message(body));
    }
    Error::Http {
        service: SERVICE,
        status: status.as_u16(),
        body: github_message(body).chars().take(200).collect(),
    }
}

/// The `message` field of a GitHub error body, or the raw body.
fn github_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn get_ref(&self, branch: &str) -> Result<CommitSha> {
        let url = self.endpoint(["git", "ref", "heads"].into_iter().chain(branch.split('/')));
        debug!(%url, "github get ref");

        let resp = self.send(self.request(Method::GET, url)).await?;
        let parsed: RefResponse = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("github json error: {e}")))?;
        Ok(CommitSha(parsed.object.sha))
    }

    async fn create_ref(&self, branch: &str, sha: &CommitSha) -> Result<()> {
        let url = self.endpoint(["git", "refs"]);
        debug!(%url, branch, "github create ref");

        let body = CreateRef {
            reference: format!("refs/heads/{branch}"),
            sha: &sha.0,
        };
        self.send(self.request(Method::POST, url).json(&body))
            .await?;
        Ok(())
    }

    async fn put_file(&self, file: PutFile) -> Result<()> {
        let sha = self.existing_sha(&file.path, &file.branch).await?;
        let url = self.contents_url(&file.path);
        debug!(%url, branch = %file.branch, update = sha.is_some(), "github put contents");

        let body = PutContents {
            message: &file.message,
            content: STANDARD.encode(file.content.as_bytes()),
            branch: &file.branch,
            sha,
        };
        self.send(self.request(Method::PUT, url).json(&body))
            .await?;
        Ok(())
    }

    async fn create_pull_request(&self, pr: NewPullRequest) -> Result<PullRequest> {
        let url = self.endpoint(["pulls"]);
        debug!(%url, head = %pr.head, base = %pr.base, "github create pull request");

        let body = CreatePull {
            title: &pr.title,
            head: &pr.head,
            base: &pr.base,
            body: &pr.body,
        };
        let resp = self
            .send(self.request(Method::POST, url).json(&body))
            .await?;
        let parsed: PullResponse = resp
            .json()
            .await
            .map_err(|e| Error::External(format!("github json error: {e}")))?;

        Ok(PullRequest {
            number: parsed.number,
            url: parsed.html_url,
        })
    }
}
