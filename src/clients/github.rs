use std::fmt::Display;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
#[cfg(test)]
use mockall::automock;
use reqwest::Method;
use reqwest::Url;
use serde::Deserialize;
use serde::Serialize;
use tracing::instrument;

use super::github_http::GithubHttpClient;
use crate::config::Config;
use crate::credentials::Credential;
use crate::error::Operation;
use crate::error::RemoteFailure;
use crate::error::Result;
use crate::error::WorkflowError;

// -----------------------------------------------------------------------------
// ContentApi trait

/// Operations against the remote content API of the configured repository.
///
/// Every call takes the credential explicitly and issues exactly one request.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContentApi: Send + Sync {
    /// Fetch a file and its current version token as seen on `branch`.
    async fn get_file(&self, credential: &Credential, path: &str, branch: &str)
    -> Result<FileRecord>;

    /// Conditionally update an existing file; returns the new version token.
    async fn put_file(&self, credential: &Credential, update: &FileUpdate) -> Result<VersionToken>;

    /// Resolve the tip of a branch.
    async fn get_ref(&self, credential: &Credential, branch: &str) -> Result<VersionToken>;

    /// Create `branch` pointing at `from`.
    async fn create_ref(
        &self,
        credential: &Credential,
        branch: &str,
        from: &VersionToken,
    ) -> Result<()>;

    /// List a directory; the empty path is the repository root.
    async fn list_dir(&self, credential: &Credential, path: &str) -> Result<Vec<DirEntry>>;

    async fn create_pull_request(
        &self,
        credential: &Credential,
        request: &NewPullRequest,
    ) -> Result<PullRequest>;

    async fn merge_pull_request(&self, credential: &Credential, request: &MergeRequest)
    -> Result<()>;

    async fn list_pull_requests(&self, credential: &Credential) -> Result<Vec<PullRequest>>;

    /// Login of the user the credential belongs to.
    async fn current_user(&self, credential: &Credential) -> Result<String>;
}

// -----------------------------------------------------------------------------
// Types

/// Opaque version identifier (SHA) of a file or ref.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(pub String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub version: VersionToken,
}

/// A conditional write of a whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub path: String,
    pub content: String,
    /// Version the write is conditioned on.
    pub version: VersionToken,
    pub branch: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub head_ref: String,
    pub base_ref: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    #[default]
    Merge,
    Squash,
    Rebase,
}

impl FromStr for MergeStrategy {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "merge" => Ok(Self::Merge),
            "squash" => Ok(Self::Squash),
            "rebase" => Ok(Self::Rebase),
            other => Err(WorkflowError::validation(format!(
                "Unknown merge strategy: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequest {
    pub pr_number: u64,
    pub commit_title: String,
    pub commit_message: String,
    pub strategy: MergeStrategy,
}

// -----------------------------------------------------------------------------
// Wire types

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    content: ObjectSha,
}

#[derive(Debug, Deserialize)]
struct ObjectSha {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    object: ObjectSha,
}

#[derive(Debug, Serialize)]
struct CreateRef<'a> {
    #[serde(rename = "ref")]
    ref_name: String,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct PullRequestResponse {
    number: u64,
    html_url: String,
    title: String,
    #[serde(default)]
    body: Option<String>,
    head: BranchLabel,
    base: BranchLabel,
}

#[derive(Debug, Deserialize)]
struct BranchLabel {
    #[serde(rename = "ref")]
    ref_name: String,
}

impl From<PullRequestResponse> for PullRequest {
    fn from(pr: PullRequestResponse) -> Self {
        Self {
            number: pr.number,
            title: pr.title,
            body: pr.body,
            head_ref: pr.head.ref_name,
            base_ref: pr.base.ref_name,
            url: pr.html_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct MergePullRequest<'a> {
    commit_title: &'a str,
    commit_message: &'a str,
    merge_method: MergeStrategy,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
}

// -----------------------------------------------------------------------------
// Content encoding

/// Encode file content for transport.
pub fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

/// Decode transported file content. The remote wraps base64 at 60 columns.
pub fn decode_content(encoded: &str) -> std::result::Result<String, String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| format!("invalid base64 content: {}", e))?;
    String::from_utf8(bytes).map_err(|_| "file is not valid UTF-8 text".to_string())
}

// -----------------------------------------------------------------------------
// GithubClient

/// Client to interact with the GitHub REST API for one repository.
pub struct GithubClient {
    owner: String,
    repo: String,
    api_url: Url,
    http_client: GithubHttpClient,
}

impl GithubClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let api_url = Url::parse(&config.api_url)
            .with_context(|| format!("Invalid API URL: {}", config.api_url))?;
        if api_url.cannot_be_a_base() {
            anyhow::bail!("API URL cannot be used as a base: {}", config.api_url);
        }

        Ok(Self {
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            api_url,
            http_client: GithubHttpClient::new(),
        })
    }

    /// Build `{api}/repos/{owner}/{repo}/{segments...}`, escaping each segment.
    fn repo_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str()])
                .extend(segments);
        }
        url
    }

    fn contents_url(&self, path: &str) -> Url {
        let segments = path.split('/').filter(|s| !s.is_empty());
        self.repo_url(std::iter::once("contents").chain(segments))
    }
}

#[async_trait]
impl ContentApi for GithubClient {
    #[instrument(skip_all, fields(path = %path, branch = %branch))]
    async fn get_file(
        &self,
        credential: &Credential,
        path: &str,
        branch: &str,
    ) -> Result<FileRecord> {
        let op = Operation::GetFile;
        let mut url = self.contents_url(path);
        url.query_pairs_mut().append_pair("ref", branch);

        let response = self.http_client.get(op, credential, url).await?;
        let file: ContentsResponse = response.json(op)?;

        if file.encoding.as_deref() != Some("base64") {
            return Err(WorkflowError::Remote(RemoteFailure::new(
                op,
                response.status,
                format!("{} is not returned inline and cannot be edited", file.path),
            )));
        }
        let content = decode_content(&file.content).map_err(|message| {
            WorkflowError::Remote(RemoteFailure::new(op, response.status, message))
        })?;

        Ok(FileRecord {
            path: file.path,
            content,
            version: VersionToken(file.sha),
        })
    }

    #[instrument(skip_all, fields(path = %update.path, branch = %update.branch))]
    async fn put_file(&self, credential: &Credential, update: &FileUpdate) -> Result<VersionToken> {
        let op = Operation::PutFile;
        let body = PutContents {
            message: &update.message,
            content: encode_content(&update.content),
            sha: &update.version.0,
            branch: &update.branch,
        };

        let response = self
            .http_client
            .send_json(op, Method::PUT, credential, self.contents_url(&update.path), &body)
            .await?;
        let written: PutContentsResponse = response.json(op)?;
        Ok(VersionToken(written.content.sha))
    }

    #[instrument(skip_all, fields(branch = %branch))]
    async fn get_ref(&self, credential: &Credential, branch: &str) -> Result<VersionToken> {
        let op = Operation::GetRef;
        let url = self.repo_url(["git", "ref", "heads"].into_iter().chain(branch.split('/')));

        let response = self.http_client.get(op, credential, url).await?;
        let git_ref: GitRef = response.json(op)?;
        Ok(VersionToken(git_ref.object.sha))
    }

    #[instrument(skip_all, fields(branch = %branch))]
    async fn create_ref(
        &self,
        credential: &Credential,
        branch: &str,
        from: &VersionToken,
    ) -> Result<()> {
        let op = Operation::CreateRef;
        let body = CreateRef {
            ref_name: format!("refs/heads/{}", branch),
            sha: &from.0,
        };

        self.http_client
            .send_json(op, Method::POST, credential, self.repo_url(["git", "refs"]), &body)
            .await?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path))]
    async fn list_dir(&self, credential: &Credential, path: &str) -> Result<Vec<DirEntry>> {
        let op = Operation::ListDir;
        let response = self
            .http_client
            .get(op, credential, self.contents_url(path))
            .await?;
        response.json(op)
    }

    #[instrument(skip_all, fields(head = %request.head, base = %request.base))]
    async fn create_pull_request(
        &self,
        credential: &Credential,
        request: &NewPullRequest,
    ) -> Result<PullRequest> {
        let op = Operation::CreatePullRequest;
        let response = self
            .http_client
            .send_json(op, Method::POST, credential, self.repo_url(["pulls"]), request)
            .await?;
        let pr: PullRequestResponse = response.json(op)?;
        Ok(pr.into())
    }

    #[instrument(skip_all, fields(pr_number = request.pr_number))]
    async fn merge_pull_request(
        &self,
        credential: &Credential,
        request: &MergeRequest,
    ) -> Result<()> {
        let op = Operation::MergePullRequest;
        let number = request.pr_number.to_string();
        let body = MergePullRequest {
            commit_title: &request.commit_title,
            commit_message: &request.commit_message,
            merge_method: request.strategy,
        };

        self.http_client
            .send_json(
                op,
                Method::PUT,
                credential,
                self.repo_url(["pulls", number.as_str(), "merge"]),
                &body,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn list_pull_requests(&self, credential: &Credential) -> Result<Vec<PullRequest>> {
        let op = Operation::ListPullRequests;
        let mut url = self.repo_url(["pulls"]);
        url.query_pairs_mut().append_pair("state", "open");

        let response = self.http_client.get(op, credential, url).await?;
        let prs: Vec<PullRequestResponse> = response.json(op)?;
        Ok(prs.into_iter().map(PullRequest::from).collect())
    }

    #[instrument(skip_all)]
    async fn current_user(&self, credential: &Credential) -> Result<String> {
        let op = Operation::GetUser;
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("user");
        }

        let response = self.http_client.get(op, credential, url).await?;
        let user: User = response.json(op)?;
        Ok(user.login)
    }
}
