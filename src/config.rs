use anyhow::Context;
use anyhow::Result;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_BASE_BRANCH: &str = "main";
pub const DEFAULT_BRANCH_PREFIX: &str = "web-editor-";
pub const DEFAULT_PATH: &str = "index.html";

/// Fixed repository identity and workflow defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub owner: String,
    pub repo: String,
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    /// Branch that direct commits land on and proposals branch from.
    pub base_branch: String,
    /// Prefix of the branches minted for proposals.
    pub branch_prefix: String,
    /// Path used when a request does not name one.
    pub default_path: String,
}

impl Config {
    /// Create a new config for `owner/repo` with default settings.
    pub fn new(owner: String, repo: String) -> Self {
        Self {
            owner,
            repo,
            api_url: DEFAULT_API_URL.to_string(),
            base_branch: DEFAULT_BASE_BRANCH.to_string(),
            branch_prefix: DEFAULT_BRANCH_PREFIX.to_string(),
            default_path: DEFAULT_PATH.to_string(),
        }
    }

    /// Create a config from a repository string such as `owner/repo`,
    /// `https://github.com/owner/repo.git` or `git@github.com:owner/repo.git`.
    pub fn from_repository(repository: &str) -> Result<Self> {
        let (owner, repo) = parse_repository(repository)?;
        Ok(Self::new(owner, repo))
    }

    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_base_branch(mut self, base_branch: String) -> Self {
        self.base_branch = base_branch;
        self
    }

    pub fn with_branch_prefix(mut self, branch_prefix: String) -> Self {
        self.branch_prefix = branch_prefix;
        self
    }

    pub fn with_default_path(mut self, default_path: String) -> Self {
        self.default_path = default_path;
        self
    }

    /// Default config for tests
    pub fn default_for_tests() -> Self {
        Self::new("test".to_string(), "repo".to_string())
    }
}

fn parse_repository(repository: &str) -> Result<(String, String)> {
    let repository = repository.trim();
    let parts = if let Some(rest) = repository.strip_prefix("git@github.com:") {
        rest
    } else if let Some(rest) = repository.strip_prefix("https://github.com/") {
        rest
    } else {
        repository
    };

    let parts = parts.strip_suffix(".git").unwrap_or(parts);
    let parts = parts.trim_end_matches('/');
    let mut split = parts.split('/');
    let owner = split
        .next()
        .filter(|s| !s.is_empty())
        .context("Could not parse owner from repository")?
        .to_string();
    let repo = split
        .next()
        .filter(|s| !s.is_empty())
        .context("Could not parse repo from repository")?
        .to_string();
    if split.next().is_some() {
        anyhow::bail!("Repository must be of the form owner/repo: {}", repository);
    }

    Ok((owner, repo))
}
