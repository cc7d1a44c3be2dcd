use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::clients::github::ContentApi;
use crate::config::Config;
use crate::credentials::Credential;
use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::error::WorkflowError;

/// Path segments that may not appear in a repository-relative path.
static FORBIDDEN_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|/)(\.{1,2})?(/|$)").expect("valid regex"));

pub struct App {
    pub config: Config,
    pub gh: Arc<dyn ContentApi>,
    pub credentials: CredentialStore,
}

/// Credential snapshot taken at the start of one workflow call.
///
/// Re-authenticating while a call is in flight does not affect it.
pub struct Session {
    pub credential: Credential,
}

impl App {
    pub fn new(config: Config, gh: Arc<dyn ContentApi>) -> Self {
        Self {
            config,
            gh,
            credentials: CredentialStore::new(),
        }
    }
}

/// Shared helper methods for App
impl App {
    /// Snapshot the live credential, failing before any I/O if there is none.
    pub(crate) fn session(&self) -> Result<Session> {
        let credential = self
            .credentials
            .current()
            .ok_or(WorkflowError::Unauthenticated)?;
        Ok(Session { credential })
    }

    /// Resolve an optional request path against the configured default and
    /// reject anything that is not a plain repository-relative path.
    pub(crate) fn resolve_path(&self, path: Option<&str>) -> Result<String> {
        let path = non_blank(path).unwrap_or(&self.config.default_path);
        if path.starts_with('/') || FORBIDDEN_SEGMENT.is_match(path) {
            return Err(WorkflowError::validation(format!("Invalid file path: {}", path)));
        }
        Ok(path.to_string())
    }
}

/// Treat empty or whitespace-only input as absent.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
