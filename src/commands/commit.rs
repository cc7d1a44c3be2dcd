use log::debug;
use tracing::info;
use tracing::warn;

use crate::App;
use crate::clients::github::FileUpdate;
use crate::clients::github::VersionToken;
use crate::error::Result;

/// Result of a committed direct write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub path: String,
    pub version: VersionToken,
}

impl App {
    /// Commit `content` to `path` on the base branch.
    ///
    /// 1. Use the caller's version token, or fetch the file's current one
    ///    (a missing file is `NotFound`; only existing files can be updated).
    /// 2. Issue exactly one conditional write with that token.
    ///
    /// A stale token comes back as `Conflict`. Nothing is retried: the caller
    /// decides whether to re-read and try again.
    pub async fn write_file(
        &self,
        path: Option<&str>,
        content: &str,
        version: Option<VersionToken>,
    ) -> Result<WriteOutcome> {
        let session = self.session()?;
        let path = self.resolve_path(path)?;
        let branch = &self.config.base_branch;

        let version = match version.filter(|v| !v.0.trim().is_empty()) {
            Some(version) => version,
            None => {
                let current = self.gh.get_file(&session.credential, &path, branch).await?;
                debug!("Resolved {} to version {}", path, current.version);
                current.version
            }
        };

        let update = FileUpdate {
            message: format!("Update {} from web editor", path),
            path,
            content: content.to_string(),
            version,
            branch: branch.clone(),
        };
        let new_version = self
            .gh
            .put_file(&session.credential, &update)
            .await
            .inspect_err(|e| {
                if e.is_conflict() {
                    warn!(path = %update.path, version = %update.version, "Version token is stale");
                }
            })?;
        info!(path = %update.path, version = %new_version, "Committed file");

        Ok(WriteOutcome {
            path: update.path,
            version: new_version,
        })
    }
}
