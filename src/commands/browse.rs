use crate::App;
use crate::clients::github::DirEntry;
use crate::clients::github::FileRecord;
use crate::clients::github::PullRequest;
use crate::error::Result;

impl App {
    /// Read a file from the base branch along with its version token.
    pub async fn read_file(&self, path: &str) -> Result<FileRecord> {
        let session = self.session()?;
        let path = self.resolve_path(Some(path))?;
        self.gh
            .get_file(&session.credential, &path, &self.config.base_branch)
            .await
    }

    /// List the repository root.
    pub async fn list_files(&self) -> Result<Vec<DirEntry>> {
        let session = self.session()?;
        self.gh.list_dir(&session.credential, "").await
    }

    pub async fn list_pull_requests(&self) -> Result<Vec<PullRequest>> {
        let session = self.session()?;
        self.gh.list_pull_requests(&session.credential).await
    }
}
