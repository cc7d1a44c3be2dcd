use tracing::info;

use crate::App;
use crate::app::non_blank;
use crate::clients::github::MergeRequest;
use crate::clients::github::MergeStrategy;
use crate::error::Result;
use crate::error::WorkflowError;

impl App {
    /// Merge a previously created pull request by number.
    ///
    /// A missing number fails validation without a remote call. A PR that
    /// cannot be merged comes back as `Conflict`.
    pub async fn merge_pr(
        &self,
        pr_number: Option<u64>,
        commit_title: Option<&str>,
        commit_message: Option<&str>,
        strategy: MergeStrategy,
    ) -> Result<u64> {
        let session = self.session()?;
        let pr_number = pr_number.ok_or_else(|| WorkflowError::validation("PR number required"))?;

        let request = MergeRequest {
            pr_number,
            commit_title: non_blank(commit_title)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Merge pull request #{}", pr_number)),
            commit_message: commit_message.unwrap_or_default().to_string(),
            strategy,
        };
        self.gh
            .merge_pull_request(&session.credential, &request)
            .await?;
        info!(pr_number, ?strategy, "Merged PR");

        Ok(pr_number)
    }
}
