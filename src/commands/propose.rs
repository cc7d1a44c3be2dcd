use std::fmt::Display;

use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::App;
use crate::app::Session;
use crate::app::non_blank;
use crate::branch_name;
use crate::clients::github::FileUpdate;
use crate::clients::github::NewPullRequest;
use crate::clients::github::PullRequest;
use crate::clients::github::VersionToken;
use crate::error::Operation;
use crate::error::RemoteFailure;
use crate::error::Result;
use crate::error::WorkflowError;

/// How many unused-name candidates to try before giving up.
const MAX_BRANCH_ATTEMPTS: usize = 5;

const DEFAULT_TITLE: &str = "Update from web editor";
const DEFAULT_BODY: &str = "Changes made via web editor";
const BRANCH_COMMIT_MESSAGE: &str = "Update from web editor";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub path: Option<String>,
    pub content: String,
    /// Branch to propose against; the configured base branch when absent.
    pub base_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub branch: String,
    pub version: VersionToken,
    pub pull_request: PullRequest,
}

/// Last step a proposal completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProposalStage {
    #[default]
    Started,
    RefRead,
    BranchCreated,
    FileWritten,
    PrCreated,
}

impl Display for ProposalStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Started => "started",
            Self::RefRead => "ref_read",
            Self::BranchCreated => "branch_created",
            Self::FileWritten => "file_written",
            Self::PrCreated => "pr_created",
        })
    }
}

/// A proposal that stopped part-way.
///
/// Nothing is rolled back: when `branch` is set, that branch (and, from
/// `FileWritten` on, its commit) exists on the remote.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ProposalFailure {
    pub stage: ProposalStage,
    pub branch: Option<String>,
    #[source]
    pub error: WorkflowError,
}

#[derive(Default)]
struct Progress {
    stage: ProposalStage,
    branch: Option<String>,
}

impl Progress {
    fn advance(&mut self, stage: ProposalStage) {
        self.stage = stage;
    }

    fn fail(&self, error: WorkflowError) -> ProposalFailure {
        if let Some(branch) = &self.branch {
            warn!(stage = %self.stage, %branch, %error, "Proposal stopped; branch left in place");
        } else {
            warn!(stage = %self.stage, %error, "Proposal stopped");
        }
        ProposalFailure {
            stage: self.stage,
            branch: self.branch.clone(),
            error,
        }
    }
}

impl App {
    /// Propose a change on a fresh branch and open a pull request for it.
    ///
    /// 1. Mint a branch name that does not exist yet.
    /// 2. Read the tip of the base branch.
    /// 3. Create the branch at that tip.
    /// 4. Read the file's version token on the base branch (the new branch is
    ///    an identical copy at this point).
    /// 5. Write the content to the new branch with that token.
    /// 6. Open a pull request from the new branch into the base branch.
    ///
    /// The first failing step ends the sequence. Already-created branches and
    /// commits are left for an operator; the failure records how far it got.
    pub async fn propose(
        &self,
        request: &ProposalRequest,
    ) -> std::result::Result<Proposal, ProposalFailure> {
        let mut progress = Progress::default();

        let session = self.session().map_err(|e| progress.fail(e))?;
        let path = self
            .resolve_path(request.path.as_deref())
            .map_err(|e| progress.fail(e))?;
        let base = non_blank(request.base_branch.as_deref())
            .unwrap_or(&self.config.base_branch)
            .to_string();
        let credential = &session.credential;

        let branch = self
            .unused_branch_name(&session)
            .await
            .map_err(|e| progress.fail(e))?;

        let base_version = self
            .gh
            .get_ref(credential, &base)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.advance(ProposalStage::RefRead);

        self.gh
            .create_ref(credential, &branch, &base_version)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.branch = Some(branch.clone());
        progress.advance(ProposalStage::BranchCreated);
        info!(%branch, %base, from = %base_version, "Created proposal branch");

        let current = self
            .gh
            .get_file(credential, &path, &base)
            .await
            .map_err(|e| progress.fail(e))?;

        let update = FileUpdate {
            path,
            content: request.content.clone(),
            version: current.version,
            branch: branch.clone(),
            message: BRANCH_COMMIT_MESSAGE.to_string(),
        };
        let version = self
            .gh
            .put_file(credential, &update)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.advance(ProposalStage::FileWritten);

        let new_pr = NewPullRequest {
            title: non_blank(request.title.as_deref())
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            body: non_blank(request.body.as_deref())
                .unwrap_or(DEFAULT_BODY)
                .to_string(),
            head: branch.clone(),
            base,
        };
        let pull_request = self
            .gh
            .create_pull_request(credential, &new_pr)
            .await
            .map_err(|e| progress.fail(e))?;
        progress.advance(ProposalStage::PrCreated);
        info!(number = pull_request.number, url = %pull_request.url, "Created PR");

        Ok(Proposal {
            branch,
            version,
            pull_request,
        })
    }

    /// Find a branch name that the remote does not know yet.
    async fn unused_branch_name(&self, session: &Session) -> Result<String> {
        for _ in 0..MAX_BRANCH_ATTEMPTS {
            let candidate = branch_name::generate(&self.config.branch_prefix);
            match self.gh.get_ref(&session.credential, &candidate).await {
                Err(e) if e.is_not_found() => return Ok(candidate),
                Err(e) => return Err(e),
                Ok(_) => warn!(%candidate, "Branch name already taken, generating another"),
            }
        }

        Err(WorkflowError::Conflict(RemoteFailure::new(
            Operation::CreateRef,
            422,
            format!(
                "no unused branch name found after {} attempts",
                MAX_BRANCH_ATTEMPTS
            ),
        )))
    }
}
