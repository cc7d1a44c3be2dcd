//! Workflow operations, one file per request kind.
//!
//! Every operation snapshots the credential first and fails with
//! `Unauthenticated` before issuing any remote call.

mod auth;
mod browse;
mod commit;
mod merge;
mod propose;

pub use commit::WriteOutcome;
pub use propose::Proposal;
pub use propose::ProposalFailure;
pub use propose::ProposalRequest;
pub use propose::ProposalStage;
