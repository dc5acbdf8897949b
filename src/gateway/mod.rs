//! Access to the code host.
//!
//! `PrGateway` is the seam between the lineage engine and the host. The
//! engine only ever sees normalized `PullRequestSnapshot` and `CommitRecord`
//! values; `OctocrabClient` provides them from the GitHub REST API, and tests
//! provide them from memory.

mod client;
mod error;
mod github;
mod guarded;

use std::future::Future;

pub use client::OctocrabClient;
pub use error::{GatewayError, GatewayErrorKind};
pub use guarded::GuardedGateway;

use crate::types::{CommitRecord, PrNumber, PullRequestSnapshot, RepoId, Sha};

/// Read-only queries against the code host.
///
/// Implementations must be shareable across tasks; the engine may hold one
/// gateway for the whole process.
pub trait PrGateway: Send + Sync {
    /// Fetches a PR with its branch commits, merge commit, base commit and
    /// timeline.
    fn fetch_pull_request(
        &self,
        repo: &RepoId,
        pr: PrNumber,
    ) -> impl Future<Output = Result<PullRequestSnapshot, GatewayError>> + Send;

    /// Fetches one commit including its tree hash and diff stats.
    fn fetch_commit(
        &self,
        repo: &RepoId,
        sha: &Sha,
    ) -> impl Future<Output = Result<CommitRecord, GatewayError>> + Send;

    /// Returns true if `sha` is reachable from the tip of `branch`.
    fn is_commit_on_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &Sha,
    ) -> impl Future<Output = Result<bool, GatewayError>> + Send;
}
