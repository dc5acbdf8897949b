//! Bounded extra fetches for the detectors that look past the snapshot.
//!
//! Only enabled algorithms cause fetches. A failed fetch becomes
//! `Gathered::Failed` and the affected detectors degrade; only errors whose
//! kind is fatal (credentials, rate limits) abort the analysis.

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::LineageError;
use crate::gateway::{GuardedGateway, PrGateway};
use crate::types::{CommitRecord, PullRequestSnapshot, RepoId};

use super::Algorithm;
use super::context::{BaseMembership, Gathered, GatheredEvidence};

/// Gathers the evidence the enabled algorithms need for `merge_commit`.
pub async fn gather_evidence<G: PrGateway>(
    gateway: &GuardedGateway<G>,
    repo: &RepoId,
    pr: &PullRequestSnapshot,
    merge_commit: &CommitRecord,
    config: &AnalysisConfig,
) -> Result<GatheredEvidence, LineageError> {
    let wants_tree = config.is_enabled(Algorithm::TreeStructure);
    let wants_stats = config.is_enabled(Algorithm::DiffSimilarity);
    let lacks_details =
        |c: &CommitRecord| (wants_tree && c.tree_sha.is_none()) || (wants_stats && c.stats.is_none());

    let merge_details = if !(wants_tree || wants_stats) {
        Gathered::NotRequested
    } else if lacks_details(merge_commit) {
        degrade(gateway.fetch_commit(repo, &merge_commit.sha).await)?
    } else {
        Gathered::Available(merge_commit.clone())
    };

    let branch_details = if !(wants_tree || wants_stats) {
        Gathered::NotRequested
    } else {
        let sample = newest(&pr.branch_commits, config.limits.branch_detail_sample);
        let mut details = Vec::with_capacity(sample.len());
        let mut failure = None;
        for commit in sample {
            if !lacks_details(commit) {
                details.push(commit.clone());
                continue;
            }
            match degrade(gateway.fetch_commit(repo, &commit.sha).await)? {
                Gathered::Available(detailed) => details.push(detailed),
                Gathered::Failed(reason) => {
                    failure = Some(reason);
                    break;
                }
                Gathered::NotRequested => {}
            }
        }
        match failure {
            Some(reason) => Gathered::Failed(reason),
            None => Gathered::Available(details),
        }
    };

    let base_membership = if config.is_enabled(Algorithm::HostMergeStrategy) {
        let sample = pr
            .branch_commits
            .iter()
            .take(config.limits.base_membership_sample);
        let mut checked = Vec::new();
        let mut failure = None;
        for commit in sample {
            let result = gateway
                .is_commit_on_branch(repo, &pr.base_ref, &commit.sha)
                .await;
            match degrade(result)? {
                Gathered::Available(on_base) => checked.push(BaseMembership {
                    sha: commit.sha.clone(),
                    on_base,
                }),
                Gathered::Failed(reason) => {
                    failure = Some(reason);
                    break;
                }
                Gathered::NotRequested => {}
            }
        }
        match failure {
            Some(reason) => Gathered::Failed(reason),
            None => Gathered::Available(checked),
        }
    } else {
        Gathered::NotRequested
    };

    Ok(GatheredEvidence {
        merge_details,
        branch_details,
        base_membership,
    })
}

fn newest(commits: &[CommitRecord], limit: usize) -> &[CommitRecord] {
    &commits[commits.len().saturating_sub(limit)..]
}

fn degrade<T>(result: Result<T, LineageError>) -> Result<Gathered<T>, LineageError> {
    match result {
        Ok(value) => Ok(Gathered::Available(value)),
        Err(e) if e.kind().is_fatal() => Err(e),
        Err(e) => {
            debug!(error = %e, "Evidence fetch failed, degrading");
            Ok(Gathered::Failed(e.to_string()))
        }
    }
}
