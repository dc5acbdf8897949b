//! Emission of the commits folded into a squash.
//!
//! Shallow expansion lists each branch commit as a Squashed Commit. Deep
//! expansion lists them as Expanded Commits and queues the first PR each
//! message references, one level deeper. At the depth cap deep expansion
//! falls back to shallow.

use tracing::debug;

use crate::config::{AnalysisConfig, DepthPolicy};
use crate::detection::{AggregateVerdict, first_pr_reference};
use crate::types::{PrNumber, PullRequestSnapshot, Sha};

use super::node::{LineageNode, NodeMetadata, OperationType};
use super::queue::WorkQueue;

/// Recorded on expanded commits whose message names no PR.
pub const NO_REFERENCE: &str = "no PR reference in commit message";

#[derive(Debug, Default)]
pub struct Expansion {
    pub nodes: Vec<LineageNode>,
    /// Nested PRs queued, with the commit that referenced each.
    pub queued: Vec<(PrNumber, Sha)>,
    pub max_depth_reached: bool,
}

/// Expands the branch commits of `pr`, whose merge commit `squash_sha` was
/// classified as a squash.
pub fn expand_squash(
    pr: &PullRequestSnapshot,
    squash_sha: &Sha,
    aggregate: &AggregateVerdict,
    depth: u32,
    config: &AnalysisConfig,
    queue: &mut WorkQueue,
) -> Expansion {
    let deep = config.depth_policy == DepthPolicy::Deep;
    let capped = deep && depth >= config.limits.max_depth;
    if capped {
        debug!(pr = %pr.number, depth, "Depth cap reached, expanding shallowly");
    }

    let mut expansion = Expansion {
        max_depth_reached: capped,
        ..Expansion::default()
    };

    for commit in &pr.branch_commits {
        let mut metadata = NodeMetadata {
            pr: Some(pr.number),
            depth,
            confidence: Some(aggregate.confidence),
            squashed_from: Some(pr.head_ref.clone()),
            squash_sha: Some(squash_sha.clone()),
            max_depth_reached: capped,
            ..NodeMetadata::default()
        };

        let operation_type = if deep && !capped {
            match first_pr_reference(&commit.message) {
                Some(nested) => {
                    metadata.nested_pr = Some(nested);
                    match queue.try_enqueue(nested, depth + 1) {
                        Ok(()) => expansion.queued.push((nested, commit.sha.clone())),
                        Err(refusal) => {
                            debug!(pr = %pr.number, nested = %nested, reason = %refusal, "Nested PR not queued");
                            metadata.expansion_error = Some(refusal.to_string());
                        }
                    }
                }
                None => metadata.expansion_error = Some(NO_REFERENCE.to_string()),
            }
            OperationType::ExpandedCommit
        } else {
            OperationType::SquashedCommit
        };

        expansion.nodes.push(
            LineageNode::from_commit(commit, &pr.head_ref, operation_type).with_metadata(metadata),
        );
    }

    expansion
}
