//! Commit tree structure: a single-parent merge whose tree differs from the
//! branch tip's tree was rewritten rather than fast-forwarded.

use crate::detection::Algorithm;
use crate::detection::context::DetectionContext;
use crate::detection::verdict::DetectionEvidence;

use super::{DetectionFault, SquashDetector, Vote};

pub struct TreeStructure;

impl SquashDetector for TreeStructure {
    fn algorithm(&self) -> Algorithm {
        Algorithm::TreeStructure
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
        let parent_count = ctx.merge_commit.parents.len();

        if parent_count != 1 {
            return Ok(Vote::not_squash(
                0.8,
                format!("Merge commit has {parent_count} parents"),
                DetectionEvidence::TreeStructure {
                    parent_count,
                    merge_tree: None,
                    tip_tree: None,
                },
            ));
        }

        let merge_tree = ctx.detailed_merge_commit().tree_sha.clone().ok_or_else(|| {
            DetectionFault::unavailable(
                "merge commit tree",
                ctx.evidence
                    .merge_details
                    .error()
                    .unwrap_or("host reported no tree"),
            )
        })?;

        let Some(tip) = ctx.detailed_branch_tip() else {
            return Ok(Vote::not_squash(
                0.2,
                "No branch commits to compare against",
                DetectionEvidence::TreeStructure {
                    parent_count,
                    merge_tree: Some(merge_tree),
                    tip_tree: None,
                },
            ));
        };

        let tip_tree = tip.tree_sha.clone().ok_or_else(|| {
            DetectionFault::unavailable(
                "branch tip tree",
                ctx.evidence
                    .branch_details
                    .error()
                    .unwrap_or("host reported no tree"),
            )
        })?;

        let differ = merge_tree != tip_tree;
        let evidence = DetectionEvidence::TreeStructure {
            parent_count,
            merge_tree: Some(merge_tree),
            tip_tree: Some(tip_tree),
        };

        if differ {
            Ok(Vote::squash(
                0.8,
                "Single parent and tree differs from the branch tip",
                evidence,
            ))
        } else {
            Ok(Vote::not_squash(
                0.5,
                "Tree is identical to the branch tip",
                evidence,
            ))
        }
    }
}
