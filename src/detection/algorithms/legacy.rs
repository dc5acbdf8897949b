//! The original baseline rule: one parent, several branch commits.

use crate::detection::Algorithm;
use crate::detection::context::DetectionContext;
use crate::detection::patterns::squash_indicators;
use crate::detection::verdict::DetectionEvidence;

use super::{DetectionFault, SquashDetector, Vote};

pub struct LegacyHeuristic;

impl SquashDetector for LegacyHeuristic {
    fn algorithm(&self) -> Algorithm {
        Algorithm::LegacyHeuristic
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
        let parent_count = ctx.merge_commit.parents.len();
        let branch_commit_count = ctx.branch_commits().len();
        let pattern_match = !squash_indicators(&ctx.merge_commit.message).is_empty();

        let evidence = DetectionEvidence::LegacyHeuristic {
            parent_count,
            branch_commit_count,
            pattern_match,
        };

        let vote = if parent_count == 1 && branch_commit_count > 1 {
            let confidence = if pattern_match { 0.7 } else { 0.5 };
            Vote::squash(
                confidence,
                format!("One parent for {branch_commit_count} branch commits"),
                evidence,
            )
        } else if parent_count > 1 {
            Vote::not_squash(0.7, format!("{parent_count} parents"), evidence)
        } else {
            Vote::not_squash(
                0.4,
                format!("{parent_count} parent(s) for {branch_commit_count} branch commit(s)"),
                evidence,
            )
        };
        Ok(vote)
    }
}
