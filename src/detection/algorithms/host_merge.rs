//! Host merge strategy: single parent, squash-style message, and branch commits
//! that never reached the base branch.

use crate::detection::Algorithm;
use crate::detection::context::{DetectionContext, Gathered};
use crate::detection::patterns::squash_indicators;
use crate::detection::verdict::DetectionEvidence;

use super::{DetectionFault, SquashDetector, Vote};

/// Patterns beyond this count add no further confidence.
const MAX_COUNTED_PATTERNS: usize = 3;

pub struct HostMergeStrategy;

impl SquashDetector for HostMergeStrategy {
    fn algorithm(&self) -> Algorithm {
        Algorithm::HostMergeStrategy
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
        let merge = ctx.merge_commit;
        let parent_count = merge.parents.len();
        let patterns = squash_indicators(&merge.message);

        let (sampled, absent_from_base) = match &ctx.evidence.base_membership {
            Gathered::Available(sample) => (
                sample.len(),
                sample.iter().filter(|m| !m.on_base).count(),
            ),
            Gathered::Failed(reason) => {
                return Err(DetectionFault::unavailable("base-branch membership", reason.clone()));
            }
            Gathered::NotRequested => (0, 0),
        };

        let pattern_count = patterns.len();
        let evidence = DetectionEvidence::HostMergeStrategy {
            parent_count,
            patterns,
            sampled,
            absent_from_base,
        };

        if parent_count != 1 {
            let confidence = if parent_count == 0 { 0.5 } else { 0.9 };
            return Ok(Vote::not_squash(
                confidence,
                format!("Merge commit has {parent_count} parents; a squash has exactly one"),
                evidence,
            ));
        }

        if sampled > 0 && absent_from_base == 0 {
            return Ok(Vote::not_squash(
                0.7,
                format!("All {sampled} sampled branch commits are on the base branch"),
                evidence,
            ));
        }

        // A rebase merge also has one parent and originals absent from base;
        // only the message tells the two apart.
        if pattern_count == 0 {
            return Ok(Vote::not_squash(
                0.4,
                "Single parent but no squash indicators in the message",
                evidence,
            ));
        }

        let absent_ratio = if sampled > 0 {
            absent_from_base as f64 / sampled as f64
        } else {
            0.0
        };

        let confidence =
            0.55 + 0.1 * pattern_count.min(MAX_COUNTED_PATTERNS) as f64 + 0.1 * absent_ratio;
        let reasoning = if sampled > 0 {
            format!(
                "Single parent, {pattern_count} squash message indicator(s), \
                 {absent_from_base}/{sampled} branch commits absent from base"
            )
        } else {
            format!("Single parent, {pattern_count} squash message indicator(s)")
        };

        Ok(Vote::squash(confidence, reasoning, evidence))
    }
}
