//! Diff similarity: a squash carries the sum of its branch commits' changes.

use crate::detection::Algorithm;
use crate::detection::context::{DetectionContext, Gathered};
use crate::detection::verdict::DetectionEvidence;
use crate::types::{CommitRecord, DiffStats};

use super::{DetectionFault, SquashDetector, Vote};

const TOLERANCE_RATIO: f64 = 0.10;
const TOLERANCE_LINES: u64 = 10;

pub struct DiffSimilarity;

impl SquashDetector for DiffSimilarity {
    fn algorithm(&self) -> Algorithm {
        Algorithm::DiffSimilarity
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
        let merge_stats = ctx.detailed_merge_commit().stats.ok_or_else(|| {
            DetectionFault::unavailable(
                "merge commit stats",
                ctx.evidence
                    .merge_details
                    .error()
                    .unwrap_or("host reported no stats"),
            )
        })?;

        let sample: &[CommitRecord] = match &ctx.evidence.branch_details {
            Gathered::Available(commits) => commits,
            Gathered::Failed(reason) => {
                return Err(DetectionFault::unavailable("branch commit stats", reason.clone()));
            }
            Gathered::NotRequested => ctx.branch_commits(),
        };

        if sample.is_empty() {
            return Ok(Vote::not_squash(
                0.2,
                "No branch commits to compare",
                DetectionEvidence::DiffSimilarity {
                    merge_lines: merge_stats.total_lines(),
                    branch_lines: 0,
                    sampled: 0,
                    difference: merge_stats.total_lines(),
                },
            ));
        }

        let branch_stats = sample
            .iter()
            .map(|c| c.stats)
            .collect::<Option<Vec<DiffStats>>>()
            .ok_or_else(|| {
                DetectionFault::unavailable("branch commit stats", "some commits have no stats")
            })?
            .into_iter()
            .fold(DiffStats::default(), |acc, s| acc + s);

        let merge_lines = merge_stats.total_lines();
        let branch_lines = branch_stats.total_lines();
        let difference = merge_lines.abs_diff(branch_lines);
        let scale = merge_lines.max(branch_lines) as f64;
        let similar = difference <= TOLERANCE_LINES || difference as f64 <= TOLERANCE_RATIO * scale;

        let evidence = DetectionEvidence::DiffSimilarity {
            merge_lines,
            branch_lines,
            sampled: sample.len(),
            difference,
        };

        if similar {
            Ok(Vote::squash(
                0.6,
                format!(
                    "Merge changes {merge_lines} lines; {} branch commits change {branch_lines}",
                    sample.len()
                ),
                evidence,
            ))
        } else {
            Ok(Vote::not_squash(
                0.4,
                format!("Merge and branch line counts differ by {difference}"),
                evidence,
            ))
        }
    }
}
