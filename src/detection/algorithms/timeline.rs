//! Host events timeline: the hosting service may say outright how the PR was
//! merged.

use crate::detection::Algorithm;
use crate::detection::context::DetectionContext;
use crate::detection::verdict::DetectionEvidence;
use crate::types::{MergeStrategy, TimelineEventKind};

use super::{DetectionFault, SquashDetector, Vote};

pub struct HostTimeline;

impl SquashDetector for HostTimeline {
    fn algorithm(&self) -> Algorithm {
        Algorithm::HostTimeline
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
        let merged: Vec<_> = ctx
            .pr
            .timeline
            .iter()
            .filter(|e| e.kind == TimelineEventKind::Merged)
            .collect();
        let merge_strategy = merged.iter().find_map(|e| e.merge_strategy);
        let force_pushes = ctx.pr.force_push_count();

        let evidence = DetectionEvidence::Timeline {
            merged_events: merged.len(),
            merge_strategy,
            force_pushes,
        };

        let vote = match merge_strategy {
            Some(MergeStrategy::Squash) => {
                Vote::squash(0.95, "Timeline merged event reports a squash merge", evidence)
            }
            Some(other) => Vote::not_squash(
                0.9,
                format!("Timeline merged event reports a {other:?} merge"),
                evidence,
            ),
            None if !merged.is_empty() => Vote::not_squash(
                0.3,
                "Merged event carries no merge strategy",
                evidence,
            ),
            None => Vote::not_squash(0.1, "No merged event in the timeline", evidence),
        };
        Ok(vote)
    }
}
