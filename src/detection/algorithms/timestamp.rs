//! Timestamp clustering: squashed branches tend to be a burst of commits
//! followed promptly by the merge.

use crate::detection::Algorithm;
use crate::detection::context::DetectionContext;
use crate::detection::verdict::DetectionEvidence;

use super::{DetectionFault, SquashDetector, Vote};

/// Branch commits must all fall within this many seconds of one another.
const CLUSTER_WINDOW_SECS: i64 = 60;

/// The merge must land within this many seconds of the branch mean.
const MERGE_PROXIMITY_SECS: i64 = 5 * 60;

pub struct TimestampPattern;

impl SquashDetector for TimestampPattern {
    fn algorithm(&self) -> Algorithm {
        Algorithm::TimestampPattern
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
        let branch = ctx.branch_commits();
        let branch_commit_count = branch.len();

        if branch_commit_count < 2 {
            return Ok(Vote::not_squash(
                0.3,
                format!("{branch_commit_count} branch commit(s); need at least two to cluster"),
                DetectionEvidence::TimestampPattern {
                    branch_commit_count,
                    span_seconds: None,
                    merge_offset_seconds: None,
                    clustered: false,
                    merge_near_mean: false,
                },
            ));
        }

        let millis: Vec<i64> = branch
            .iter()
            .map(|c| c.authored_at.timestamp_millis())
            .collect();
        let (min, max) = millis
            .iter()
            .fold((i64::MAX, i64::MIN), |(lo, hi), &t| (lo.min(t), hi.max(t)));
        let span_seconds = (max - min) / 1000;

        let sum: i128 = millis.iter().map(|&t| i128::from(t)).sum();
        let mean_millis = (sum / millis.len() as i128) as i64;
        let merge_millis = ctx.merge_commit.landed_at().timestamp_millis();
        let merge_offset_seconds = (merge_millis - mean_millis) / 1000;

        let clustered = span_seconds <= CLUSTER_WINDOW_SECS;
        let merge_near_mean = merge_offset_seconds.abs() <= MERGE_PROXIMITY_SECS;

        let evidence = DetectionEvidence::TimestampPattern {
            branch_commit_count,
            span_seconds: Some(span_seconds),
            merge_offset_seconds: Some(merge_offset_seconds),
            clustered,
            merge_near_mean,
        };

        match (clustered, merge_near_mean) {
            (true, true) => {
                let tightness = 1.0 - span_seconds as f64 / CLUSTER_WINDOW_SECS as f64;
                Ok(Vote::squash(
                    0.5 + 0.2 * tightness,
                    format!(
                        "{branch_commit_count} commits within {span_seconds}s, merged \
                         {merge_offset_seconds}s from their mean"
                    ),
                    evidence,
                ))
            }
            (false, false) => Ok(Vote::not_squash(
                0.6,
                format!(
                    "Commits spread over {span_seconds}s and merge {merge_offset_seconds}s from their mean"
                ),
                evidence,
            )),
            _ => Ok(Vote::not_squash(
                0.4,
                "Only one of clustering and merge proximity holds",
                evidence,
            )),
        }
    }
}
