//! The seven squash detectors.
//!
//! Each detector is a stateless classifier over a `DetectionContext`. A
//! detector returns a `Vote`, or a `DetectionFault` when evidence it depends on
//! could not be gathered. Faults never escape `run_detector`: they become a
//! low-confidence negative verdict carrying the error.

use thiserror::Error;
use tracing::debug;

use super::Algorithm;
use super::context::DetectionContext;
use super::verdict::{DetectionEvidence, DetectionVerdict};

mod author_committer;
mod diff_similarity;
mod host_merge;
mod legacy;
mod timeline;
mod timestamp;
mod tree_structure;

pub use author_committer::AuthorCommitter;
pub use diff_similarity::DiffSimilarity;
pub use host_merge::HostMergeStrategy;
pub use legacy::LegacyHeuristic;
pub use timeline::HostTimeline;
pub use timestamp::TimestampPattern;
pub use tree_structure::TreeStructure;

/// Confidence attached to the negative verdict produced from a fault.
pub const FAULT_CONFIDENCE: f64 = 0.1;

/// A detector's raw opinion, before weighting.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub is_squash: bool,
    pub confidence: f64,
    pub reasoning: String,
    pub evidence: DetectionEvidence,
}

impl Vote {
    pub fn squash(confidence: f64, reasoning: impl Into<String>, evidence: DetectionEvidence) -> Self {
        Self {
            is_squash: true,
            confidence,
            reasoning: reasoning.into(),
            evidence,
        }
    }

    pub fn not_squash(
        confidence: f64,
        reasoning: impl Into<String>,
        evidence: DetectionEvidence,
    ) -> Self {
        Self {
            is_squash: false,
            confidence,
            reasoning: reasoning.into(),
            evidence,
        }
    }
}

/// Why a detector could not produce a vote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionFault {
    #[error("{what} unavailable: {reason}")]
    EvidenceUnavailable { what: &'static str, reason: String },
}

impl DetectionFault {
    pub fn unavailable(what: &'static str, reason: impl Into<String>) -> Self {
        DetectionFault::EvidenceUnavailable {
            what,
            reason: reason.into(),
        }
    }
}

/// A single squash classifier.
pub trait SquashDetector: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault>;
}

/// Runs one detector, capping its confidence and converting faults.
pub fn run_detector(detector: &dyn SquashDetector, ctx: &DetectionContext<'_>) -> DetectionVerdict {
    let algorithm = detector.algorithm();
    let weight = algorithm.weight();

    match detector.detect(ctx) {
        Ok(vote) => {
            let confidence = if vote.confidence.is_nan() {
                0.0
            } else {
                vote.confidence.clamp(0.0, algorithm.max_confidence())
            };
            DetectionVerdict {
                algorithm,
                confidence,
                is_squash: vote.is_squash,
                reasoning: vote.reasoning,
                evidence: vote.evidence,
                weight,
            }
        }
        Err(fault) => {
            debug!(
                algorithm = algorithm.name(),
                pr = %ctx.pr.number,
                error = %fault,
                "Detector fault, recording negative verdict"
            );
            DetectionVerdict {
                algorithm,
                confidence: FAULT_CONFIDENCE,
                is_squash: false,
                reasoning: format!("{} could not run: {}", algorithm.name(), fault),
                evidence: DetectionEvidence::Fault {
                    error: fault.to_string(),
                },
                weight,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::context::GatheredEvidence;
    use crate::test_utils::{make_commit, make_merged_pr, repo};

    struct Overconfident;

    impl SquashDetector for Overconfident {
        fn algorithm(&self) -> Algorithm {
            Algorithm::AuthorCommitter
        }

        fn detect(&self, _ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
            Ok(Vote::squash(
                7.5,
                "certain",
                DetectionEvidence::Fault {
                    error: String::new(),
                },
            ))
        }
    }

    struct Broken;

    impl SquashDetector for Broken {
        fn algorithm(&self) -> Algorithm {
            Algorithm::DiffSimilarity
        }

        fn detect(&self, _ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
            Err(DetectionFault::unavailable("stats", "HTTP 502"))
        }
    }

    #[test]
    fn confidence_is_capped_at_algorithm_maximum() {
        let repo = repo();
        let pr = make_merged_pr(1, vec![make_commit(1, 0, &[])], make_commit(9, 100, &[]));
        let merge = pr.merge_commit.clone().unwrap();
        let ctx = DetectionContext::new(&repo, &pr, &merge, GatheredEvidence::none());

        let verdict = run_detector(&Overconfident, &ctx);
        assert_eq!(verdict.confidence, Algorithm::AuthorCommitter.max_confidence());
        assert_eq!(verdict.weight, Algorithm::AuthorCommitter.weight());
    }

    #[test]
    fn fault_becomes_negative_low_confidence_verdict() {
        let repo = repo();
        let pr = make_merged_pr(1, vec![make_commit(1, 0, &[])], make_commit(9, 100, &[]));
        let merge = pr.merge_commit.clone().unwrap();
        let ctx = DetectionContext::new(&repo, &pr, &merge, GatheredEvidence::none());

        let verdict = run_detector(&Broken, &ctx);
        assert!(!verdict.is_squash);
        assert_eq!(verdict.confidence, FAULT_CONFIDENCE);
        match verdict.evidence {
            DetectionEvidence::Fault { error } => assert!(error.contains("HTTP 502")),
            other => panic!("expected fault evidence, got {other:?}"),
        }
    }
}
