//! Verdict types produced by the detectors and the cross-validator.

use serde::{Deserialize, Serialize};

use crate::types::{Identity, MergeStrategy, Sha};

use super::Algorithm;
use super::patterns::MessagePattern;

/// Structured observations behind a verdict, one variant per algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetectionEvidence {
    HostMergeStrategy {
        parent_count: usize,
        patterns: Vec<MessagePattern>,
        /// Branch commits checked against the base branch.
        sampled: usize,
        /// Of those, how many were not reachable from the base branch.
        absent_from_base: usize,
    },
    TimestampPattern {
        branch_commit_count: usize,
        span_seconds: Option<i64>,
        /// Merge time minus the mean branch-commit time.
        merge_offset_seconds: Option<i64>,
        clustered: bool,
        merge_near_mean: bool,
    },
    AuthorCommitter {
        author: Identity,
        committer: Identity,
        committer_differs: bool,
        author_matches_branch: bool,
    },
    TreeStructure {
        parent_count: usize,
        merge_tree: Option<Sha>,
        tip_tree: Option<Sha>,
    },
    Timeline {
        merged_events: usize,
        merge_strategy: Option<MergeStrategy>,
        force_pushes: usize,
    },
    DiffSimilarity {
        merge_lines: u64,
        branch_lines: u64,
        sampled: usize,
        difference: u64,
    },
    LegacyHeuristic {
        parent_count: usize,
        branch_commit_count: usize,
        pattern_match: bool,
    },
    /// The detector could not run; carries the underlying error.
    Fault { error: String },
}

/// One algorithm's verdict on whether a merge commit is a squash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub algorithm: Algorithm,
    /// Confidence in `is_squash`, in `[0, 1]`.
    pub confidence: f64,
    pub is_squash: bool,
    pub reasoning: String,
    pub evidence: DetectionEvidence,
    /// Relative trust in this algorithm.
    pub weight: f64,
}

/// The cross-validated decision over all verdicts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateVerdict {
    pub is_squash: bool,
    /// Blended confidence, in `[0, 1]`.
    pub confidence: f64,
    pub verdicts: Vec<DetectionVerdict>,
    pub reasoning: String,
    pub squash_votes: usize,
    pub non_squash_votes: usize,
}

impl AggregateVerdict {
    /// The verdict given when there is nothing to combine.
    pub fn empty() -> Self {
        Self {
            is_squash: false,
            confidence: 0.0,
            verdicts: Vec::new(),
            reasoning: "No detection methods were run".to_string(),
            squash_votes: 0,
            non_squash_votes: 0,
        }
    }

    pub fn verdict_for(&self, algorithm: Algorithm) -> Option<&DetectionVerdict> {
        self.verdicts.iter().find(|v| v.algorithm == algorithm)
    }
}
