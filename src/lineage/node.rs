//! Nodes of the reconstructed lineage graph.

use std::fmt;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::detection::DetectionVerdict;
use crate::types::{CommitRecord, PrNumber, Sha};

/// How a commit came to exist in history.
///
/// The declaration order is the order used in summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OperationType {
    #[serde(rename = "Commit")]
    Commit,
    #[serde(rename = "Merge Commit")]
    MergeCommit,
    #[serde(rename = "Squash")]
    Squash,
    /// A branch commit folded into a squash, shown without recursion.
    #[serde(rename = "Squashed Commit")]
    SquashedCommit,
    /// A branch commit folded into a squash, shown with recursion.
    #[serde(rename = "Expanded Commit")]
    ExpandedCommit,
    #[serde(rename = "Fast-Forward")]
    FastForward,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl OperationType {
    pub fn label(&self) -> &'static str {
        match self {
            OperationType::Commit => "Commit",
            OperationType::MergeCommit => "Merge Commit",
            OperationType::Squash => "Squash",
            OperationType::SquashedCommit => "Squashed Commit",
            OperationType::ExpandedCommit => "Expanded Commit",
            OperationType::FastForward => "Fast-Forward",
            OperationType::Unknown => "Unknown",
        }
    }

    /// Plain branch commits never overwrite a classification.
    pub fn is_plain(&self) -> bool {
        matches!(self, OperationType::Commit)
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Annotations attached to a node by classification and expansion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// The PR whose analysis produced this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr: Option<PrNumber>,

    /// Nesting depth of that PR; the root PR is depth 0.
    pub depth: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub verdicts: Vec<DetectionVerdict>,

    /// Head branch a squash was made from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squashed_from: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_commit_count: Option<usize>,

    /// For squashed and expanded commits, the squash they were folded into.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squash_sha: Option<Sha>,

    /// PR referenced by this commit's message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested_pr: Option<PrNumber>,

    /// Why `nested_pr` was not (or could not be) expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expansion_error: Option<String>,

    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub max_depth_reached: bool,
}

impl NodeMetadata {
    /// Overlays `newer` onto `self`; fields `newer` leaves empty are kept.
    pub fn absorb(&mut self, newer: NodeMetadata) {
        fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }
        overlay(&mut self.pr, newer.pr);
        self.depth = newer.depth;
        overlay(&mut self.confidence, newer.confidence);
        overlay(&mut self.reasoning, newer.reasoning);
        if !newer.verdicts.is_empty() {
            self.verdicts = newer.verdicts;
        }
        overlay(&mut self.squashed_from, newer.squashed_from);
        overlay(&mut self.original_commit_count, newer.original_commit_count);
        overlay(&mut self.squash_sha, newer.squash_sha);
        overlay(&mut self.nested_pr, newer.nested_pr);
        overlay(&mut self.expansion_error, newer.expansion_error);
        self.max_depth_reached |= newer.max_depth_reached;
    }
}

/// One commit in the lineage graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageNode {
    pub sha: Sha,
    pub short_sha: String,
    pub message: String,
    pub author: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub parents: Vec<Sha>,
    pub branch: String,
    pub operation_type: OperationType,
    pub metadata: NodeMetadata,
}

impl LineageNode {
    pub fn from_commit(commit: &CommitRecord, branch: &str, operation_type: OperationType) -> Self {
        let author = if commit.author.name.is_empty() {
            commit.author.email.clone()
        } else {
            commit.author.name.clone()
        };
        Self {
            sha: commit.sha.clone(),
            short_sha: commit.sha.short().to_string(),
            message: commit.message.clone(),
            author,
            timestamp: commit
                .landed_at()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            parents: commit.parents.clone(),
            branch: branch.to_string(),
            operation_type,
            metadata: NodeMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}
