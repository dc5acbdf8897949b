//! Pull request snapshots and timeline events.
//!
//! A `PullRequestSnapshot` is everything the analysis needs to know about one
//! PR, fetched once per visit and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::commit::CommitRecord;
use super::ids::{PrNumber, Sha};

/// The merge strategy the hosting service reports for a merge event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    Squash,
    Merge,
    Rebase,
}

impl MergeStrategy {
    /// Parses a strategy tag, case-insensitively. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "squash" => Some(MergeStrategy::Squash),
            "merge" => Some(MergeStrategy::Merge),
            "rebase" => Some(MergeStrategy::Rebase),
            _ => None,
        }
    }
}

/// The kind of a PR timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    ForcePushed,
    BaseChanged,
    Committed,
    Merged,
    Closed,
    Other,
}

impl TimelineEventKind {
    /// Maps a GitHub timeline `event` name onto our kinds.
    pub fn from_event_name(name: &str) -> Self {
        match name {
            "head_ref_force_pushed" | "base_ref_force_pushed" => TimelineEventKind::ForcePushed,
            "base_ref_changed" => TimelineEventKind::BaseChanged,
            "committed" => TimelineEventKind::Committed,
            "merged" => TimelineEventKind::Merged,
            "closed" => TimelineEventKind::Closed,
            _ => TimelineEventKind::Other,
        }
    }
}

/// One entry of a PR's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub kind: TimelineEventKind,
    pub timestamp: Option<DateTime<Utc>>,
    pub actor: Option<String>,
    pub merge_strategy: Option<MergeStrategy>,
}

/// Everything known about a single pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestSnapshot {
    pub number: PrNumber,
    pub head_ref: String,
    pub base_ref: String,
    pub merged: bool,
    pub merge_commit_sha: Option<Sha>,
    /// Branch commits in the order the host lists them (oldest first).
    pub branch_commits: Vec<CommitRecord>,
    pub merge_commit: Option<CommitRecord>,
    pub timeline: Vec<TimelineEvent>,
    pub base_commit: Option<CommitRecord>,
}

impl PullRequestSnapshot {
    /// The newest commit on the PR branch.
    pub fn branch_tip(&self) -> Option<&CommitRecord> {
        self.branch_commits.last()
    }

    /// Returns true if `sha` is one of the PR's own branch commits.
    pub fn contains_branch_commit(&self, sha: &Sha) -> bool {
        self.branch_commits.iter().any(|c| &c.sha == sha)
    }

    /// Number of force-push events recorded on the timeline.
    pub fn force_push_count(&self) -> usize {
        self.timeline
            .iter()
            .filter(|e| e.kind == TimelineEventKind::ForcePushed)
            .count()
    }
}
