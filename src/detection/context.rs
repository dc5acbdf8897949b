//! Inputs shared by all detectors.

use crate::types::{CommitRecord, PullRequestSnapshot, RepoId, Sha};

/// A piece of evidence that may have required an extra fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gathered<T> {
    /// No enabled algorithm needed it.
    NotRequested,
    Available(T),
    /// The fetch failed; the string is the error message.
    Failed(String),
}

impl<T> Gathered<T> {
    pub fn available(&self) -> Option<&T> {
        match self {
            Gathered::Available(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Gathered::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Whether one branch commit is reachable from the PR's base branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMembership {
    pub sha: Sha,
    pub on_base: bool,
}

/// Extra evidence fetched beyond the PR snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatheredEvidence {
    /// The merge commit with its tree and stats filled in.
    pub merge_details: Gathered<CommitRecord>,
    /// The newest branch commits with tree and stats, oldest first.
    pub branch_details: Gathered<Vec<CommitRecord>>,
    pub base_membership: Gathered<Vec<BaseMembership>>,
}

impl GatheredEvidence {
    pub fn none() -> Self {
        Self {
            merge_details: Gathered::NotRequested,
            branch_details: Gathered::NotRequested,
            base_membership: Gathered::NotRequested,
        }
    }
}

impl Default for GatheredEvidence {
    fn default() -> Self {
        Self::none()
    }
}

/// Everything a detector may look at.
#[derive(Debug, Clone)]
pub struct DetectionContext<'a> {
    pub repo: &'a RepoId,
    pub pr: &'a PullRequestSnapshot,
    pub merge_commit: &'a CommitRecord,
    pub evidence: GatheredEvidence,
}

impl<'a> DetectionContext<'a> {
    pub fn new(
        repo: &'a RepoId,
        pr: &'a PullRequestSnapshot,
        merge_commit: &'a CommitRecord,
        evidence: GatheredEvidence,
    ) -> Self {
        Self {
            repo,
            pr,
            merge_commit,
            evidence,
        }
    }

    pub fn branch_commits(&self) -> &'a [CommitRecord] {
        &self.pr.branch_commits
    }

    /// The merge commit, preferring the fetched version with details.
    pub fn detailed_merge_commit(&self) -> &CommitRecord {
        self.evidence
            .merge_details
            .available()
            .unwrap_or(self.merge_commit)
    }

    /// The branch tip, preferring the fetched version with details.
    pub fn detailed_branch_tip(&self) -> Option<&CommitRecord> {
        self.evidence
            .branch_details
            .available()
            .and_then(|commits| commits.last())
            .or_else(|| self.pr.branch_tip())
    }
}
