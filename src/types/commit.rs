//! Commit snapshots as returned by the hosting service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::Sha;

/// A git identity (author or committer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Identity {
            name: name.into(),
            email: email.into(),
        }
    }

    /// Two identities are the same person if their emails match
    /// case-insensitively, or, when either email is missing, their names match.
    pub fn same_person(&self, other: &Identity) -> bool {
        if !self.email.is_empty() && !other.email.is_empty() {
            return self.email.eq_ignore_ascii_case(&other.email);
        }
        !self.name.is_empty() && self.name == other.name
    }
}

/// Line-change statistics for a single commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub additions: u64,
    pub deletions: u64,
    pub changed_files: u64,
}

impl DiffStats {
    /// Total changed lines (additions + deletions).
    pub fn total_lines(&self) -> u64 {
        self.additions + self.deletions
    }
}

impl std::ops::Add for DiffStats {
    type Output = DiffStats;

    fn add(self, rhs: DiffStats) -> DiffStats {
        DiffStats {
            additions: self.additions + rhs.additions,
            deletions: self.deletions + rhs.deletions,
            changed_files: self.changed_files + rhs.changed_files,
        }
    }
}

/// An immutable snapshot of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub sha: Sha,
    pub author: Identity,
    pub committer: Identity,
    pub message: String,
    pub authored_at: DateTime<Utc>,
    /// When the commit was written. For a squash this is the merge time,
    /// whereas `authored_at` may be inherited from the original work.
    pub committed_at: Option<DateTime<Utc>>,
    pub parents: Vec<Sha>,
    pub tree_sha: Option<Sha>,
    pub stats: Option<DiffStats>,
}

impl CommitRecord {
    /// The timestamp at which the commit landed, falling back to the author date.
    pub fn landed_at(&self) -> DateTime<Utc> {
        self.committed_at.unwrap_or(self.authored_at)
    }
}
