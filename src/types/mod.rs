//! Core domain types for lineage analysis.
//!
//! These are the host-facing snapshots the analysis consumes: identifiers,
//! commits and pull requests. Output types live with the code that builds them
//! (`detection` and `lineage`).

pub mod commit;
pub mod ids;
pub mod pr;

// Re-export commonly used types at the module level
pub use commit::{CommitRecord, DiffStats, Identity};
pub use ids::{InvalidSha, PrNumber, RepoId, Sha};
pub use pr::{MergeStrategy, PullRequestSnapshot, TimelineEvent, TimelineEventKind};
