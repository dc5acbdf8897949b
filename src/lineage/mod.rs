//! Lineage reconstruction.
//!
//! `LineageEngine::analyze` walks a PR, classifies its merge commit, expands
//! squashes back into the commits they replaced, and, under deep expansion,
//! follows the PRs those commits reference.

mod engine;
mod expansion;
mod graph;
mod node;
mod queue;

pub use engine::{LineageEngine, LineageReport, SkippedPr};
pub use expansion::{Expansion, expand_squash};
pub use graph::LineageGraph;
pub use node::{LineageNode, NodeMetadata, OperationType};
pub use queue::{EnqueueRefusal, WorkItem, WorkQueue};
