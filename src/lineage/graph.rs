//! Deduplicating node store.
//!
//! Each commit hash appears at most once. Nodes keep the position of their
//! first insertion, so output order is stable across identical runs.

use std::collections::{BTreeMap, HashMap};

use crate::types::{CommitRecord, PrNumber, Sha};

use super::node::{LineageNode, NodeMetadata, OperationType};

#[derive(Debug, Default)]
pub struct LineageGraph {
    nodes: HashMap<Sha, LineageNode>,
    order: Vec<Sha>,
}

impl LineageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub fn get(&self, sha: &Sha) -> Option<&LineageNode> {
        self.nodes.get(sha)
    }

    pub fn get_mut(&mut self, sha: &Sha) -> Option<&mut LineageNode> {
        self.nodes.get_mut(sha)
    }

    /// Adds a plain commit unless the hash is already present.
    pub fn insert_commit(&mut self, commit: &CommitRecord, branch: &str, pr: Option<PrNumber>, depth: u32) {
        let node = LineageNode::from_commit(commit, branch, OperationType::Commit).with_metadata(NodeMetadata {
            pr,
            depth,
            ..NodeMetadata::default()
        });
        self.upsert(node);
    }

    /// Inserts `node`, or merges it into the existing node with the same hash.
    ///
    /// A classified node replaces the operation type and branch of an existing
    /// one, extends its parents, and overlays its metadata. A plain commit
    /// never downgrades an existing node.
    pub fn upsert(&mut self, node: LineageNode) {
        let Some(existing) = self.nodes.get_mut(&node.sha) else {
            self.order.push(node.sha.clone());
            self.nodes.insert(node.sha.clone(), node);
            return;
        };
        if node.operation_type.is_plain() {
            return;
        }

        existing.operation_type = node.operation_type;
        existing.branch = node.branch;
        for parent in node.parents {
            if !existing.parents.contains(&parent) {
                existing.parents.push(parent);
            }
        }
        existing.metadata.absorb(node.metadata);
    }

    /// Nodes in first-insertion order.
    pub fn into_nodes(mut self) -> Vec<LineageNode> {
        self.order
            .iter()
            .filter_map(|sha| self.nodes.remove(sha))
            .collect()
    }

    /// Node counts per operation type, omitting zero counts.
    pub fn breakdown(&self) -> BTreeMap<OperationType, usize> {
        let mut counts = BTreeMap::new();
        for node in self.nodes.values() {
            *counts.entry(node.operation_type).or_insert(0) += 1;
        }
        counts
    }
}
