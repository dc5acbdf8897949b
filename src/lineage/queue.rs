//! Breadth-first work queue of PRs to analyze.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::types::PrNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub pr: PrNumber,
    pub depth: u32,
}

/// Why a PR reference was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueRefusal {
    #[error("{0} was already analyzed")]
    AlreadyVisited(PrNumber),

    #[error("{0} is already queued")]
    AlreadyQueued(PrNumber),

    #[error("work queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },
}

/// Each PR is queued at most once and analyzed at most once.
#[derive(Debug)]
pub struct WorkQueue {
    pending: VecDeque<WorkItem>,
    queued: HashSet<PrNumber>,
    visited: HashSet<PrNumber>,
    max_pending: usize,
}

impl WorkQueue {
    /// Creates a queue holding only the root PR at depth 0.
    pub fn seeded(root: PrNumber, max_pending: usize) -> Self {
        Self {
            pending: VecDeque::from([WorkItem { pr: root, depth: 0 }]),
            queued: HashSet::from([root]),
            visited: HashSet::new(),
            max_pending,
        }
    }

    pub fn try_enqueue(&mut self, pr: PrNumber, depth: u32) -> Result<(), EnqueueRefusal> {
        if self.visited.contains(&pr) {
            return Err(EnqueueRefusal::AlreadyVisited(pr));
        }
        if self.queued.contains(&pr) {
            return Err(EnqueueRefusal::AlreadyQueued(pr));
        }
        if self.pending.len() >= self.max_pending {
            return Err(EnqueueRefusal::QueueFull {
                capacity: self.max_pending,
            });
        }
        self.queued.insert(pr);
        self.pending.push_back(WorkItem { pr, depth });
        Ok(())
    }

    /// Takes the next item and marks its PR visited.
    pub fn pop(&mut self) -> Option<WorkItem> {
        let item = self.pending.pop_front()?;
        self.queued.remove(&item.pr);
        self.visited.insert(item.pr);
        Some(item)
    }

    /// Removes and returns everything still pending.
    pub fn drain(&mut self) -> Vec<WorkItem> {
        self.queued.clear();
        self.pending.drain(..).collect()
    }

    pub fn is_visited(&self, pr: PrNumber) -> bool {
        self.visited.contains(&pr)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
