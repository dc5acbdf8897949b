//! Gateway calls routed through the circuit breaker.

use std::sync::Arc;

use crate::error::LineageError;
use crate::resilience::CircuitBreaker;
use crate::types::{CommitRecord, PrNumber, PullRequestSnapshot, RepoId, Sha};

use super::PrGateway;

/// A gateway whose every call is guarded by a shared breaker and deadline.
#[derive(Debug)]
pub struct GuardedGateway<G> {
    gateway: G,
    breaker: Arc<CircuitBreaker>,
}

impl<G: PrGateway> GuardedGateway<G> {
    pub fn new(gateway: G, breaker: Arc<CircuitBreaker>) -> Self {
        Self { gateway, breaker }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn inner(&self) -> &G {
        &self.gateway
    }

    pub async fn fetch_pull_request(
        &self,
        repo: &RepoId,
        pr: PrNumber,
    ) -> Result<PullRequestSnapshot, LineageError> {
        Ok(self
            .breaker
            .execute(|| self.gateway.fetch_pull_request(repo, pr))
            .await?)
    }

    pub async fn fetch_commit(&self, repo: &RepoId, sha: &Sha) -> Result<CommitRecord, LineageError> {
        Ok(self
            .breaker
            .execute(|| self.gateway.fetch_commit(repo, sha))
            .await?)
    }

    pub async fn is_commit_on_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &Sha,
    ) -> Result<bool, LineageError> {
        Ok(self
            .breaker
            .execute(|| self.gateway.is_commit_on_branch(repo, branch, sha))
            .await?)
    }
}
