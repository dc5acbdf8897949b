//! Shared test fixtures, an in-memory gateway, and proptest generators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;

use crate::detection::{Algorithm, DetectionEvidence, DetectionVerdict};
use crate::gateway::{GatewayError, GatewayErrorKind, GuardedGateway, PrGateway};
use crate::resilience::CircuitBreaker;
use crate::types::{CommitRecord, Identity, PrNumber, PullRequestSnapshot, RepoId, Sha};

/// Offset separating a fixture commit's tree hash from its commit hash.
const TREE_OFFSET: u64 = 1_000_000;

// ─── Fixtures ─────────────────────────────────────────────────────────────────

pub fn repo() -> RepoId {
    RepoId::new("acme", "widgets")
}

pub fn make_sha(n: u64) -> Sha {
    Sha::parse(format!("{:0>40x}", n)).unwrap()
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn alice() -> Identity {
    Identity::new("Alice", "alice@example.com")
}

pub fn host_identity() -> Identity {
    Identity::new("GitHub", "noreply@github.com")
}

/// A commit by Alice at `base_time() + offset_secs`.
pub fn make_commit(n: u64, offset_secs: i64, parents: &[u64]) -> CommitRecord {
    CommitRecord {
        sha: make_sha(n),
        author: alice(),
        committer: alice(),
        message: format!("commit {n}"),
        authored_at: base_time() + chrono::Duration::seconds(offset_secs),
        committed_at: None,
        parents: parents.iter().map(|&p| make_sha(p)).collect(),
        tree_sha: Some(make_sha(n + TREE_OFFSET)),
        stats: None,
    }
}

/// A host-made squash of `branch` onto `base_parent`, landing one minute
/// after the newest branch commit.
pub fn squash_commit(n: u64, branch: &[CommitRecord], base_parent: u64, message: &str) -> CommitRecord {
    let authored_at = branch.last().map_or_else(base_time, |c| c.authored_at);
    CommitRecord {
        sha: make_sha(n),
        author: branch.first().map_or_else(alice, |c| c.author.clone()),
        committer: host_identity(),
        message: message.to_string(),
        authored_at,
        committed_at: Some(authored_at + chrono::Duration::seconds(60)),
        parents: vec![make_sha(base_parent)],
        tree_sha: Some(make_sha(n + TREE_OFFSET)),
        stats: None,
    }
}

pub fn make_merged_pr(number: u64, branch: Vec<CommitRecord>, merge: CommitRecord) -> PullRequestSnapshot {
    PullRequestSnapshot {
        number: PrNumber(number),
        head_ref: format!("feature-{number}"),
        base_ref: "main".to_string(),
        merged: true,
        merge_commit_sha: Some(merge.sha.clone()),
        branch_commits: branch,
        merge_commit: Some(merge),
        timeline: Vec::new(),
        base_commit: None,
    }
}

pub fn make_open_pr(number: u64, branch: Vec<CommitRecord>) -> PullRequestSnapshot {
    PullRequestSnapshot {
        merged: false,
        merge_commit_sha: None,
        merge_commit: None,
        ..make_merged_pr(number, branch, make_commit(0, 0, &[]))
    }
}

pub fn verdict(algorithm: Algorithm, is_squash: bool, confidence: f64) -> DetectionVerdict {
    DetectionVerdict {
        algorithm,
        confidence,
        is_squash,
        reasoning: format!("{algorithm} test verdict"),
        evidence: DetectionEvidence::Fault {
            error: "synthetic".to_string(),
        },
        weight: algorithm.weight(),
    }
}

// ─── Mock Gateway ─────────────────────────────────────────────────────────────

/// An in-memory `PrGateway` with error injection and call counters.
///
/// `fetch_commit` only answers for commits registered with `with_commit`;
/// everything else is NotFound.
#[derive(Debug, Default)]
pub struct MockGateway {
    prs: HashMap<PrNumber, PullRequestSnapshot>,
    pr_errors: HashMap<PrNumber, GatewayErrorKind>,
    delays: HashMap<PrNumber, Duration>,
    commits: HashMap<Sha, CommitRecord>,
    on_base: HashSet<Sha>,
    membership_error: Option<GatewayErrorKind>,
    pr_fetches: Mutex<Vec<PrNumber>>,
    commit_fetches: AtomicUsize,
    membership_checks: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pr(mut self, pr: PullRequestSnapshot) -> Self {
        self.prs.insert(pr.number, pr);
        self
    }

    pub fn with_pr_error(mut self, pr: u64, kind: GatewayErrorKind) -> Self {
        self.pr_errors.insert(PrNumber(pr), kind);
        self
    }

    /// Makes fetches of `pr` sleep before answering.
    pub fn with_delay(mut self, pr: u64, delay: Duration) -> Self {
        self.delays.insert(PrNumber(pr), delay);
        self
    }

    pub fn with_commit(mut self, commit: CommitRecord) -> Self {
        self.commits.insert(commit.sha.clone(), commit);
        self
    }

    pub fn with_on_base(mut self, sha: Sha) -> Self {
        self.on_base.insert(sha);
        self
    }

    pub fn with_membership_error(mut self, kind: GatewayErrorKind) -> Self {
        self.membership_error = Some(kind);
        self
    }

    /// Every PR fetch, in call order.
    pub fn pr_fetches(&self) -> Vec<PrNumber> {
        self.pr_fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self, pr: u64) -> usize {
        self.pr_fetches()
            .iter()
            .filter(|&&p| p == PrNumber(pr))
            .count()
    }

    pub fn commit_fetches(&self) -> usize {
        self.commit_fetches.load(Ordering::SeqCst)
    }

    pub fn membership_checks(&self) -> usize {
        self.membership_checks.load(Ordering::SeqCst)
    }
}

impl PrGateway for MockGateway {
    async fn fetch_pull_request(
        &self,
        _repo: &RepoId,
        pr: PrNumber,
    ) -> Result<PullRequestSnapshot, GatewayError> {
        self.pr_fetches.lock().unwrap().push(pr);
        if let Some(delay) = self.delays.get(&pr) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(kind) = self.pr_errors.get(&pr) {
            return Err(GatewayError::new(*kind, format!("PR {pr}")));
        }
        self.prs
            .get(&pr)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("PR {pr}")))
    }

    async fn fetch_commit(&self, _repo: &RepoId, sha: &Sha) -> Result<CommitRecord, GatewayError> {
        self.commit_fetches.fetch_add(1, Ordering::SeqCst);
        self.commits
            .get(sha)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(format!("commit {}", sha.short())))
    }

    async fn is_commit_on_branch(
        &self,
        _repo: &RepoId,
        _branch: &str,
        sha: &Sha,
    ) -> Result<bool, GatewayError> {
        self.membership_checks.fetch_add(1, Ordering::SeqCst);
        match self.membership_error {
            Some(kind) => Err(GatewayError::new(kind, "membership check")),
            None => Ok(self.on_base.contains(sha)),
        }
    }
}

/// Wraps `gateway` with a fresh default breaker.
pub fn guarded<G: PrGateway>(gateway: G) -> GuardedGateway<G> {
    GuardedGateway::new(gateway, Arc::new(CircuitBreaker::default()))
}

// ─── Generators ───────────────────────────────────────────────────────────────

pub fn arb_pr_number() -> impl Strategy<Value = PrNumber> {
    (1u64..100_000).prop_map(PrNumber)
}

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

pub fn arb_algorithm() -> impl Strategy<Value = Algorithm> {
    prop::sample::select(Algorithm::ALL.to_vec())
}

pub fn arb_verdict() -> impl Strategy<Value = DetectionVerdict> {
    (arb_algorithm(), any::<bool>(), 0.0f64..=1.0)
        .prop_map(|(algorithm, is_squash, confidence)| verdict(algorithm, is_squash, confidence))
}
