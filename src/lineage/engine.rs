//! The lineage analysis loop.
//!
//! ```text
//!   queue ──► fetch PR ──► insert branch/base commits
//!     ▲                      │
//!     │                      ▼
//!     │            gather evidence ──► classify merge commit
//!     │                                   │
//!     └──── nested PRs ◄── expand squash ◄┘
//! ```
//!
//! Bounds: at most `max_iterations` queue items per call, at most
//! `max_pending` PRs waiting, nesting depth at most `max_depth`. Every PR is
//! analyzed at most once per call, which also breaks reference cycles.
//!
//! A failure fetching the root PR fails the call. A failure fetching a nested
//! PR is recorded on the commit that referenced it and the walk continues,
//! unless the error kind is fatal (credentials, rate limits).

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::AnalysisConfig;
use crate::detection::{AggregateVerdict, DetectionContext, classify, gather_evidence};
use crate::error::LineageError;
use crate::gateway::{GuardedGateway, PrGateway};
use crate::resilience::CircuitBreaker;
use crate::types::{CommitRecord, PrNumber, PullRequestSnapshot, RepoId, Sha};

use super::expansion::{Expansion, expand_squash};
use super::graph::LineageGraph;
use super::node::{LineageNode, NodeMetadata, OperationType};
use super::queue::{WorkItem, WorkQueue};

/// A nested PR that was referenced but not analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPr {
    pub pr: PrNumber,
    pub depth: u32,
    pub reason: String,
}

/// The result of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineageReport {
    pub summary: String,
    /// Unique by hash, in discovery order.
    pub nodes: Vec<LineageNode>,
    /// PRs analyzed, in analysis order.
    pub analyzed_prs: Vec<PrNumber>,
    pub max_depth_reached: bool,
    pub iteration_cap_reached: bool,
    pub skipped: Vec<SkippedPr>,
}

pub struct LineageEngine<G> {
    gateway: GuardedGateway<G>,
}

impl<G: PrGateway> LineageEngine<G> {
    pub fn new(gateway: G, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            gateway: GuardedGateway::new(gateway, breaker),
        }
    }

    pub fn gateway(&self) -> &GuardedGateway<G> {
        &self.gateway
    }

    /// Reconstructs the lineage of `pr` and, under deep expansion, of the PRs
    /// its squashed commits reference.
    #[instrument(skip(self, config), fields(repo = %repo, pr = %pr))]
    pub async fn analyze(
        &self,
        repo: &RepoId,
        pr: PrNumber,
        config: &AnalysisConfig,
    ) -> Result<LineageReport, LineageError> {
        let limits = config.limits;
        let mut graph = LineageGraph::new();
        let mut queue = WorkQueue::seeded(pr, limits.max_pending);
        let mut referrers: HashMap<PrNumber, Sha> = HashMap::new();
        let mut analyzed_prs = Vec::new();
        let mut skipped = Vec::new();
        let mut max_depth_reached = false;
        let mut iteration_cap_reached = false;

        while let Some(item) = queue.pop() {
            if analyzed_prs.len() + skipped.len() >= limits.max_iterations {
                warn!(limit = limits.max_iterations, "Iteration cap reached");
                iteration_cap_reached = true;
                for pending in std::iter::once(item).chain(queue.drain()) {
                    record_skip(&mut graph, &referrers, &mut skipped, pending, "iteration cap reached".to_string());
                }
                break;
            }

            let snapshot = match self.gateway.fetch_pull_request(repo, item.pr).await {
                Ok(snapshot) => snapshot,
                Err(e) if item.depth == 0 || e.kind().is_fatal() => return Err(e),
                Err(e) => {
                    warn!(nested = %item.pr, depth = item.depth, error = %e, "Skipping nested PR");
                    record_skip(&mut graph, &referrers, &mut skipped, item, e.to_string());
                    continue;
                }
            };

            analyzed_prs.push(item.pr);
            let outcome = self
                .analyze_pull_request(repo, &snapshot, item.depth, config, &mut graph, &mut queue)
                .await?;
            max_depth_reached |= outcome.max_depth_reached;
            referrers.extend(outcome.queued);
        }

        let summary = summarize(&graph, &analyzed_prs, max_depth_reached, iteration_cap_reached, &skipped);
        info!(
            prs = analyzed_prs.len(),
            nodes = graph.len(),
            skipped = skipped.len(),
            "Lineage analysis complete"
        );

        Ok(LineageReport {
            summary,
            nodes: graph.into_nodes(),
            analyzed_prs,
            max_depth_reached,
            iteration_cap_reached,
            skipped,
        })
    }

    /// Classifies one PR's merge commit and adds its nodes to `graph`.
    async fn analyze_pull_request(
        &self,
        repo: &RepoId,
        pr: &PullRequestSnapshot,
        depth: u32,
        config: &AnalysisConfig,
        graph: &mut LineageGraph,
        queue: &mut WorkQueue,
    ) -> Result<Expansion, LineageError> {
        for commit in &pr.branch_commits {
            graph.insert_commit(commit, &pr.head_ref, Some(pr.number), depth);
        }
        if let Some(base) = &pr.base_commit {
            graph.insert_commit(base, &pr.base_ref, None, depth);
        }

        let merge = match (&pr.merge_commit, pr.merged) {
            (Some(merge), true) => merge,
            _ => {
                debug!(pr = %pr.number, "PR has no merge commit, nothing to classify");
                return Ok(Expansion::default());
            }
        };

        let evidence = gather_evidence(&self.gateway, repo, pr, merge, config).await?;
        let ctx = DetectionContext::new(repo, pr, merge, evidence);
        let aggregate = classify(&ctx, config);
        let operation_type = operation_type_for(pr, merge, &aggregate);

        debug!(
            pr = %pr.number,
            merge = %merge.sha.short(),
            operation = %operation_type,
            confidence = aggregate.confidence,
            "Classified merge commit"
        );

        let mut node = LineageNode::from_commit(merge, &pr.base_ref, operation_type);
        node.parents = corrected_parents(pr, merge);
        node.metadata = NodeMetadata {
            pr: Some(pr.number),
            depth,
            confidence: Some(aggregate.confidence),
            reasoning: Some(aggregate.reasoning.clone()),
            verdicts: aggregate.verdicts.clone(),
            squashed_from: aggregate.is_squash.then(|| pr.head_ref.clone()),
            original_commit_count: aggregate.is_squash.then_some(pr.branch_commits.len()),
            ..NodeMetadata::default()
        };
        graph.upsert(node);

        if !aggregate.is_squash {
            return Ok(Expansion::default());
        }
        let expansion = expand_squash(pr, &merge.sha, &aggregate, depth, config, queue);
        for node in expansion.nodes.iter().cloned() {
            graph.upsert(node);
        }
        Ok(expansion)
    }
}

fn operation_type_for(pr: &PullRequestSnapshot, merge: &CommitRecord, aggregate: &AggregateVerdict) -> OperationType {
    if aggregate.is_squash {
        OperationType::Squash
    } else if merge.parents.len() > 1 {
        OperationType::MergeCommit
    } else if pr.contains_branch_commit(&merge.sha) {
        OperationType::FastForward
    } else {
        OperationType::Unknown
    }
}

/// The merge commit's parents, with the branch tip appended when the host
/// dropped it. A squash thereby links back to the history it replaced.
fn corrected_parents(pr: &PullRequestSnapshot, merge: &CommitRecord) -> Vec<Sha> {
    let mut parents = merge.parents.clone();
    if let Some(tip) = pr.branch_tip() {
        if tip.sha != merge.sha && !parents.contains(&tip.sha) {
            parents.push(tip.sha.clone());
        }
    }
    parents
}

fn record_skip(
    graph: &mut LineageGraph,
    referrers: &HashMap<PrNumber, Sha>,
    skipped: &mut Vec<SkippedPr>,
    item: WorkItem,
    reason: String,
) {
    if let Some(node) = referrers.get(&item.pr).and_then(|sha| graph.get_mut(sha)) {
        node.metadata.expansion_error = Some(reason.clone());
    }
    skipped.push(SkippedPr {
        pr: item.pr,
        depth: item.depth,
        reason,
    });
}

fn summarize(
    graph: &LineageGraph,
    analyzed: &[PrNumber],
    max_depth_reached: bool,
    iteration_cap_reached: bool,
    skipped: &[SkippedPr],
) -> String {
    let prs = analyzed
        .iter()
        .map(|pr| pr.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let breakdown = graph
        .breakdown()
        .iter()
        .map(|(op, count)| format!("{op}: {count}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut summary = format!(
        "Analyzed {} PR(s) ({prs}); {} unique commit(s): {breakdown}",
        analyzed.len(),
        graph.len()
    );
    if !skipped.is_empty() {
        summary.push_str(&format!("; {} nested PR(s) skipped", skipped.len()));
    }
    if max_depth_reached {
        summary.push_str("; max depth reached");
    }
    if iteration_cap_reached {
        summary.push_str("; iteration cap reached");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use crate::config::{DepthPolicy, Limits, Preset};
    use crate::error::ErrorKind;
    use crate::gateway::GatewayErrorKind;
    use crate::test_utils::{MockGateway, make_commit, make_merged_pr, make_open_pr, make_sha, repo, squash_commit};

    /// A squash-merged PR with `messages.len()` branch commits. Commit
    /// hashes are `number * 100 + i`, the squash is `number * 100 + 99`.
    fn squashed_pr(number: u64, messages: &[&str]) -> PullRequestSnapshot {
        let base = number * 100;
        let branch: Vec<_> = messages
            .iter()
            .enumerate()
            .map(|(i, msg)| {
                let n = base + i as u64 + 1;
                let mut c = make_commit(n, i as i64 * 3, &[n - 1]);
                c.message = msg.to_string();
                c
            })
            .collect();
        let merge = squash_commit(base + 99, &branch, base, &format!("feat: pr {number} (#{number})"));
        make_merged_pr(number, branch, merge)
    }

    fn engine(mock: MockGateway) -> LineageEngine<MockGateway> {
        LineageEngine::new(mock, Arc::new(CircuitBreaker::default()))
    }

    fn deep() -> AnalysisConfig {
        AnalysisConfig::preset(Preset::Performance).with_depth_policy(DepthPolicy::Deep)
    }

    fn count(report: &LineageReport, op: OperationType) -> usize {
        report.nodes.iter().filter(|n| n.operation_type == op).count()
    }

    #[tokio::test]
    async fn shallow_squash_expansion() {
        let pr = squashed_pr(10, &["a", "b", "c", "d"]);
        let engine = engine(MockGateway::new().with_pr(pr));

        let report = engine
            .analyze(&repo(), PrNumber(10), &AnalysisConfig::preset(Preset::Performance))
            .await
            .unwrap();

        assert_eq!(count(&report, OperationType::Squash), 1);
        assert_eq!(count(&report, OperationType::SquashedCommit), 4);
        assert_eq!(report.analyzed_prs, vec![PrNumber(10)]);
        assert!(report.summary.contains("Squashed Commit: 4"), "{}", report.summary);
    }

    #[tokio::test]
    async fn deep_expansion_without_references() {
        let pr = squashed_pr(10, &["a", "b", "c", "d"]);
        let engine = engine(MockGateway::new().with_pr(pr));

        let report = engine.analyze(&repo(), PrNumber(10), &deep()).await.unwrap();

        assert_eq!(count(&report, OperationType::ExpandedCommit), 4);
        assert_eq!(report.analyzed_prs, vec![PrNumber(10)]);
    }

    #[tokio::test]
    async fn squash_node_links_to_branch_tip() {
        let pr = squashed_pr(10, &["a", "b"]);
        let engine = engine(MockGateway::new().with_pr(pr));

        let report = engine
            .analyze(&repo(), PrNumber(10), &AnalysisConfig::preset(Preset::Performance))
            .await
            .unwrap();

        let squash = report.nodes.iter().find(|n| n.sha == make_sha(1099)).unwrap();
        assert_eq!(squash.parents, vec![make_sha(1000), make_sha(1002)]);
        assert_eq!(squash.metadata.original_commit_count, Some(2));
        assert_eq!(squash.metadata.squashed_from.as_deref(), Some("feature-10"));
    }

    #[tokio::test]
    async fn node_hashes_are_unique() {
        // Both PRs share branch commit 501.
        let a = squashed_pr(5, &["a (#7)", "b"]);
        let mut b = squashed_pr(7, &["c", "d"]);
        b.branch_commits.insert(0, a.branch_commits[0].clone());
        let engine = engine(MockGateway::new().with_pr(a).with_pr(b));

        let report = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap();

        let unique: HashSet<_> = report.nodes.iter().map(|n| &n.sha).collect();
        assert_eq!(unique.len(), report.nodes.len());
    }

    #[tokio::test]
    async fn analysis_is_idempotent() {
        let a = squashed_pr(5, &["a (#7)", "b"]);
        let b = squashed_pr(7, &["c", "d"]);
        let engine = engine(MockGateway::new().with_pr(a).with_pr(b));

        let first = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap();
        let second = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn reference_cycle_visits_each_pr_once() {
        let a = squashed_pr(5, &["a (#7)", "b"]);
        let b = squashed_pr(7, &["c (#5)", "d"]);
        let engine = engine(MockGateway::new().with_pr(a).with_pr(b));

        let report = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap();

        assert_eq!(report.analyzed_prs, vec![PrNumber(5), PrNumber(7)]);
        assert_eq!(engine.gateway().inner().fetch_count(5), 1);
        assert_eq!(engine.gateway().inner().fetch_count(7), 1);
        let back_reference = report.nodes.iter().find(|n| n.sha == make_sha(701)).unwrap();
        assert!(back_reference
            .metadata
            .expansion_error
            .as_deref()
            .unwrap()
            .contains("already analyzed"));
    }

    #[tokio::test]
    async fn depth_cap_stops_recursion() {
        // PR k references PR k+1, for a chain longer than the cap.
        let mut mock = MockGateway::new();
        for k in 1..=8u64 {
            let msg = format!("step (#{})", k + 1);
            mock = mock.with_pr(squashed_pr(k, &[msg.as_str(), "tidy"]));
        }
        let engine = engine(mock);

        let report = engine.analyze(&repo(), PrNumber(1), &deep()).await.unwrap();

        assert!(report.max_depth_reached);
        assert_eq!(report.analyzed_prs.len(), 6);
        assert_eq!(engine.gateway().inner().fetch_count(7), 0);
        let capped: Vec<_> = report
            .nodes
            .iter()
            .filter(|n| n.metadata.max_depth_reached)
            .collect();
        assert_eq!(capped.len(), 2);
        assert!(capped.iter().all(|n| n.operation_type == OperationType::SquashedCommit));
        assert!(report.summary.contains("max depth reached"));
    }

    #[tokio::test]
    async fn iteration_cap_is_reported() {
        let mut mock = MockGateway::new();
        for k in 1..=5u64 {
            let msg = format!("step (#{})", k + 1);
            mock = mock.with_pr(squashed_pr(k, &[msg.as_str(), "tidy"]));
        }
        let engine = engine(mock);
        let config = deep().with_limits(Limits {
            max_iterations: 3,
            ..Limits::DEFAULT
        });

        let report = engine.analyze(&repo(), PrNumber(1), &config).await.unwrap();

        assert!(report.iteration_cap_reached);
        assert_eq!(report.analyzed_prs.len(), 3);
        assert_eq!(report.skipped[0].pr, PrNumber(4));
    }

    #[tokio::test]
    async fn missing_root_is_fatal() {
        let engine = engine(MockGateway::new());
        let err = engine
            .analyze(&repo(), PrNumber(404), &AnalysisConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn missing_nested_pr_is_skipped() {
        let a = squashed_pr(5, &["a (#6)", "b"]);
        let engine = engine(MockGateway::new().with_pr(a));

        let report = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap();

        assert_eq!(report.analyzed_prs, vec![PrNumber(5)]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].pr, PrNumber(6));
        let referrer = report.nodes.iter().find(|n| n.sha == make_sha(501)).unwrap();
        assert!(referrer.metadata.expansion_error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn unauthorized_nested_pr_is_fatal() {
        let a = squashed_pr(5, &["a (#6)", "b"]);
        let engine = engine(
            MockGateway::new()
                .with_pr(a)
                .with_pr_error(6, GatewayErrorKind::Unauthorized),
        );

        let err = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn rate_limited_nested_pr_is_fatal() {
        let a = squashed_pr(5, &["a (#6)", "b"]);
        let engine = engine(
            MockGateway::new()
                .with_pr(a)
                .with_pr_error(6, GatewayErrorKind::RateLimited),
        );

        let err = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert!(err.kind().is_retriable());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_root_pr_times_out() {
        let a = squashed_pr(5, &["a", "b"]);
        let engine = engine(
            MockGateway::new()
                .with_pr(a)
                .with_delay(5, Duration::from_secs(45)),
        );

        let err = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(engine.gateway().breaker().consecutive_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_nested_pr_times_out_and_is_skipped() {
        let a = squashed_pr(5, &["a (#6)", "b"]);
        let b = squashed_pr(6, &["c", "d"]);
        let engine = engine(
            MockGateway::new()
                .with_pr(a)
                .with_pr(b)
                .with_delay(6, Duration::from_secs(45)),
        );

        let report = engine.analyze(&repo(), PrNumber(5), &deep()).await.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.contains("timed out"));
        assert_eq!(engine.gateway().breaker().consecutive_failures(), 1);
    }

    #[tokio::test]
    async fn merge_commit_is_classified_as_merge() {
        let branch = vec![make_commit(1, 0, &[100]), make_commit(2, 5, &[1])];
        let mut merge = squash_commit(50, &branch, 100, "Merge pull request #3 from feature");
        merge.parents.push(make_sha(2));
        let pr = make_merged_pr(3, branch, merge);
        let engine = engine(MockGateway::new().with_pr(pr));

        let report = engine
            .analyze(&repo(), PrNumber(3), &AnalysisConfig::preset(Preset::Performance))
            .await
            .unwrap();

        let node = report.nodes.iter().find(|n| n.sha == make_sha(50)).unwrap();
        assert_eq!(node.operation_type, OperationType::MergeCommit);
        assert_eq!(count(&report, OperationType::Commit), 2);
    }

    #[tokio::test]
    async fn fast_forward_merge() {
        let branch = vec![make_commit(1, 0, &[100]), make_commit(2, 5, &[1])];
        let pr = make_merged_pr(3, branch.clone(), branch[1].clone());
        let engine = engine(MockGateway::new().with_pr(pr));

        let report = engine
            .analyze(&repo(), PrNumber(3), &AnalysisConfig::preset(Preset::Performance))
            .await
            .unwrap();

        let node = report.nodes.iter().find(|n| n.sha == make_sha(2)).unwrap();
        assert_eq!(node.operation_type, OperationType::FastForward);
        assert_eq!(report.nodes.len(), 2);
    }

    #[tokio::test]
    async fn open_pr_lists_branch_commits() {
        let pr = make_open_pr(9, vec![make_commit(1, 0, &[]), make_commit(2, 5, &[1])]);
        let engine = engine(MockGateway::new().with_pr(pr));

        let report = engine
            .analyze(&repo(), PrNumber(9), &AnalysisConfig::default())
            .await
            .unwrap();

        assert_eq!(count(&report, OperationType::Commit), 2);
        assert!(report.summary.starts_with("Analyzed 1 PR(s) (#9); 2 unique commit(s)"));
    }
}
