//! Squash detection.
//!
//! Seven independent detectors each vote on whether a PR's merge commit is a
//! squash; the cross-validator blends their weighted votes into one decision.
//!
//! # Pipeline
//!
//! 1. `enrich::gather_evidence` performs the bounded extra fetches the enabled
//!    detectors need (merge-commit details, branch-commit details, base-branch
//!    membership). Failures degrade into `Gathered::Failed`.
//! 2. `classify` runs the enabled detectors over the resulting
//!    `DetectionContext` and combines their verdicts.
//! 3. A merge commit with more than one parent is never reported as a squash,
//!    whatever the vote.

use serde::{Deserialize, Serialize};

pub mod algorithms;
pub mod context;
pub mod cross_validate;
pub mod enrich;
pub mod patterns;
pub mod verdict;

pub use algorithms::{DetectionFault, SquashDetector, Vote, run_detector};
pub use context::{BaseMembership, DetectionContext, Gathered, GatheredEvidence};
pub use cross_validate::combine;
pub use enrich::gather_evidence;
pub use patterns::{MessagePattern, first_pr_reference, squash_indicators};
pub use verdict::{AggregateVerdict, DetectionEvidence, DetectionVerdict};

use crate::config::AnalysisConfig;

/// The available detection algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    HostMergeStrategy,
    TimestampPattern,
    AuthorCommitter,
    TreeStructure,
    HostTimeline,
    DiffSimilarity,
    LegacyHeuristic,
}

impl Algorithm {
    pub const ALL: [Algorithm; 7] = [
        Algorithm::HostMergeStrategy,
        Algorithm::TimestampPattern,
        Algorithm::AuthorCommitter,
        Algorithm::TreeStructure,
        Algorithm::HostTimeline,
        Algorithm::DiffSimilarity,
        Algorithm::LegacyHeuristic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::HostMergeStrategy => "host-merge-strategy",
            Algorithm::TimestampPattern => "timestamp-pattern",
            Algorithm::AuthorCommitter => "author-committer",
            Algorithm::TreeStructure => "tree-structure",
            Algorithm::HostTimeline => "host-timeline",
            Algorithm::DiffSimilarity => "diff-similarity",
            Algorithm::LegacyHeuristic => "legacy-heuristic",
        }
    }

    /// Relative trust in this algorithm's verdicts.
    pub fn weight(&self) -> f64 {
        match self {
            Algorithm::HostMergeStrategy => 0.4,
            Algorithm::TimestampPattern => 0.2,
            Algorithm::AuthorCommitter => 0.15,
            Algorithm::TreeStructure => 0.1,
            Algorithm::HostTimeline => 0.3,
            Algorithm::DiffSimilarity => 0.05,
            Algorithm::LegacyHeuristic => 0.1,
        }
    }

    /// The highest confidence this algorithm may report.
    pub fn max_confidence(&self) -> f64 {
        match self {
            Algorithm::HostMergeStrategy => 0.95,
            Algorithm::TimestampPattern => 0.7,
            Algorithm::AuthorCommitter => 0.6,
            Algorithm::TreeStructure => 0.8,
            Algorithm::HostTimeline => 0.95,
            Algorithm::DiffSimilarity => 0.6,
            Algorithm::LegacyHeuristic => 0.7,
        }
    }

    /// Returns true if the algorithm needs data beyond the PR snapshot.
    pub fn needs_extra_fetches(&self) -> bool {
        matches!(
            self,
            Algorithm::HostMergeStrategy | Algorithm::TreeStructure | Algorithm::DiffSimilarity
        )
    }

    pub fn detector(&self) -> &'static dyn SquashDetector {
        match self {
            Algorithm::HostMergeStrategy => &algorithms::HostMergeStrategy,
            Algorithm::TimestampPattern => &algorithms::TimestampPattern,
            Algorithm::AuthorCommitter => &algorithms::AuthorCommitter,
            Algorithm::TreeStructure => &algorithms::TreeStructure,
            Algorithm::HostTimeline => &algorithms::HostTimeline,
            Algorithm::DiffSimilarity => &algorithms::DiffSimilarity,
            Algorithm::LegacyHeuristic => &algorithms::LegacyHeuristic,
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs the enabled detectors and cross-validates their verdicts.
pub fn classify(ctx: &DetectionContext<'_>, config: &AnalysisConfig) -> AggregateVerdict {
    let verdicts = config
        .algorithms
        .iter()
        .map(|algorithm| run_detector(algorithm.detector(), ctx))
        .collect();

    let mut aggregate = combine(
        verdicts,
        config.confidence_threshold,
        config.require_cross_validation,
    );

    let parent_count = ctx.merge_commit.parents.len();
    if parent_count > 1 && aggregate.is_squash {
        aggregate.is_squash = false;
        aggregate.reasoning.push_str(&format!(
            "; overridden: merge commit has {parent_count} parents"
        ));
    }

    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preset;
    use crate::test_utils::{
        alice, make_commit, make_merged_pr, make_sha, repo, squash_commit,
    };
    use crate::types::{MergeStrategy, TimelineEvent, TimelineEventKind};

    /// Merge commit with one parent, a `(#42)` conventional message, three
    /// branch commits within ten seconds, committed by the host on behalf of
    /// the branch author.
    fn squash_scenario() -> (crate::types::PullRequestSnapshot, GatheredEvidence) {
        let branch = vec![
            make_commit(1, 0, &[100]),
            make_commit(2, 4, &[1]),
            make_commit(3, 10, &[2]),
        ];
        let merge = squash_commit(50, &branch, 100, "feat: x (#42)");
        assert_eq!(merge.author, alice());
        let pr = make_merged_pr(42, branch, merge);
        let evidence = GatheredEvidence {
            base_membership: Gathered::Available(
                (1..=3)
                    .map(|n| BaseMembership {
                        sha: make_sha(n),
                        on_base: false,
                    })
                    .collect(),
            ),
            ..GatheredEvidence::none()
        };
        (pr, evidence)
    }

    #[test]
    fn squash_scenario_under_default_preset() {
        let (pr, evidence) = squash_scenario();
        let repo = repo();
        let merge = pr.merge_commit.clone().unwrap();
        let ctx = DetectionContext::new(&repo, &pr, &merge, evidence);

        let aggregate = classify(&ctx, &AnalysisConfig::preset(Preset::Default));

        for algorithm in [
            Algorithm::HostMergeStrategy,
            Algorithm::TimestampPattern,
            Algorithm::AuthorCommitter,
        ] {
            assert!(
                aggregate.verdict_for(algorithm).unwrap().is_squash,
                "{algorithm} should vote squash"
            );
        }
        assert!(aggregate.is_squash, "{}", aggregate.reasoning);
        assert!(aggregate.confidence >= 0.6);
    }

    #[test]
    fn rebase_merge_under_default_preset_is_not_squash() {
        let (pr, evidence) = squash_scenario();
        let mut merge = pr.merge_commit.clone().unwrap();
        merge.message = "Update README".to_string();
        let repo = repo();
        let ctx = DetectionContext::new(&repo, &pr, &merge, evidence);

        let aggregate = classify(&ctx, &AnalysisConfig::preset(Preset::Default));

        assert!(!aggregate.verdict_for(Algorithm::HostMergeStrategy).unwrap().is_squash);
        assert!(!aggregate.is_squash, "{}", aggregate.reasoning);
        assert!(aggregate.confidence < 0.6);
    }

    #[test]
    fn threshold_scenario() {
        let (pr, evidence) = squash_scenario();
        let repo = repo();
        let merge = pr.merge_commit.clone().unwrap();
        let ctx = DetectionContext::new(&repo, &pr, &merge, evidence);

        let config = AnalysisConfig::preset(Preset::Default).with_threshold(0.99);
        let aggregate = classify(&ctx, &config);

        let ws: f64 = aggregate
            .verdicts
            .iter()
            .filter(|v| v.is_squash)
            .map(|v| v.confidence * v.weight)
            .sum();
        let wn: f64 = aggregate
            .verdicts
            .iter()
            .filter(|v| !v.is_squash)
            .map(|v| v.confidence * v.weight)
            .sum();
        assert!(ws > wn);
        assert!(!aggregate.is_squash);
    }

    #[test]
    fn two_parent_merge_is_never_squash() {
        let (mut pr, evidence) = squash_scenario();
        pr.timeline = vec![TimelineEvent {
            kind: TimelineEventKind::Merged,
            timestamp: None,
            actor: None,
            merge_strategy: Some(MergeStrategy::Squash),
        }];
        let mut merge = pr.merge_commit.clone().unwrap();
        merge.parents.push(make_sha(3));
        pr.merge_commit = Some(merge.clone());
        let repo = repo();
        let ctx = DetectionContext::new(&repo, &pr, &merge, evidence);

        let aggregate = classify(&ctx, &AnalysisConfig::preset(Preset::Comprehensive).with_threshold(0.0));

        for algorithm in [
            Algorithm::HostMergeStrategy,
            Algorithm::TreeStructure,
            Algorithm::LegacyHeuristic,
        ] {
            assert!(!aggregate.verdict_for(algorithm).unwrap().is_squash);
        }
        assert!(!aggregate.is_squash);
    }

    #[test]
    fn verdicts_follow_configured_order() {
        let (pr, evidence) = squash_scenario();
        let repo = repo();
        let merge = pr.merge_commit.clone().unwrap();
        let ctx = DetectionContext::new(&repo, &pr, &merge, evidence);
        let config = AnalysisConfig::preset(Preset::Comprehensive);

        let aggregate = classify(&ctx, &config);
        let order: Vec<_> = aggregate.verdicts.iter().map(|v| v.algorithm).collect();
        assert_eq!(order, config.algorithms);
    }

    #[test]
    fn weights_and_caps() {
        let total: f64 = Algorithm::ALL.iter().map(|a| a.weight()).sum();
        assert!((total - 1.3).abs() < 1e-9);
        assert!(Algorithm::ALL.iter().all(|a| a.max_confidence() <= 1.0));
    }
}
