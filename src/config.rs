//! Analysis configuration and named presets.
//!
//! - `default`: five algorithms, threshold 0.6, cross-validation required
//! - `performance`: the three cheapest algorithms, threshold 0.5, optional
//! - `comprehensive`: all seven algorithms, threshold 0.7, required
//!
//! The cheap algorithms work from the PR snapshot alone; the others need extra
//! fetches (commit details, base-branch membership, timeline).

use serde::{Deserialize, Serialize};

use crate::detection::Algorithm;

/// How far squash expansion descends into nested pull requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// Emit the squashed branch commits only.
    #[default]
    Shallow,
    /// Follow `(#N)` references in squashed commits into their own PRs.
    Deep,
}

impl DepthPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "shallow" => Some(DepthPolicy::Shallow),
            "deep" => Some(DepthPolicy::Deep),
            _ => None,
        }
    }
}

/// Bounds on how much work a single analysis may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum nesting depth for deep expansion. PRs at this depth are
    /// expanded shallowly.
    pub max_depth: u32,

    /// Maximum number of work-queue items processed per call.
    pub max_iterations: usize,

    /// Maximum number of PRs waiting in the work queue at once.
    pub max_pending: usize,

    /// Branch commits checked for base-branch membership.
    pub base_membership_sample: usize,

    /// Branch commits whose details (tree, stats) are fetched.
    pub branch_detail_sample: usize,
}

impl Limits {
    pub const DEFAULT: Self = Self {
        max_depth: 5,
        max_iterations: 50,
        max_pending: 20,
        base_membership_sample: 5,
        branch_detail_sample: 10,
    };
}

impl Default for Limits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Named configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Default,
    Performance,
    Comprehensive,
}

impl Preset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Some(Preset::Default),
            "performance" => Some(Preset::Performance),
            "comprehensive" => Some(Preset::Comprehensive),
            _ => None,
        }
    }
}

/// Configuration for one `analyze` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub depth_policy: DepthPolicy,

    /// Algorithms to run, in the order their verdicts are reported.
    pub algorithms: Vec<Algorithm>,

    /// Minimum blended confidence for a squash classification.
    pub confidence_threshold: f64,

    /// When set, a squash classification also needs at least two squash votes.
    pub require_cross_validation: bool,

    #[serde(default)]
    pub limits: Limits,
}

impl AnalysisConfig {
    pub fn preset(preset: Preset) -> Self {
        let (algorithms, confidence_threshold, require_cross_validation) = match preset {
            Preset::Default => (
                vec![
                    Algorithm::HostMergeStrategy,
                    Algorithm::TimestampPattern,
                    Algorithm::AuthorCommitter,
                    Algorithm::TreeStructure,
                    Algorithm::LegacyHeuristic,
                ],
                0.6,
                true,
            ),
            Preset::Performance => (
                vec![
                    Algorithm::TimestampPattern,
                    Algorithm::AuthorCommitter,
                    Algorithm::LegacyHeuristic,
                ],
                0.5,
                false,
            ),
            Preset::Comprehensive => (Algorithm::ALL.to_vec(), 0.7, true),
        };

        Self {
            depth_policy: DepthPolicy::default(),
            algorithms,
            confidence_threshold,
            require_cross_validation,
            limits: Limits::DEFAULT,
        }
    }

    /// Looks up a preset by name (`default`, `performance`, `comprehensive`).
    pub fn from_preset_name(name: &str) -> Option<Self> {
        Preset::from_name(name).map(Self::preset)
    }

    pub fn with_depth_policy(mut self, depth_policy: DepthPolicy) -> Self {
        self.depth_policy = depth_policy;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_threshold(mut self, confidence_threshold: f64) -> Self {
        self.confidence_threshold = confidence_threshold;
        self
    }

    pub fn is_enabled(&self, algorithm: Algorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::preset(Preset::Default)
    }
}
