//! Command-line lineage analysis.
//!
//! # Usage
//!
//! - `GITHUB_TOKEN`: a token with read access to the repository.
//! - `LINEAGE_REPO`: `owner/repo`; a `https://github.com/` prefix is accepted.
//! - `LINEAGE_PR`: the PR number to analyze.
//! - `LINEAGE_PRESET`: `default`, `performance` or `comprehensive`
//!   (default: `default`).
//! - `LINEAGE_DEPTH`: `shallow` or `deep` (default: `shallow`).
//!
//! The report is printed to stdout as JSON; logs go to stderr.

use std::env;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pr_lineage::config::{AnalysisConfig, DepthPolicy};
use pr_lineage::gateway::OctocrabClient;
use pr_lineage::lineage::LineageEngine;
use pr_lineage::resilience::{
    BreakerConfig, CircuitBreaker, RetryConfig, RetryPolicy, retry_with_backoff,
};
use pr_lineage::types::{PrNumber, RepoId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pr_lineage=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let token = env::var("GITHUB_TOKEN")
        .map_err(|_| anyhow!("GITHUB_TOKEN environment variable not set"))?;

    let raw_repo = env::var("LINEAGE_REPO")
        .map_err(|_| anyhow!("LINEAGE_REPO environment variable not set (e.g., owner/repo)"))?;
    let trimmed = raw_repo
        .strip_prefix("https://github.com/")
        .or_else(|| raw_repo.strip_prefix("github.com/"))
        .unwrap_or(&raw_repo)
        .trim_end_matches('/');
    let repo = RepoId::parse(trimmed)
        .ok_or_else(|| anyhow!("LINEAGE_REPO must be in owner/repo format, got {raw_repo:?}"))?;

    let pr = env::var("LINEAGE_PR")
        .map_err(|_| anyhow!("LINEAGE_PR environment variable not set"))?
        .trim_start_matches('#')
        .parse::<u64>()
        .map(PrNumber)
        .context("LINEAGE_PR must be a PR number")?;

    let preset = env::var("LINEAGE_PRESET").unwrap_or_else(|_| "default".to_string());
    let mut config = AnalysisConfig::from_preset_name(&preset)
        .ok_or_else(|| anyhow!("unknown LINEAGE_PRESET {preset:?}"))?;
    if let Ok(depth) = env::var("LINEAGE_DEPTH") {
        let policy = DepthPolicy::from_name(&depth)
            .ok_or_else(|| anyhow!("LINEAGE_DEPTH must be shallow or deep, got {depth:?}"))?;
        config = config.with_depth_policy(policy);
    }

    let client = OctocrabClient::from_token(token).context("failed to build GitHub client")?;
    let breaker = Arc::new(CircuitBreaker::new(BreakerConfig::DEFAULT));
    let engine = LineageEngine::new(client, breaker);

    tracing::info!(repo = %repo, pr = %pr, preset = %preset, "Starting lineage analysis");

    let (engine, repo, config) = (&engine, &repo, &config);
    let report = retry_with_backoff(RetryConfig::DEFAULT, RetryPolicy::RetryTransient, move || {
        engine.analyze(repo, pr, config)
    })
    .await
    .into_result()
    .with_context(|| format!("lineage analysis of {repo} {pr} failed"))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
