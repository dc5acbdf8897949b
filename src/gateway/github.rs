//! `PrGateway` over the GitHub REST API.
//!
//! Requests go through octocrab's raw `get` with local response types, so
//! only the fields the lineage engine reads are deserialized.
//!
//! List endpoints do not return diff stats; branch commits therefore arrive
//! with `stats: None` and the detectors that need them fetch details
//! separately.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::types::{
    CommitRecord, DiffStats, Identity, MergeStrategy, PrNumber, PullRequestSnapshot, RepoId, Sha,
    TimelineEvent, TimelineEventKind,
};

use super::client::OctocrabClient;
use super::error::{GatewayError, GatewayErrorKind};
use super::PrGateway;

/// Page size for list endpoints.
const PER_PAGE: usize = 100;

/// Safety bound on pagination. GitHub caps PR commit listings at 250.
const MAX_PAGES: u32 = 10;

// ─── Response Types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RestPull {
    #[serde(default)]
    merged: Option<bool>,
    merged_at: Option<DateTime<Utc>>,
    merge_commit_sha: Option<String>,
    head: RestRef,
    base: RestRef,
}

#[derive(Debug, Deserialize)]
struct RestRef {
    #[serde(rename = "ref")]
    name: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RestCommit {
    sha: String,
    commit: RestGitCommit,
    #[serde(default)]
    parents: Vec<RestParent>,
    stats: Option<RestStats>,
    files: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct RestGitCommit {
    author: Option<RestSignature>,
    committer: Option<RestSignature>,
    message: String,
    tree: RestParent,
}

#[derive(Debug, Deserialize)]
struct RestSignature {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct RestParent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct RestStats {
    additions: u64,
    deletions: u64,
}

#[derive(Debug, Deserialize)]
struct RestTimelineEvent {
    event: Option<String>,
    created_at: Option<DateTime<Utc>>,
    actor: Option<RestActor>,
    /// Not part of the public GitHub payload; read when a host supplies it.
    #[serde(default)]
    merge_method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RestActor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RestCompare {
    status: String,
}

// ─── Gateway Implementation ───────────────────────────────────────────────────

impl PrGateway for OctocrabClient {
    async fn fetch_pull_request(
        &self,
        repo: &RepoId,
        pr: PrNumber,
    ) -> Result<PullRequestSnapshot, GatewayError> {
        let pull: RestPull = get(
            self,
            &format!("/repos/{}/{}/pulls/{}", repo.owner, repo.repo, pr.0),
        )
        .await
        .map_err(|e| with_context(e, format!("PR {pr}")))?;

        let branch_commits = list_pr_commits(self, repo, pr).await?;
        let timeline = list_timeline(self, repo, pr).await?;

        let merged = pull.merged.unwrap_or(pull.merged_at.is_some());
        let merge_commit_sha = match (merged, pull.merge_commit_sha.as_deref()) {
            (true, Some(sha)) => Some(parse_sha(sha)?),
            _ => None,
        };
        let merge_commit = match &merge_commit_sha {
            Some(sha) => Some(self.fetch_commit(repo, sha).await?),
            None => None,
        };

        let base_commit = match self.fetch_commit(repo, &parse_sha(&pull.base.sha)?).await {
            Ok(commit) => Some(commit),
            Err(e) if e.kind == GatewayErrorKind::NotFound => {
                warn!(pr = %pr, base = %pull.base.sha, "Base commit no longer exists");
                None
            }
            Err(e) => return Err(e),
        };

        debug!(
            pr = %pr,
            head = %pull.head.sha,
            commits = branch_commits.len(),
            merged,
            "Fetched pull request"
        );

        Ok(PullRequestSnapshot {
            number: pr,
            head_ref: pull.head.name,
            base_ref: pull.base.name,
            merged,
            merge_commit_sha,
            branch_commits,
            merge_commit,
            timeline,
            base_commit,
        })
    }

    async fn fetch_commit(&self, repo: &RepoId, sha: &Sha) -> Result<CommitRecord, GatewayError> {
        let commit: RestCommit = get(
            self,
            &format!("/repos/{}/{}/commits/{}", repo.owner, repo.repo, sha),
        )
        .await
        .map_err(|e| with_context(e, format!("commit {}", sha.short())))?;
        to_commit_record(commit)
    }

    async fn is_commit_on_branch(
        &self,
        repo: &RepoId,
        branch: &str,
        sha: &Sha,
    ) -> Result<bool, GatewayError> {
        let compare: RestCompare = get(
            self,
            &format!(
                "/repos/{}/{}/compare/{}...{}",
                repo.owner, repo.repo, branch, sha
            ),
        )
        .await?;
        // "behind" and "identical" mean `sha` is an ancestor of the branch tip.
        Ok(matches!(compare.status.as_str(), "behind" | "identical"))
    }
}

// ─── Listing ──────────────────────────────────────────────────────────────────

async fn list_pr_commits(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<Vec<CommitRecord>, GatewayError> {
    let mut commits = Vec::new();
    let mut page = 1u32;
    loop {
        let items: Vec<RestCommit> = get(
            client,
            &format!(
                "/repos/{}/{}/pulls/{}/commits?per_page={}&page={}",
                repo.owner, repo.repo, pr.0, PER_PAGE, page
            ),
        )
        .await?;
        let is_last_page = items.len() < PER_PAGE;
        for item in items {
            commits.push(to_commit_record(item)?);
        }
        if is_last_page {
            break;
        }
        if page >= MAX_PAGES {
            warn!(pr = %pr, pages = page, "PR commit listing truncated");
            break;
        }
        page += 1;
    }
    Ok(commits)
}

async fn list_timeline(
    client: &OctocrabClient,
    repo: &RepoId,
    pr: PrNumber,
) -> Result<Vec<TimelineEvent>, GatewayError> {
    let mut events = Vec::new();
    let mut page = 1u32;
    loop {
        let items: Vec<RestTimelineEvent> = get(
            client,
            &format!(
                "/repos/{}/{}/issues/{}/timeline?per_page={}&page={}",
                repo.owner, repo.repo, pr.0, PER_PAGE, page
            ),
        )
        .await?;
        let is_last_page = items.len() < PER_PAGE;
        events.extend(items.into_iter().filter_map(|item| {
            let name = item.event?;
            Some(TimelineEvent {
                kind: TimelineEventKind::from_event_name(&name),
                timestamp: item.created_at,
                actor: item.actor.map(|a| a.login),
                merge_strategy: item.merge_method.as_deref().and_then(MergeStrategy::from_tag),
            })
        }));
        if is_last_page || page >= MAX_PAGES {
            break;
        }
        page += 1;
    }
    Ok(events)
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

async fn get<R: DeserializeOwned>(client: &OctocrabClient, route: &str) -> Result<R, GatewayError> {
    client
        .inner()
        .get(route, None::<&()>)
        .await
        .map_err(GatewayError::from_octocrab)
}

fn with_context(mut err: GatewayError, what: String) -> GatewayError {
    err.message = format!("{what}: {}", err.message);
    err
}

fn parse_sha(raw: &str) -> Result<Sha, GatewayError> {
    Sha::parse(raw).map_err(|e| GatewayError::transport(format!("host returned {e}")))
}

fn to_commit_record(raw: RestCommit) -> Result<CommitRecord, GatewayError> {
    let sha = parse_sha(&raw.sha)?;
    let author = raw.commit.author;
    let committer = raw.commit.committer;

    let authored_at = author
        .as_ref()
        .and_then(|s| s.date)
        .or_else(|| committer.as_ref().and_then(|s| s.date))
        .ok_or_else(|| GatewayError::transport(format!("commit {} has no timestamp", sha.short())))?;
    let committed_at = committer.as_ref().and_then(|s| s.date);

    let stats = raw.stats.map(|s| DiffStats {
        additions: s.additions,
        deletions: s.deletions,
        changed_files: raw.files.as_ref().map_or(0, |f| f.len() as u64),
    });

    Ok(CommitRecord {
        parents: raw
            .parents
            .iter()
            .map(|p| parse_sha(&p.sha))
            .collect::<Result<_, _>>()?,
        tree_sha: Some(parse_sha(&raw.commit.tree.sha)?),
        author: to_identity(author),
        committer: to_identity(committer),
        message: raw.commit.message,
        authored_at,
        committed_at,
        stats,
        sha,
    })
}

fn to_identity(signature: Option<RestSignature>) -> Identity {
    signature
        .map(|s| Identity::new(s.name, s.email))
        .unwrap_or_else(|| Identity::new("", ""))
}
