//! Commit-message patterns that hint at a squash merge.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::PrNumber;

/// A squash indicator found in a commit message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePattern {
    /// The word "squash" or "squashed".
    SquashKeyword,
    /// A parenthesized PR reference such as `(#42)`.
    PrReference,
    /// A single-line conventional commit (`feat: ...`, `fix(scope)!: ...`).
    ConventionalCommit,
    /// A bullet list body, as GitHub writes when squashing several commits.
    BulletList,
    /// A `Co-authored-by:` trailer.
    CoAuthoredBy,
}

static SQUASH_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsquash(?:ed)?\b").unwrap());

static PR_REFERENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(#(\d+)\)").unwrap());

static CONVENTIONAL_COMMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:feat|fix|docs|style|refactor|perf|test|build|ci|chore|revert)(?:\([^)]*\))?!?: \S",
    )
    .unwrap()
});

static BULLET_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*[*-]\s+\S").unwrap());

static CO_AUTHORED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?im)^co-authored-by:").unwrap());

/// Returns every squash indicator present in `message`, in declaration order.
pub fn squash_indicators(message: &str) -> Vec<MessagePattern> {
    let mut found = Vec::new();
    let trimmed = message.trim();

    if SQUASH_KEYWORD.is_match(trimmed) {
        found.push(MessagePattern::SquashKeyword);
    }
    if PR_REFERENCE.is_match(trimmed) {
        found.push(MessagePattern::PrReference);
    }
    if trimmed.lines().count() == 1 && CONVENTIONAL_COMMIT.is_match(trimmed) {
        found.push(MessagePattern::ConventionalCommit);
    }
    if BULLET_LINE.is_match(trimmed) {
        found.push(MessagePattern::BulletList);
    }
    if CO_AUTHORED_BY.is_match(trimmed) {
        found.push(MessagePattern::CoAuthoredBy);
    }

    found
}

/// Returns the first parenthesized PR reference in `message`, if any.
///
/// Later references are ignored: `"a (#3) b (#4)"` yields `#3`.
pub fn first_pr_reference(message: &str) -> Option<PrNumber> {
    PR_REFERENCE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(PrNumber)
}
