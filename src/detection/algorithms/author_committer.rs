//! Author/committer discrepancy: a squash keeps the PR author as author but is
//! committed by whoever (or whatever) pressed the merge button.

use crate::detection::Algorithm;
use crate::detection::context::DetectionContext;
use crate::detection::verdict::DetectionEvidence;

use super::{DetectionFault, SquashDetector, Vote};

pub struct AuthorCommitter;

impl SquashDetector for AuthorCommitter {
    fn algorithm(&self) -> Algorithm {
        Algorithm::AuthorCommitter
    }

    fn detect(&self, ctx: &DetectionContext<'_>) -> Result<Vote, DetectionFault> {
        let merge = ctx.merge_commit;
        let committer_differs = !merge.author.same_person(&merge.committer);
        let author_matches_branch = ctx
            .branch_commits()
            .iter()
            .any(|c| c.author.same_person(&merge.author));

        let evidence = DetectionEvidence::AuthorCommitter {
            author: merge.author.clone(),
            committer: merge.committer.clone(),
            committer_differs,
            author_matches_branch,
        };

        let vote = match (committer_differs, author_matches_branch) {
            (true, true) => Vote::squash(
                0.6,
                format!(
                    "Committed by {} on behalf of branch author {}",
                    merge.committer.name, merge.author.name
                ),
                evidence,
            ),
            (true, false) => Vote::not_squash(
                0.3,
                format!(
                    "Committer differs from author, but {} authored no branch commits",
                    merge.author.name
                ),
                evidence,
            ),
            (false, _) => Vote::not_squash(0.4, "Author and committer are the same", evidence),
        };
        Ok(vote)
    }
}
