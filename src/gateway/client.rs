//! Octocrab client wrapper.

use octocrab::Octocrab;

/// A GitHub REST client.
///
/// Unlike a repo-scoped client, every gateway call names its repository, so
/// one client can follow references across repositories.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
}

impl OctocrabClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates a client authenticated with a personal access token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }

    pub fn inner(&self) -> &Octocrab {
        &self.client
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient").finish_non_exhaustive()
    }
}
