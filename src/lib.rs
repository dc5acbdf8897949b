//! PR lineage - reconstructs commit history across squash, rebase and
//! force-push for GitHub pull requests.
//!
//! The entry point is [`lineage::LineageEngine::analyze`]; it fetches through a
//! [`gateway::PrGateway`], guarded by a shared [`resilience::CircuitBreaker`].

pub mod config;
pub mod detection;
pub mod error;
pub mod gateway;
pub mod lineage;
pub mod resilience;
pub mod types;

#[cfg(test)]
pub mod test_utils;
