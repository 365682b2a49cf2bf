//! High-level provisioning flows for a local identity agent.
//!
//! Composes the seams in `idagent-core` into the agent lifecycle: open the
//! wallet, resolve (or provision) the primary endpoint DID, and self-issue
//! the initial Person-ID credential under the steward's authority.
pub mod agent;
pub mod errors;
mod issuance;
mod steward;

pub use agent::Agent;
pub use errors::ProvisionError;
