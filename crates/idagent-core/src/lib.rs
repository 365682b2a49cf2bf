//! Core traits and logic (backend independent).
pub mod anoncreds;
pub mod attributes;
pub mod config;
pub mod ledger;
pub mod memory;
pub mod wallet;

/// Metadata attribute marking the agent's primary DID.
pub const PRIMARY_ATTRIBUTE: &str = "primary";

/// Metadata attribute listing schemas published on behalf of the agent.
pub const SCHEMAS_ATTRIBUTE: &str = "schemas";

/// Metadata attribute listing credential definitions published on behalf of the agent.
pub const CREDENTIAL_DEFINITIONS_ATTRIBUTE: &str = "credential_definitions";

/// Metadata attribute holding the identifier of the agent's master secret.
pub const MASTER_SECRET_ID_ATTRIBUTE: &str = "master_secret_id";

/// Metadata attribute recording the agent's published Person-ID credential definition.
pub const PID_CRED_DEF_ID_ATTRIBUTE: &str = "pid_cred_def_id";

/// Attribute on a pairwise record naming the peer's endpoint DID.
pub const THEIR_ENDPOINT_DID_ATTRIBUTE: &str = "their_endpoint_did";
