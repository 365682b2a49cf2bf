//! Ledger seam for the external verifiable-data registry.
//!
//! Write durability and consensus are the backend's concern; the trait only
//! fixes the operations the agent issues: NYM registration, service
//! endpoint attributes, and schema / credential-definition publication.
use crate::anoncreds::{CredentialDefinition, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error relating to the ledger boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// No NYM is registered for the DID.
    #[error("DID not registered on ledger: {0}")]
    NymNotFound(String),
    /// No schema with the given identifier is published.
    #[error("Schema not found on ledger: {0}")]
    SchemaNotFound(String),
    /// No credential definition with the given identifier is published.
    #[error("Credential definition not found on ledger: {0}")]
    CredDefNotFound(String),
    /// No endpoint attribute is set for the DID.
    #[error("No endpoint set for DID: {0}")]
    EndpointNotFound(String),
    /// The ledger refused a write transaction.
    #[error("Ledger write rejected for submitter {0}: {1}")]
    WriteRejected(String, String),
}

/// Role granted to a DID by its NYM transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NymRole {
    /// Ordinary identity with no write privileges.
    Common,
    /// May register identities and publish schemas and credential definitions.
    TrustAnchor,
    /// Ledger-governance identity, typically seeded at genesis.
    Steward,
}

impl NymRole {
    /// Whether the role may submit write transactions for other identities.
    pub fn can_write(&self) -> bool {
        matches!(self, NymRole::TrustAnchor | NymRole::Steward)
    }
}

/// A registered identity as recorded on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NymRecord {
    pub did: String,
    pub verkey: String,
    pub role: NymRole,
}

/// The external verifiable-data registry.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Registers `target_did` on the ledger under `submitter_did`'s
    /// authority.
    async fn register_nym(
        &self,
        submitter_did: &str,
        target_did: &str,
        verkey: &str,
        role: NymRole,
    ) -> Result<(), LedgerError>;

    /// Looks up the NYM record for a DID.
    async fn get_nym(&self, did: &str) -> Result<NymRecord, LedgerError>;

    /// Writes the service endpoint attribute for a registered DID.
    async fn set_endpoint(&self, did: &str, endpoint: &str) -> Result<(), LedgerError>;

    /// Reads the service endpoint attribute for a DID.
    async fn get_endpoint(&self, did: &str) -> Result<String, LedgerError>;

    /// Publishes a schema descriptor.
    async fn publish_schema(&self, submitter_did: &str, schema: &Schema)
        -> Result<(), LedgerError>;

    /// Fetches a published schema by identifier.
    async fn fetch_schema(&self, schema_id: &str) -> Result<Schema, LedgerError>;

    /// Publishes a credential-definition descriptor.
    async fn publish_cred_def(
        &self,
        submitter_did: &str,
        cred_def: &CredentialDefinition,
    ) -> Result<(), LedgerError>;

    /// Fetches a published credential definition by identifier.
    async fn fetch_cred_def(&self, cred_def_id: &str) -> Result<CredentialDefinition, LedgerError>;
}
