//! Anonymous-credential seam and raw-value encoding.
//!
//! Schema and credential-definition descriptors, the offer/request/issue/
//! store operations, and the deterministic encoding used to embed plaintext
//! attribute values in a signed credential. All signature math belongs to
//! the backend; the types here only carry what crosses the boundary.
use crate::wallet::WalletError;
use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// An error relating to credential operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnoncredsError {
    /// A master secret with the given identifier already exists.
    #[error("Master secret already exists: {0}")]
    MasterSecretAlreadyExists(String),
    /// No master secret with the given identifier exists.
    #[error("Master secret not found: {0}")]
    MasterSecretNotFound(String),
    /// No credential definition with the given identifier is stored.
    #[error("Credential definition not found: {0}")]
    CredDefNotFound(String),
    /// The offer and request refer to different credential definitions.
    #[error("Credential request does not match offer: {0} != {1}")]
    OfferMismatch(String, String),
    /// A credential value is missing a schema attribute.
    #[error("Credential values missing schema attribute: {0}")]
    MissingAttribute(String),
    /// Wrapped wallet error.
    #[error("A wrapped variant for a wallet error: {0}")]
    Wallet(#[from] WalletError),
}

/// A ledger-published descriptor of an issuable credential's shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub version: String,
    pub attr_names: Vec<String>,
}

/// Composes a schema identifier from its issuer, name and version.
pub fn schema_id(issuer_did: &str, name: &str, version: &str) -> String {
    format!("{issuer_did}:2:{name}:{version}")
}

/// A ledger-published descriptor of a credential signing key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialDefinition {
    pub id: String,
    pub schema_id: String,
    pub issuer_did: String,
    pub tag: String,
    pub support_revocation: bool,
    /// Public half of the signing key, opaque to the agent.
    pub verification_key: String,
}

/// Composes a credential-definition identifier.
pub fn cred_def_id(issuer_did: &str, schema_id: &str, tag: &str) -> String {
    format!("{issuer_did}:3:CL:{schema_id}:{tag}")
}

/// An issuer's offer to issue against a credential definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialOffer {
    pub cred_def_id: String,
    pub nonce: String,
}

/// A holder's blinded request against an offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRequest {
    pub prover_did: String,
    pub cred_def_id: String,
    pub nonce: String,
    /// Blinded link-secret commitment, opaque to the agent.
    pub blinded_secret: String,
}

/// Holder-side state needed to store the credential once issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRequestMetadata {
    pub master_secret_id: String,
    pub nonce: String,
}

/// A raw attribute value alongside its deterministic encoding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncodedValue {
    pub raw: String,
    pub encoded: String,
}

impl EncodedValue {
    /// Encodes a raw value with [`encode`].
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let encoded = encode(&raw);
        Self { raw, encoded }
    }
}

/// Attribute name to raw/encoded value pairs, in stable order.
pub type CredentialValues = BTreeMap<String, EncodedValue>;

/// A signed credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub cred_def_id: String,
    pub values: CredentialValues,
    /// Opaque signature produced by the backend.
    pub signature: String,
}

/// Deterministic encoding for raw attribute values.
///
/// A value that parses as an unsigned 32-bit integer encodes as itself;
/// anything else becomes the decimal rendering of the big-endian SHA-256
/// digest of its UTF-8 bytes. Proof predicates compare these encodings, so
/// issuer and holder must agree on them exactly.
pub fn encode(raw: &str) -> String {
    if raw.parse::<u32>().is_ok() {
        return raw.to_string();
    }
    let digest = Sha256::digest(raw.as_bytes());
    BigUint::from_bytes_be(&digest).to_str_radix(10)
}

/// Credential operations performed against an open wallet.
#[async_trait]
pub trait Anoncreds: Send + Sync {
    /// Creates the wallet's master (link) secret.
    async fn create_master_secret(&self, id: &str) -> Result<String, AnoncredsError>;

    /// Builds a schema descriptor signed off by `issuer_did`.
    async fn issuer_create_schema(
        &self,
        issuer_did: &str,
        name: &str,
        version: &str,
        attr_names: &[&str],
    ) -> Result<Schema, AnoncredsError>;

    /// Generates a signing key pair for `schema` and stores the private half.
    async fn issuer_create_credential_def(
        &self,
        issuer_did: &str,
        schema: &Schema,
        tag: &str,
        support_revocation: bool,
    ) -> Result<CredentialDefinition, AnoncredsError>;

    /// Opens an issuance exchange for a stored credential definition.
    async fn issuer_create_credential_offer(
        &self,
        cred_def_id: &str,
    ) -> Result<CredentialOffer, AnoncredsError>;

    /// Builds a holder request against an offer, blinded with the named
    /// master secret.
    async fn prover_create_credential_req(
        &self,
        prover_did: &str,
        offer: &CredentialOffer,
        cred_def: &CredentialDefinition,
        master_secret_id: &str,
    ) -> Result<(CredentialRequest, CredentialRequestMetadata), AnoncredsError>;

    /// Signs `values` into a credential answering `request`.
    async fn issuer_create_credential(
        &self,
        offer: &CredentialOffer,
        request: &CredentialRequest,
        values: CredentialValues,
    ) -> Result<Credential, AnoncredsError>;

    /// Stores an issued credential, returning its local referent.
    async fn prover_store_credential(
        &self,
        request_metadata: &CredentialRequestMetadata,
        credential: Credential,
        cred_def: &CredentialDefinition,
    ) -> Result<String, AnoncredsError>;

    /// Enumerates stored credentials.
    async fn list_credentials(&self) -> Result<Vec<Credential>, AnoncredsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_integer_passthrough() {
        assert_eq!(encode("87121"), "87121");
        assert_eq!(encode("0"), "0");
        assert_eq!(encode("4294967295"), "4294967295");
    }

    #[test]
    fn test_encode_string() {
        // Known vector for the SHA-256 path.
        assert_eq!(
            encode("101 Wilson Lane"),
            "68086943237164982734333428280784300550565381723532936263016368251445461241953"
        );
    }

    #[test]
    fn test_encode_out_of_range_integer() {
        // 2^32 no longer fits, so it takes the digest path.
        assert_ne!(encode("4294967296"), "4294967296");
    }

    #[test]
    fn test_encode_deterministic() {
        assert_eq!(encode("Mustermann"), encode("Mustermann"));
        assert_ne!(encode("Mustermann"), encode("mustermann"));
    }

    #[test]
    fn test_schema_and_cred_def_ids() {
        let sid = schema_id("did:mem:steward", "Person-ID", "1.2");
        assert_eq!(sid, "did:mem:steward:2:Person-ID:1.2");
        assert_eq!(
            cred_def_id("did:mem:steward", &sid, "PID"),
            "did:mem:steward:3:CL:did:mem:steward:2:Person-ID:1.2:PID"
        );
    }
}
