//! Wallet seam for the external identity SDK.
//!
//! The wallet is an opaque encrypted store owned by the external SDK. This
//! module models the subset of its surface the agent relies on: wallet
//! lifecycle, DID minting and enumeration, per-DID metadata blobs and
//! pairwise records.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An error relating to the external wallet boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// A wallet with the given name already exists.
    #[error("Wallet already exists: {0}")]
    AlreadyExists(String),
    /// No wallet with the given name exists.
    #[error("Wallet not found: {0}")]
    NotFound(String),
    /// The wallet exists but the supplied key does not open it.
    #[error("Access denied to wallet: {0}")]
    AccessDenied(String),
    /// The DID is not owned by this wallet.
    #[error("DID not found in wallet: {0}")]
    DidNotFound(String),
    /// The DID has no metadata blob at all.
    #[error("No metadata stored for DID: {0}")]
    NoMetadata(String),
    /// No pairwise record is stored for the given DID.
    #[error("No pairwise record for DID: {0}")]
    NoPairwise(String),
    /// The metadata blob failed to (de)serialize.
    #[error("Malformed metadata for DID {0}: {1}")]
    MalformedMetadata(String, String),
}

/// Identifies and opens a named wallet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    /// Wallet name, unique per backend.
    pub id: String,
    /// Opening key for the encrypted store.
    pub key: String,
}

impl WalletConfig {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }
}

/// Optional inputs when minting a DID.
///
/// A seed makes minting deterministic (the same seed always yields the same
/// DID and verkey), which is how well-known identities such as the steward
/// are recovered.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DidInfo {
    /// Explicit DID to store, if the caller has one.
    pub did: Option<String>,
    /// Deterministic key seed.
    pub seed: Option<String>,
}

impl DidInfo {
    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            did: None,
            seed: Some(seed.into()),
        }
    }
}

/// An owned DID as returned by wallet enumeration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DidRecord {
    pub did: String,
    pub verkey: String,
    /// Opaque metadata blob, absent until first written.
    pub metadata: Option<String>,
}

/// A pairwise relationship between one of our DIDs and a peer's.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PairwiseRecord {
    pub my_did: String,
    pub their_did: String,
    /// Opaque metadata blob attached at pairing time.
    pub metadata: String,
}

/// Creates and opens named wallets.
#[async_trait]
pub trait WalletStore: Send + Sync {
    /// The handle type returned by [`open_wallet`](Self::open_wallet).
    type Wallet: Wallet;

    /// Creates a new wallet, failing with [`WalletError::AlreadyExists`] if
    /// the name is taken.
    async fn create_wallet(&self, config: &WalletConfig) -> Result<(), WalletError>;

    /// Opens an existing wallet.
    async fn open_wallet(&self, config: &WalletConfig) -> Result<Self::Wallet, WalletError>;
}

/// An open wallet handle.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Mints a DID and verkey pair and stores it in the wallet.
    async fn create_and_store_did(&self, info: DidInfo) -> Result<(String, String), WalletError>;

    /// Enumerates all DIDs owned by this wallet, with their metadata blobs.
    async fn list_dids_with_meta(&self) -> Result<Vec<DidRecord>, WalletError>;

    /// Returns the metadata blob for a DID, or [`WalletError::NoMetadata`]
    /// if none has ever been written.
    async fn get_did_metadata(&self, did: &str) -> Result<String, WalletError>;

    /// Replaces the metadata blob for a DID.
    async fn set_did_metadata(&self, did: &str, metadata: &str) -> Result<(), WalletError>;

    /// Records a pairwise relationship with a peer DID.
    async fn create_pairwise(
        &self,
        their_did: &str,
        my_did: &str,
        metadata: &str,
    ) -> Result<(), WalletError>;

    /// Looks up the pairwise record for a peer DID.
    async fn get_pairwise(&self, their_did: &str) -> Result<PairwiseRecord, WalletError>;
}
