use idagent_core::anoncreds::AnoncredsError;
use idagent_core::config::ConfigError;
use idagent_core::ledger::LedgerError;
use idagent_core::wallet::WalletError;
use thiserror::Error;

/// An error arising during agent provisioning.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Wrapped error for the wallet boundary.
    #[error("A wrapped variant for a wallet error: {0}")]
    Wallet(#[from] WalletError),
    /// Wrapped error for the ledger boundary.
    #[error("A wrapped variant for a ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// Wrapped error for credential operations.
    #[error("A wrapped variant for an anoncreds error: {0}")]
    Anoncreds(#[from] AnoncredsError),
    /// Wrapped error for configuration loading.
    #[error("A wrapped variant for a config error: {0}")]
    Config(#[from] ConfigError),
    /// Wrapped error for JSON (de)serialization.
    #[error("A wrapped variant for a serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A required metadata attribute is absent or has the wrong shape.
    #[error("Attribute {0} missing or malformed on DID {1}")]
    MissingAttribute(String, String),
}
