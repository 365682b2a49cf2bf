//! Steward (trust anchor) bootstrap.
use crate::errors::ProvisionError;
use idagent_core::config::AgentConfig;
use idagent_core::ledger::{Ledger, LedgerError, NymRole};
use idagent_core::wallet::{DidInfo, Wallet, WalletConfig, WalletError, WalletStore};
use log::{info, warn};
use std::sync::Arc;

/// The steward identity backing the agent's ledger writes.
pub(crate) struct Steward<W> {
    pub wallet: Arc<W>,
    pub did: String,
}

/// Opens (creating if necessary) the steward wallet and recovers the steward
/// DID from the configured seed.
///
/// A pre-existing steward wallet is the expected case on any run after the
/// first: creation failing with `AlreadyExists` is benign and the wallet is
/// simply opened. Any other failure is fatal.
pub(crate) async fn bootstrap<S, L>(
    locker: &S,
    ledger: &L,
    config: &AgentConfig,
) -> Result<Steward<S::Wallet>, ProvisionError>
where
    S: WalletStore,
    L: Ledger,
{
    let name = format!("steward-for-{}", config.wallet_name);
    let wallet_config = WalletConfig::new(name.clone(), config.wallet_key.clone());
    match locker.create_wallet(&wallet_config).await {
        Ok(()) => info!("created steward wallet {name}"),
        Err(WalletError::AlreadyExists(_)) => {
            info!("steward wallet {name} already exists, opening")
        }
        Err(e) => {
            warn!("steward wallet creation failed: {e}");
            return Err(e.into());
        }
    }
    let wallet = Arc::new(locker.open_wallet(&wallet_config).await?);

    let (did, verkey) = wallet
        .create_and_store_did(DidInfo::from_seed(&config.steward_seed))
        .await?;

    // On a shared ledger the steward is normally seeded at genesis; a fresh
    // ledger gets its genesis NYM here.
    match ledger.get_nym(&did).await {
        Ok(_) => {}
        Err(LedgerError::NymNotFound(_)) => {
            ledger
                .register_nym(&did, &did, &verkey, NymRole::Steward)
                .await?;
            info!("registered steward DID {did} at ledger genesis");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Steward { wallet, did })
}
