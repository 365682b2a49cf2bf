//! Agent context and endpoint-DID resolution.
use crate::errors::ProvisionError;
use crate::{issuance, steward};
use idagent_core::anoncreds::Anoncreds;
use idagent_core::attributes::DidAttributeStore;
use idagent_core::config::AgentConfig;
use idagent_core::ledger::{Ledger, NymRole};
use idagent_core::wallet::{DidInfo, Wallet, WalletConfig, WalletError, WalletStore};
use idagent_core::{
    CREDENTIAL_DEFINITIONS_ATTRIBUTE, MASTER_SECRET_ID_ATTRIBUTE, PID_CRED_DEF_ID_ATTRIBUTE,
    PRIMARY_ATTRIBUTE, SCHEMAS_ATTRIBUTE, THEIR_ENDPOINT_DID_ATTRIBUTE,
};
use log::{debug, info};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A local identity agent.
///
/// Owns the open wallet, the ledger client, the attribute store and the
/// resolved primary DID. Construct once at startup and share by reference;
/// there is no global state.
pub struct Agent<S: WalletStore, L> {
    pub(crate) locker: Arc<S>,
    pub(crate) wallet: Arc<S::Wallet>,
    pub(crate) ledger: Arc<L>,
    pub(crate) attributes: DidAttributeStore<S::Wallet>,
    pub(crate) config: AgentConfig,
    // Resolved at most once per process; concurrent first callers share the
    // single initialisation.
    primary: OnceCell<String>,
}

impl<S, L> Agent<S, L>
where
    S: WalletStore,
    S::Wallet: Anoncreds,
    L: Ledger,
{
    /// Opens the agent wallet (creating it on first run) and assembles the
    /// agent context.
    pub async fn open(locker: S, ledger: L, config: AgentConfig) -> Result<Self, ProvisionError> {
        let wallet_config = WalletConfig::new(config.wallet_name.clone(), config.wallet_key.clone());
        match locker.create_wallet(&wallet_config).await {
            Ok(()) => info!("created agent wallet {}", config.wallet_name),
            Err(WalletError::AlreadyExists(_)) => {
                info!("agent wallet {} already exists, opening", config.wallet_name)
            }
            Err(e) => return Err(e.into()),
        }
        let wallet = Arc::new(locker.open_wallet(&wallet_config).await?);
        Ok(Self {
            locker: Arc::new(locker),
            attributes: DidAttributeStore::new(wallet.clone()),
            wallet,
            ledger: Arc::new(ledger),
            config,
            primary: OnceCell::new(),
        })
    }

    /// Returns the agent's primary (endpoint) DID.
    ///
    /// Scans the wallet for a DID whose metadata marks it primary; if none
    /// exists, provisions one. The result is cached for the lifetime of the
    /// agent.
    pub async fn endpoint_did(&self) -> Result<String, ProvisionError> {
        let did = self
            .primary
            .get_or_try_init(|| async {
                if let Some(did) = self.find_primary().await? {
                    debug!("found existing primary DID {did}");
                    return Ok(did);
                }
                self.create_endpoint_did().await
            })
            .await?;
        Ok(did.clone())
    }

    /// Mints a DID in the agent wallet without touching the ledger.
    pub async fn create_did(&self, info: DidInfo) -> Result<(String, String), ProvisionError> {
        Ok(self.wallet.create_and_store_did(info).await?)
    }

    /// Returns the named attribute of the endpoint DID, or `None` if unset.
    pub async fn endpoint_attribute(
        &self,
        attribute: &str,
    ) -> Result<Option<Value>, ProvisionError> {
        let did = self.endpoint_did().await?;
        Ok(self.attributes.get(&did, attribute).await?)
    }

    /// Overwrites the named attribute of the endpoint DID.
    pub async fn set_endpoint_attribute(
        &self,
        attribute: &str,
        value: Value,
    ) -> Result<(), ProvisionError> {
        let did = self.endpoint_did().await?;
        Ok(self.attributes.set(&did, attribute, value).await?)
    }

    /// Appends to the named list attribute of the endpoint DID.
    pub async fn push_endpoint_attribute(
        &self,
        attribute: &str,
        item: Value,
    ) -> Result<(), ProvisionError> {
        let did = self.endpoint_did().await?;
        Ok(self.attributes.push(&did, attribute, item).await?)
    }

    /// Returns the identifier of the published Person-ID credential
    /// definition.
    pub async fn pid_cred_def_id(&self) -> Result<String, ProvisionError> {
        let did = self.endpoint_did().await?;
        match self.attributes.get(&did, PID_CRED_DEF_ID_ATTRIBUTE).await? {
            Some(Value::String(id)) => Ok(id),
            _ => Err(ProvisionError::MissingAttribute(
                PID_CRED_DEF_ID_ATTRIBUTE.to_string(),
                did,
            )),
        }
    }

    /// Returns a peer's endpoint DID from its pairwise record.
    pub async fn their_endpoint_did(&self, their_did: &str) -> Result<String, ProvisionError> {
        let pairwise = self.wallet.get_pairwise(their_did).await?;
        let metadata: Value = serde_json::from_str(&pairwise.metadata)?;
        metadata
            .get(THEIR_ENDPOINT_DID_ATTRIBUTE)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ProvisionError::MissingAttribute(
                    THEIR_ENDPOINT_DID_ATTRIBUTE.to_string(),
                    their_did.to_string(),
                )
            })
    }

    /// The agent's open wallet handle.
    pub fn wallet(&self) -> &S::Wallet {
        &self.wallet
    }

    /// The agent's attribute store.
    pub fn attributes(&self) -> &DidAttributeStore<S::Wallet> {
        &self.attributes
    }

    /// The configuration the agent was constructed with.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    async fn find_primary(&self) -> Result<Option<String>, ProvisionError> {
        for record in self.wallet.list_dids_with_meta().await? {
            let Some(blob) = record.metadata else { continue };
            let Ok(metadata) = serde_json::from_str::<Value>(&blob) else {
                continue;
            };
            if metadata
                .get(PRIMARY_ATTRIBUTE)
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                return Ok(Some(record.did));
            }
        }
        Ok(None)
    }

    /// Provisions the endpoint DID: steward bootstrap, minting, initial
    /// metadata, ledger registration, master secret, Person-ID issuance.
    async fn create_endpoint_did(&self) -> Result<String, ProvisionError> {
        let steward = steward::bootstrap(&*self.locker, &*self.ledger, &self.config).await?;

        let (did, verkey) = self.wallet.create_and_store_did(DidInfo::default()).await?;
        let mut metadata = Map::new();
        metadata.insert(PRIMARY_ATTRIBUTE.to_string(), Value::Bool(true));
        metadata.insert(SCHEMAS_ATTRIBUTE.to_string(), Value::Array(Vec::new()));
        metadata.insert(
            CREDENTIAL_DEFINITIONS_ATTRIBUTE.to_string(),
            Value::Array(Vec::new()),
        );
        self.wallet
            .set_did_metadata(&did, &Value::Object(metadata).to_string())
            .await?;

        self.ledger
            .register_nym(&steward.did, &did, &verkey, NymRole::TrustAnchor)
            .await?;
        self.ledger.set_endpoint(&did, &self.config.endpoint).await?;

        let master_secret_id = format!("master-secret-{}", self.config.wallet_name);
        self.wallet.create_master_secret(&master_secret_id).await?;
        self.attributes
            .set(&did, MASTER_SECRET_ID_ATTRIBUTE, Value::String(master_secret_id))
            .await?;

        issuance::issue_person_id_credential(self, &steward, &did).await?;

        info!("provisioned endpoint DID {did}");
        Ok(did)
    }
}
