//! In-memory reference backend.
//!
//! Stands in for the external wallet/ledger SDK in tests and demos. Key
//! material is faked with hashes: DIDs and verkeys are derived from the
//! mint seed (or a wallet-local counter), and credential signatures are
//! digests over the issued values. Behaviour at the trait boundary matches
//! the real SDK: distinguished already-exists errors, metadata absent until
//! first written, ledger writes gated on submitter authority.
use crate::anoncreds::{
    cred_def_id, schema_id, Anoncreds, AnoncredsError, Credential, CredentialDefinition,
    CredentialOffer, CredentialRequest, CredentialRequestMetadata, CredentialValues, Schema,
};
use crate::ledger::{Ledger, LedgerError, NymRecord, NymRole};
use crate::wallet::{
    DidInfo, DidRecord, PairwiseRecord, Wallet, WalletConfig, WalletError, WalletStore,
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

fn digest_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[derive(Debug, Clone)]
struct DidEntry {
    verkey: String,
    metadata: Option<String>,
}

#[derive(Debug, Default)]
struct WalletState {
    key: String,
    dids: HashMap<String, DidEntry>,
    did_order: Vec<String>,
    pairwise: HashMap<String, PairwiseRecord>,
    master_secrets: Vec<String>,
    cred_defs: HashMap<String, CredentialDefinition>,
    credentials: Vec<Credential>,
    counter: u64,
}

/// Creates and opens in-memory wallets.
#[derive(Clone, Default)]
pub struct MemoryLocker {
    wallets: Arc<RwLock<HashMap<String, WalletState>>>,
}

impl MemoryLocker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WalletStore for MemoryLocker {
    type Wallet = MemoryWallet;

    async fn create_wallet(&self, config: &WalletConfig) -> Result<(), WalletError> {
        let mut wallets = self.wallets.write().await;
        if wallets.contains_key(&config.id) {
            return Err(WalletError::AlreadyExists(config.id.clone()));
        }
        wallets.insert(
            config.id.clone(),
            WalletState {
                key: config.key.clone(),
                ..WalletState::default()
            },
        );
        Ok(())
    }

    async fn open_wallet(&self, config: &WalletConfig) -> Result<MemoryWallet, WalletError> {
        let wallets = self.wallets.read().await;
        let state = wallets
            .get(&config.id)
            .ok_or_else(|| WalletError::NotFound(config.id.clone()))?;
        if state.key != config.key {
            return Err(WalletError::AccessDenied(config.id.clone()));
        }
        Ok(MemoryWallet {
            name: config.id.clone(),
            wallets: self.wallets.clone(),
        })
    }
}

/// An open handle onto one in-memory wallet.
#[derive(Clone)]
pub struct MemoryWallet {
    name: String,
    wallets: Arc<RwLock<HashMap<String, WalletState>>>,
}

impl MemoryWallet {
    async fn with_state<T>(
        &self,
        f: impl FnOnce(&mut WalletState) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let mut wallets = self.wallets.write().await;
        let state = wallets
            .get_mut(&self.name)
            .ok_or_else(|| WalletError::NotFound(self.name.clone()))?;
        f(state)
    }
}

#[async_trait]
impl Wallet for MemoryWallet {
    async fn create_and_store_did(&self, info: DidInfo) -> Result<(String, String), WalletError> {
        let name = self.name.clone();
        self.with_state(move |state| {
            let tag = match (&info.seed, &info.did) {
                (Some(seed), _) => seed.clone(),
                (None, Some(did)) => did.clone(),
                (None, None) => {
                    state.counter += 1;
                    format!("{name}:{}", state.counter)
                }
            };
            let digest = digest_hex(&tag);
            let did = match info.did {
                Some(did) => did,
                None => format!("did:mem:{}", &digest[..16]),
            };
            let verkey = digest_hex(&format!("verkey:{tag}"));
            // Seeded minting is a recovery path: re-deriving an existing DID
            // keeps its stored metadata.
            if !state.dids.contains_key(&did) {
                state.dids.insert(
                    did.clone(),
                    DidEntry {
                        verkey: verkey.clone(),
                        metadata: None,
                    },
                );
                state.did_order.push(did.clone());
            }
            Ok((did, verkey))
        })
        .await
    }

    async fn list_dids_with_meta(&self) -> Result<Vec<DidRecord>, WalletError> {
        self.with_state(|state| {
            Ok(state
                .did_order
                .iter()
                .filter_map(|did| {
                    state.dids.get(did).map(|entry| DidRecord {
                        did: did.clone(),
                        verkey: entry.verkey.clone(),
                        metadata: entry.metadata.clone(),
                    })
                })
                .collect())
        })
        .await
    }

    async fn get_did_metadata(&self, did: &str) -> Result<String, WalletError> {
        self.with_state(|state| {
            let entry = state
                .dids
                .get(did)
                .ok_or_else(|| WalletError::DidNotFound(did.to_string()))?;
            entry
                .metadata
                .clone()
                .ok_or_else(|| WalletError::NoMetadata(did.to_string()))
        })
        .await
    }

    async fn set_did_metadata(&self, did: &str, metadata: &str) -> Result<(), WalletError> {
        self.with_state(|state| {
            let entry = state
                .dids
                .get_mut(did)
                .ok_or_else(|| WalletError::DidNotFound(did.to_string()))?;
            entry.metadata = Some(metadata.to_string());
            Ok(())
        })
        .await
    }

    async fn create_pairwise(
        &self,
        their_did: &str,
        my_did: &str,
        metadata: &str,
    ) -> Result<(), WalletError> {
        self.with_state(|state| {
            if !state.dids.contains_key(my_did) {
                return Err(WalletError::DidNotFound(my_did.to_string()));
            }
            state.pairwise.insert(
                their_did.to_string(),
                PairwiseRecord {
                    my_did: my_did.to_string(),
                    their_did: their_did.to_string(),
                    metadata: metadata.to_string(),
                },
            );
            Ok(())
        })
        .await
    }

    async fn get_pairwise(&self, their_did: &str) -> Result<PairwiseRecord, WalletError> {
        self.with_state(|state| {
            state
                .pairwise
                .get(their_did)
                .cloned()
                .ok_or_else(|| WalletError::NoPairwise(their_did.to_string()))
        })
        .await
    }
}

#[async_trait]
impl Anoncreds for MemoryWallet {
    async fn create_master_secret(&self, id: &str) -> Result<String, AnoncredsError> {
        self.with_state(|state| {
            if state.master_secrets.iter().any(|s| s.as_str() == id) {
                return Err(WalletError::AlreadyExists(id.to_string()));
            }
            state.master_secrets.push(id.to_string());
            Ok(id.to_string())
        })
        .await
        .map_err(|e| match e {
            WalletError::AlreadyExists(id) => AnoncredsError::MasterSecretAlreadyExists(id),
            other => AnoncredsError::Wallet(other),
        })
    }

    async fn issuer_create_schema(
        &self,
        issuer_did: &str,
        name: &str,
        version: &str,
        attr_names: &[&str],
    ) -> Result<Schema, AnoncredsError> {
        Ok(Schema {
            id: schema_id(issuer_did, name, version),
            name: name.to_string(),
            version: version.to_string(),
            attr_names: attr_names.iter().map(|s| s.to_string()).collect(),
        })
    }

    async fn issuer_create_credential_def(
        &self,
        issuer_did: &str,
        schema: &Schema,
        tag: &str,
        support_revocation: bool,
    ) -> Result<CredentialDefinition, AnoncredsError> {
        let id = cred_def_id(issuer_did, &schema.id, tag);
        let cred_def = CredentialDefinition {
            id: id.clone(),
            schema_id: schema.id.clone(),
            issuer_did: issuer_did.to_string(),
            tag: tag.to_string(),
            support_revocation,
            verification_key: digest_hex(&format!("cred-def:{id}")),
        };
        let stored = cred_def.clone();
        self.with_state(move |state| {
            state.cred_defs.insert(id, stored);
            Ok(())
        })
        .await?;
        Ok(cred_def)
    }

    async fn issuer_create_credential_offer(
        &self,
        cred_def_id: &str,
    ) -> Result<CredentialOffer, AnoncredsError> {
        let name = self.name.clone();
        let cred_def_id = cred_def_id.to_string();
        self.with_state(move |state| {
            if !state.cred_defs.contains_key(&cred_def_id) {
                return Err(WalletError::DidNotFound(cred_def_id.clone()));
            }
            state.counter += 1;
            Ok(CredentialOffer {
                cred_def_id,
                nonce: digest_hex(&format!("nonce:{name}:{}", state.counter)),
            })
        })
        .await
        .map_err(|e| match e {
            WalletError::DidNotFound(id) => AnoncredsError::CredDefNotFound(id),
            other => AnoncredsError::Wallet(other),
        })
    }

    async fn prover_create_credential_req(
        &self,
        prover_did: &str,
        offer: &CredentialOffer,
        cred_def: &CredentialDefinition,
        master_secret_id: &str,
    ) -> Result<(CredentialRequest, CredentialRequestMetadata), AnoncredsError> {
        let known = self
            .with_state(|state| {
                Ok(state
                    .master_secrets
                    .iter()
                    .any(|s| s.as_str() == master_secret_id))
            })
            .await?;
        if !known {
            return Err(AnoncredsError::MasterSecretNotFound(
                master_secret_id.to_string(),
            ));
        }
        if offer.cred_def_id != cred_def.id {
            return Err(AnoncredsError::OfferMismatch(
                offer.cred_def_id.clone(),
                cred_def.id.clone(),
            ));
        }
        let request = CredentialRequest {
            prover_did: prover_did.to_string(),
            cred_def_id: cred_def.id.clone(),
            nonce: offer.nonce.clone(),
            blinded_secret: digest_hex(&format!("blind:{master_secret_id}:{}", offer.nonce)),
        };
        let metadata = CredentialRequestMetadata {
            master_secret_id: master_secret_id.to_string(),
            nonce: offer.nonce.clone(),
        };
        Ok((request, metadata))
    }

    async fn issuer_create_credential(
        &self,
        offer: &CredentialOffer,
        request: &CredentialRequest,
        values: CredentialValues,
    ) -> Result<Credential, AnoncredsError> {
        if offer.cred_def_id != request.cred_def_id {
            return Err(AnoncredsError::OfferMismatch(
                offer.cred_def_id.clone(),
                request.cred_def_id.clone(),
            ));
        }
        let owned = self
            .with_state(|state| Ok(state.cred_defs.contains_key(&offer.cred_def_id)))
            .await?;
        if !owned {
            return Err(AnoncredsError::CredDefNotFound(offer.cred_def_id.clone()));
        }
        let mut hasher = Sha256::new();
        hasher.update(offer.cred_def_id.as_bytes());
        hasher.update(request.blinded_secret.as_bytes());
        for (attr, value) in &values {
            hasher.update(attr.as_bytes());
            hasher.update(value.encoded.as_bytes());
        }
        Ok(Credential {
            cred_def_id: offer.cred_def_id.clone(),
            values,
            signature: hex::encode(hasher.finalize()),
        })
    }

    async fn prover_store_credential(
        &self,
        _request_metadata: &CredentialRequestMetadata,
        credential: Credential,
        cred_def: &CredentialDefinition,
    ) -> Result<String, AnoncredsError> {
        if credential.cred_def_id != cred_def.id {
            return Err(AnoncredsError::OfferMismatch(
                credential.cred_def_id.clone(),
                cred_def.id.clone(),
            ));
        }
        self.with_state(|state| {
            state.credentials.push(credential);
            Ok(format!("cred-{}", state.credentials.len()))
        })
        .await
        .map_err(AnoncredsError::Wallet)
    }

    async fn list_credentials(&self) -> Result<Vec<Credential>, AnoncredsError> {
        self.with_state(|state| Ok(state.credentials.clone()))
            .await
            .map_err(AnoncredsError::Wallet)
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    nyms: HashMap<String, NymRecord>,
    endpoints: HashMap<String, String>,
    schemas: HashMap<String, Schema>,
    cred_defs: HashMap<String, CredentialDefinition>,
}

/// In-memory verifiable-data registry.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `submitter_did` holds write authority on this ledger.
    async fn check_writer(&self, submitter_did: &str) -> Result<(), LedgerError> {
        let state = self.state.read().await;
        match state.nyms.get(submitter_did) {
            Some(record) if record.role.can_write() => Ok(()),
            Some(_) => Err(LedgerError::WriteRejected(
                submitter_did.to_string(),
                "no write authority".to_string(),
            )),
            None => Err(LedgerError::WriteRejected(
                submitter_did.to_string(),
                "unknown submitter".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn register_nym(
        &self,
        submitter_did: &str,
        target_did: &str,
        verkey: &str,
        role: NymRole,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        // The first NYM bootstraps the ledger (genesis write); all later
        // writes need an authorised submitter.
        if !state.nyms.is_empty() {
            match state.nyms.get(submitter_did) {
                Some(record) if record.role.can_write() => {}
                Some(_) => {
                    return Err(LedgerError::WriteRejected(
                        submitter_did.to_string(),
                        "no write authority".to_string(),
                    ))
                }
                None => {
                    return Err(LedgerError::WriteRejected(
                        submitter_did.to_string(),
                        "unknown submitter".to_string(),
                    ))
                }
            }
        }
        state.nyms.insert(
            target_did.to_string(),
            NymRecord {
                did: target_did.to_string(),
                verkey: verkey.to_string(),
                role,
            },
        );
        Ok(())
    }

    async fn get_nym(&self, did: &str) -> Result<NymRecord, LedgerError> {
        let state = self.state.read().await;
        state
            .nyms
            .get(did)
            .cloned()
            .ok_or_else(|| LedgerError::NymNotFound(did.to_string()))
    }

    async fn set_endpoint(&self, did: &str, endpoint: &str) -> Result<(), LedgerError> {
        let mut state = self.state.write().await;
        if !state.nyms.contains_key(did) {
            return Err(LedgerError::NymNotFound(did.to_string()));
        }
        state
            .endpoints
            .insert(did.to_string(), endpoint.to_string());
        Ok(())
    }

    async fn get_endpoint(&self, did: &str) -> Result<String, LedgerError> {
        let state = self.state.read().await;
        state
            .endpoints
            .get(did)
            .cloned()
            .ok_or_else(|| LedgerError::EndpointNotFound(did.to_string()))
    }

    async fn publish_schema(
        &self,
        submitter_did: &str,
        schema: &Schema,
    ) -> Result<(), LedgerError> {
        self.check_writer(submitter_did).await?;
        let mut state = self.state.write().await;
        if state.schemas.contains_key(&schema.id) {
            return Err(LedgerError::WriteRejected(
                submitter_did.to_string(),
                format!("schema already published: {}", schema.id),
            ));
        }
        state.schemas.insert(schema.id.clone(), schema.clone());
        Ok(())
    }

    async fn fetch_schema(&self, schema_id: &str) -> Result<Schema, LedgerError> {
        let state = self.state.read().await;
        state
            .schemas
            .get(schema_id)
            .cloned()
            .ok_or_else(|| LedgerError::SchemaNotFound(schema_id.to_string()))
    }

    async fn publish_cred_def(
        &self,
        submitter_did: &str,
        cred_def: &CredentialDefinition,
    ) -> Result<(), LedgerError> {
        self.check_writer(submitter_did).await?;
        let mut state = self.state.write().await;
        state
            .cred_defs
            .insert(cred_def.id.clone(), cred_def.clone());
        Ok(())
    }

    async fn fetch_cred_def(&self, cred_def_id: &str) -> Result<CredentialDefinition, LedgerError> {
        let state = self.state.read().await;
        state
            .cred_defs
            .get(cred_def_id)
            .cloned()
            .ok_or_else(|| LedgerError::CredDefNotFound(cred_def_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_wallet_twice() {
        let locker = MemoryLocker::new();
        let config = WalletConfig::new("agent", "key");
        locker.create_wallet(&config).await.unwrap();
        assert_eq!(
            locker.create_wallet(&config).await,
            Err(WalletError::AlreadyExists("agent".to_string()))
        );
    }

    #[tokio::test]
    async fn test_open_wallet_wrong_key() {
        let locker = MemoryLocker::new();
        locker
            .create_wallet(&WalletConfig::new("agent", "key"))
            .await
            .unwrap();
        let result = locker.open_wallet(&WalletConfig::new("agent", "wrong")).await;
        assert!(matches!(result, Err(WalletError::AccessDenied(_))));
    }

    #[tokio::test]
    async fn test_open_missing_wallet() {
        let locker = MemoryLocker::new();
        let result = locker.open_wallet(&WalletConfig::new("ghost", "key")).await;
        assert!(matches!(result, Err(WalletError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_metadata_absent_until_written() {
        let locker = MemoryLocker::new();
        let config = WalletConfig::new("agent", "key");
        locker.create_wallet(&config).await.unwrap();
        let wallet = locker.open_wallet(&config).await.unwrap();
        let (did, _) = wallet.create_and_store_did(DidInfo::default()).await.unwrap();

        assert_eq!(
            wallet.get_did_metadata(&did).await,
            Err(WalletError::NoMetadata(did.clone()))
        );
        wallet.set_did_metadata(&did, r#"{"primary":true}"#).await.unwrap();
        assert_eq!(
            wallet.get_did_metadata(&did).await.unwrap(),
            r#"{"primary":true}"#
        );
    }

    #[tokio::test]
    async fn test_seeded_did_is_deterministic() {
        let locker = MemoryLocker::new();
        let config = WalletConfig::new("agent", "key");
        locker.create_wallet(&config).await.unwrap();
        let wallet = locker.open_wallet(&config).await.unwrap();

        let seed = "000000000000000000000000Steward1";
        let (did_a, verkey_a) = wallet
            .create_and_store_did(DidInfo::from_seed(seed))
            .await
            .unwrap();
        wallet.set_did_metadata(&did_a, "{}").await.unwrap();

        // Re-deriving recovers the same identity and keeps its metadata.
        let (did_b, verkey_b) = wallet
            .create_and_store_did(DidInfo::from_seed(seed))
            .await
            .unwrap();
        assert_eq!(did_a, did_b);
        assert_eq!(verkey_a, verkey_b);
        assert_eq!(wallet.get_did_metadata(&did_b).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_ledger_genesis_then_authority() {
        let ledger = MemoryLedger::new();
        // Genesis write needs no existing authority.
        ledger
            .register_nym("did:mem:steward", "did:mem:steward", "vk0", NymRole::Steward)
            .await
            .unwrap();
        // The steward can register others.
        ledger
            .register_nym("did:mem:steward", "did:mem:agent", "vk1", NymRole::TrustAnchor)
            .await
            .unwrap();
        // A common identity cannot.
        ledger
            .register_nym("did:mem:steward", "did:mem:plain", "vk2", NymRole::Common)
            .await
            .unwrap();
        let result = ledger
            .register_nym("did:mem:plain", "did:mem:other", "vk3", NymRole::Common)
            .await;
        assert!(matches!(result, Err(LedgerError::WriteRejected(_, _))));
    }

    #[tokio::test]
    async fn test_duplicate_schema_rejected() {
        let ledger = MemoryLedger::new();
        ledger
            .register_nym("did:mem:steward", "did:mem:steward", "vk0", NymRole::Steward)
            .await
            .unwrap();
        let schema = Schema {
            id: schema_id("did:mem:steward", "Person-ID", "1.2"),
            name: "Person-ID".to_string(),
            version: "1.2".to_string(),
            attr_names: vec!["a_Name".to_string()],
        };
        ledger.publish_schema("did:mem:steward", &schema).await.unwrap();
        let result = ledger.publish_schema("did:mem:steward", &schema).await;
        assert!(matches!(result, Err(LedgerError::WriteRejected(_, _))));
    }

    #[tokio::test]
    async fn test_endpoint_requires_nym() {
        let ledger = MemoryLedger::new();
        assert_eq!(
            ledger.set_endpoint("did:mem:ghost", "10.0.0.2:8000").await,
            Err(LedgerError::NymNotFound("did:mem:ghost".to_string()))
        );
    }
}
