//! Per-DID attribute store over opaque wallet metadata.
//!
//! The wallet persists one metadata blob per DID and offers no partial
//! update, so every mutation is a read-modify-write of the whole blob. The
//! store serialises that cycle behind a per-DID async mutex: without it,
//! two concurrent writers to the same DID would race and the later write
//! would silently drop the earlier one.
use crate::wallet::{Wallet, WalletError};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Key-value attribute store keyed by DID.
pub struct DidAttributeStore<W> {
    wallet: Arc<W>,
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<W: Wallet> DidAttributeStore<W> {
    pub fn new(wallet: Arc<W>) -> Self {
        Self {
            wallet,
            locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Returns the write lock for a DID, creating it on first use.
    fn lock_for(&self, did: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("attribute lock map poisoned");
        locks.entry(did.to_string()).or_default().clone()
    }

    /// Returns the named attribute, or `None` if it was never set.
    ///
    /// Fails with [`WalletError::NoMetadata`] if the DID has no metadata
    /// blob at all.
    pub async fn get(&self, did: &str, attribute: &str) -> Result<Option<Value>, WalletError> {
        let metadata = self.read(did).await?;
        Ok(metadata.get(attribute).cloned())
    }

    /// Overwrites the named attribute with `value`.
    pub async fn set(&self, did: &str, attribute: &str, value: Value) -> Result<(), WalletError> {
        let lock = self.lock_for(did);
        let _guard = lock.lock().await;
        let mut metadata = self.read(did).await?;
        metadata.insert(attribute.to_string(), value);
        self.write(did, &metadata).await
    }

    /// Appends `item` to the named list attribute, initialising the list if
    /// the attribute is absent.
    pub async fn push(&self, did: &str, attribute: &str, item: Value) -> Result<(), WalletError> {
        let lock = self.lock_for(did);
        let _guard = lock.lock().await;
        let mut metadata = self.read(did).await?;
        let entry = metadata
            .entry(attribute.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry.as_array_mut() {
            Some(items) => items.push(item),
            None => {
                return Err(WalletError::MalformedMetadata(
                    did.to_string(),
                    format!("attribute {attribute} is not a list"),
                ))
            }
        }
        self.write(did, &metadata).await
    }

    async fn read(&self, did: &str) -> Result<Map<String, Value>, WalletError> {
        let blob = self.wallet.get_did_metadata(did).await?;
        serde_json::from_str(&blob)
            .map_err(|e| WalletError::MalformedMetadata(did.to_string(), e.to_string()))
    }

    async fn write(&self, did: &str, metadata: &Map<String, Value>) -> Result<(), WalletError> {
        let blob = serde_json::to_string(metadata)
            .map_err(|e| WalletError::MalformedMetadata(did.to_string(), e.to_string()))?;
        self.wallet.set_did_metadata(did, &blob).await
    }
}
