//! End-to-end provisioning tests over the in-memory backend.
use idagent_api::{Agent, ProvisionError};
use idagent_core::anoncreds::{encode, Anoncreds};
use idagent_core::config::AgentConfig;
use idagent_core::ledger::{Ledger, NymRole};
use idagent_core::memory::{MemoryLedger, MemoryLocker};
use idagent_core::wallet::{Wallet, WalletConfig, WalletError, WalletStore};
use idagent_core::{
    CREDENTIAL_DEFINITIONS_ATTRIBUTE, MASTER_SECRET_ID_ATTRIBUTE, PRIMARY_ATTRIBUTE,
    SCHEMAS_ATTRIBUTE, THEIR_ENDPOINT_DID_ATTRIBUTE,
};
use serde_json::{json, Value};
use std::sync::Arc;

async fn open_agent(
    locker: &MemoryLocker,
    ledger: &MemoryLedger,
    config: AgentConfig,
) -> Agent<MemoryLocker, MemoryLedger> {
    Agent::open(locker.clone(), ledger.clone(), config)
        .await
        .unwrap()
}

/// Counts wallet DIDs whose metadata marks them primary.
async fn count_primaries(agent: &Agent<MemoryLocker, MemoryLedger>) -> usize {
    agent
        .wallet()
        .list_dids_with_meta()
        .await
        .unwrap()
        .into_iter()
        .filter(|record| {
            record
                .metadata
                .as_deref()
                .and_then(|blob| serde_json::from_str::<Value>(blob).ok())
                .and_then(|meta| meta.get(PRIMARY_ATTRIBUTE).and_then(Value::as_bool))
                .unwrap_or(false)
        })
        .count()
}

#[tokio::test]
async fn test_endpoint_did_provisions_once() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();
    let agent = open_agent(&locker, &ledger, AgentConfig::default()).await;

    let did = agent.endpoint_did().await.unwrap();
    let again = agent.endpoint_did().await.unwrap();
    assert_eq!(did, again);
    assert_eq!(count_primaries(&agent).await, 1);

    // The endpoint DID is registered as a trust anchor with its endpoint.
    let nym = ledger.get_nym(&did).await.unwrap();
    assert_eq!(nym.role, NymRole::TrustAnchor);
    assert_eq!(
        ledger.get_endpoint(&did).await.unwrap(),
        agent.config().endpoint
    );
}

#[tokio::test]
async fn test_provision_records_attributes() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();
    let agent = open_agent(&locker, &ledger, AgentConfig::default()).await;
    let did = agent.endpoint_did().await.unwrap();

    let schemas = agent
        .attributes()
        .get(&did, SCHEMAS_ATTRIBUTE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(schemas.as_array().unwrap().len(), 1);

    let cred_defs = agent
        .attributes()
        .get(&did, CREDENTIAL_DEFINITIONS_ATTRIBUTE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cred_defs.as_array().unwrap().len(), 1);

    let master_secret = agent
        .endpoint_attribute(MASTER_SECRET_ID_ATTRIBUTE)
        .await
        .unwrap();
    assert!(matches!(master_secret, Some(Value::String(_))));
}

#[tokio::test]
async fn test_provision_stores_person_id_credential() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();
    let agent = open_agent(&locker, &ledger, AgentConfig::default()).await;
    agent.endpoint_did().await.unwrap();

    let credentials = agent.wallet().list_credentials().await.unwrap();
    assert_eq!(credentials.len(), 1);

    let credential = &credentials[0];
    assert_eq!(credential.cred_def_id, agent.pid_cred_def_id().await.unwrap());

    let user = &agent.config().user_information;
    assert_eq!(credential.values["a_Name"].raw, user.name);
    assert_eq!(credential.values["a_Name"].encoded, encode(&user.name));
    assert_eq!(
        credential.values["e_Anschrift"].encoded,
        encode(&user.anschrift)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_resolution() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();
    let agent = Arc::new(open_agent(&locker, &ledger, AgentConfig::default()).await);

    let mut handles = Vec::new();
    for _ in 0..4 {
        let agent = agent.clone();
        handles.push(tokio::spawn(async move { agent.endpoint_did().await }));
    }
    let mut dids = Vec::new();
    for handle in handles {
        dids.push(handle.await.unwrap().unwrap());
    }
    dids.dedup();
    assert_eq!(dids.len(), 1);

    // One primary, one provisioned credential: the racing callers shared a
    // single initialisation.
    assert_eq!(count_primaries(&agent).await, 1);
    assert_eq!(agent.wallet().list_credentials().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_restart_reuses_primary() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();

    let agent = open_agent(&locker, &ledger, AgentConfig::default()).await;
    let did = agent.endpoint_did().await.unwrap();
    drop(agent);

    // A fresh context over the same backend finds the existing primary
    // instead of provisioning again.
    let restarted = open_agent(&locker, &ledger, AgentConfig::default()).await;
    assert_eq!(restarted.endpoint_did().await.unwrap(), did);
    assert_eq!(count_primaries(&restarted).await, 1);
    assert_eq!(restarted.wallet().list_credentials().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_preexisting_steward_wallet_is_benign() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();
    let config = AgentConfig::default();

    locker
        .create_wallet(&WalletConfig::new(
            format!("steward-for-{}", config.wallet_name),
            config.wallet_key.clone(),
        ))
        .await
        .unwrap();

    let agent = open_agent(&locker, &ledger, config).await;
    agent.endpoint_did().await.unwrap();
    assert_eq!(count_primaries(&agent).await, 1);
}

#[tokio::test]
async fn test_second_agent_reuses_published_schema() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();

    let first = open_agent(&locker, &ledger, AgentConfig::default()).await;
    first.endpoint_did().await.unwrap();

    // Same steward seed, same ledger: the Person-ID schema is already
    // published and the second provisioning run must reuse it (a duplicate
    // publish would be rejected by the ledger).
    let config = AgentConfig {
        wallet_name: "agent-b".to_string(),
        ..AgentConfig::default()
    };
    let second = open_agent(&locker, &ledger, config).await;
    let did = second.endpoint_did().await.unwrap();
    assert_eq!(count_primaries(&second).await, 1);
    assert_ne!(did, first.endpoint_did().await.unwrap());
}

#[tokio::test]
async fn test_their_endpoint_did() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();
    let agent = open_agent(&locker, &ledger, AgentConfig::default()).await;
    let my_did = agent.endpoint_did().await.unwrap();

    let metadata = json!({ THEIR_ENDPOINT_DID_ATTRIBUTE: "did:mem:peer-endpoint" });
    agent
        .wallet()
        .create_pairwise("did:mem:peer", &my_did, &metadata.to_string())
        .await
        .unwrap();

    assert_eq!(
        agent.their_endpoint_did("did:mem:peer").await.unwrap(),
        "did:mem:peer-endpoint"
    );

    let missing = agent.their_endpoint_did("did:mem:stranger").await;
    assert!(matches!(
        missing,
        Err(ProvisionError::Wallet(WalletError::NoPairwise(_)))
    ));
}

#[tokio::test]
async fn test_endpoint_attribute_roundtrip() {
    let locker = MemoryLocker::new();
    let ledger = MemoryLedger::new();
    let agent = open_agent(&locker, &ledger, AgentConfig::default()).await;

    assert_eq!(agent.endpoint_attribute("note").await.unwrap(), None);
    agent
        .set_endpoint_attribute("note", json!("hello"))
        .await
        .unwrap();
    assert_eq!(
        agent.endpoint_attribute("note").await.unwrap(),
        Some(json!("hello"))
    );

    agent
        .push_endpoint_attribute("peers", json!("did:mem:peer"))
        .await
        .unwrap();
    assert_eq!(
        agent.endpoint_attribute("peers").await.unwrap(),
        Some(json!(["did:mem:peer"]))
    );
}
