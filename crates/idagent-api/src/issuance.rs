//! Person-ID schema publication and self-issuance.
use crate::agent::Agent;
use crate::errors::ProvisionError;
use crate::steward::Steward;
use idagent_core::anoncreds::{
    schema_id, Anoncreds, CredentialValues, EncodedValue, Schema,
};
use idagent_core::config::UserInformation;
use idagent_core::ledger::{Ledger, LedgerError};
use idagent_core::wallet::WalletStore;
use idagent_core::{
    CREDENTIAL_DEFINITIONS_ATTRIBUTE, MASTER_SECRET_ID_ATTRIBUTE, PID_CRED_DEF_ID_ATTRIBUTE,
    SCHEMAS_ATTRIBUTE,
};
use log::{debug, info};
use serde_json::Value;

pub(crate) const PERSON_ID_SCHEMA_NAME: &str = "Person-ID";
pub(crate) const PERSON_ID_SCHEMA_VERSION: &str = "1.2";
pub(crate) const PERSON_ID_CRED_DEF_TAG: &str = "PID";
pub(crate) const PERSON_ID_ATTRIBUTES: [&str; 5] = [
    "a_Name",
    "b_Vorname",
    "c_Geburtstag",
    "d_Geburtsort",
    "e_Anschrift",
];

/// Issues the initial Person-ID credential to the endpoint DID, publishing
/// schema and credential definition under the steward's authority.
pub(crate) async fn issue_person_id_credential<S, L>(
    agent: &Agent<S, L>,
    steward: &Steward<S::Wallet>,
    endpoint_did: &str,
) -> Result<(), ProvisionError>
where
    S: WalletStore,
    S::Wallet: Anoncreds,
    L: Ledger,
{
    let schema = get_or_publish_schema(agent, steward).await?;
    agent
        .attributes
        .push(endpoint_did, SCHEMAS_ATTRIBUTE, Value::String(schema.id.clone()))
        .await?;

    let cred_def = steward
        .wallet
        .issuer_create_credential_def(&steward.did, &schema, PERSON_ID_CRED_DEF_TAG, false)
        .await?;
    agent.ledger.publish_cred_def(&steward.did, &cred_def).await?;
    agent
        .attributes
        .set(
            endpoint_did,
            PID_CRED_DEF_ID_ATTRIBUTE,
            Value::String(cred_def.id.clone()),
        )
        .await?;
    agent
        .attributes
        .push(
            endpoint_did,
            CREDENTIAL_DEFINITIONS_ATTRIBUTE,
            Value::String(cred_def.id.clone()),
        )
        .await?;

    let offer = steward
        .wallet
        .issuer_create_credential_offer(&cred_def.id)
        .await?;
    let master_secret_id = match agent
        .attributes
        .get(endpoint_did, MASTER_SECRET_ID_ATTRIBUTE)
        .await?
    {
        Some(Value::String(id)) => id,
        _ => {
            return Err(ProvisionError::MissingAttribute(
                MASTER_SECRET_ID_ATTRIBUTE.to_string(),
                endpoint_did.to_string(),
            ))
        }
    };
    let (request, request_metadata) = agent
        .wallet
        .prover_create_credential_req(endpoint_did, &offer, &cred_def, &master_secret_id)
        .await?;

    let values = person_id_values(&agent.config.user_information);
    let credential = steward
        .wallet
        .issuer_create_credential(&offer, &request, values)
        .await?;
    agent
        .wallet
        .prover_store_credential(&request_metadata, credential, &cred_def)
        .await?;

    info!("stored Person-ID credential issued under {}", cred_def.id);
    Ok(())
}

/// Fetches the Person-ID schema from the ledger, creating and publishing it
/// if absent.
async fn get_or_publish_schema<S, L>(
    agent: &Agent<S, L>,
    steward: &Steward<S::Wallet>,
) -> Result<Schema, ProvisionError>
where
    S: WalletStore,
    S::Wallet: Anoncreds,
    L: Ledger,
{
    let id = schema_id(&steward.did, PERSON_ID_SCHEMA_NAME, PERSON_ID_SCHEMA_VERSION);
    match agent.ledger.fetch_schema(&id).await {
        Ok(schema) => {
            debug!("Person-ID schema already on ledger: {id}");
            Ok(schema)
        }
        Err(LedgerError::SchemaNotFound(_)) => {
            let schema = steward
                .wallet
                .issuer_create_schema(
                    &steward.did,
                    PERSON_ID_SCHEMA_NAME,
                    PERSON_ID_SCHEMA_VERSION,
                    &PERSON_ID_ATTRIBUTES,
                )
                .await?;
            agent.ledger.publish_schema(&steward.did, &schema).await?;
            // Read back the published descriptor.
            Ok(agent.ledger.fetch_schema(&schema.id).await?)
        }
        Err(e) => Err(e.into()),
    }
}

/// Maps configured subject values onto the schema attributes, raw alongside
/// encoded.
pub(crate) fn person_id_values(user: &UserInformation) -> CredentialValues {
    let mut values = CredentialValues::new();
    values.insert("a_Name".to_string(), EncodedValue::new(user.name.clone()));
    values.insert(
        "b_Vorname".to_string(),
        EncodedValue::new(user.vorname.clone()),
    );
    values.insert(
        "c_Geburtstag".to_string(),
        EncodedValue::new(user.geburtstag.clone()),
    );
    values.insert(
        "d_Geburtsort".to_string(),
        EncodedValue::new(user.geburtsort.clone()),
    );
    values.insert(
        "e_Anschrift".to_string(),
        EncodedValue::new(user.anschrift.clone()),
    );
    values
}
