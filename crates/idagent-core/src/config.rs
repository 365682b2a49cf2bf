//! Agent configuration.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use toml;

/// An error relating to configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Static configuration consumed at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    /// Name of the agent wallet.
    pub wallet_name: String,
    /// Opening key for the agent wallet (and the derived steward wallet).
    pub wallet_key: String,
    /// Service endpoint written to the ledger for the endpoint DID.
    pub endpoint: String,
    /// Deterministic seed recovering the steward identity.
    pub steward_seed: String,
    /// Subject values for the self-issued Person-ID credential.
    pub user_information: UserInformation,
}

/// Literal subject values for the Person-ID credential.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInformation {
    pub name: String,
    pub vorname: String,
    pub geburtstag: String,
    pub geburtsort: String,
    pub anschrift: String,
}

/// Wrapper struct for parsing the `agent` table.
#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Config {
    /// Agent configuration data.
    agent: AgentConfig,
}

/// Parses and returns agent configuration.
pub fn parse_toml(toml_str: &str) -> Result<AgentConfig, ConfigError> {
    Ok(toml::from_str::<Config>(toml_str)?.agent)
}

impl AgentConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        parse_toml(&fs::read_to_string(path)?)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            wallet_name: "agent".to_string(),
            wallet_key: "agent-key".to_string(),
            endpoint: "127.0.0.1:8000".to_string(),
            steward_seed: "000000000000000000000000Steward1".to_string(),
            user_information: UserInformation {
                name: "Mustermann".to_string(),
                vorname: "Max".to_string(),
                geburtstag: "01.01.1970".to_string(),
                geburtsort: "Berlin".to_string(),
                anschrift: "Musterstrasse 1, 10115 Berlin".to_string(),
            },
        }
    }
}
