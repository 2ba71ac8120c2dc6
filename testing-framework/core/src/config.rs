use std::{env, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::retry::RetryPolicy;

pub const CONFIG_ENV: &str = "DEVNODE_CONFIG";

const DEFAULT_SCENARIO_TIMEOUT: Duration = Duration::from_secs(50);
const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(500);
const DEFAULT_SIGNER_URI: &str = "//Alice";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Harness-wide tunables, loadable from YAML. Every field has a default so a
/// partial file only overrides what it names.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub scenario_timeout: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub spawn_timeout: Duration,
    pub signer_uri: String,
    /// Used while waiting for a freshly connected node to answer.
    pub readiness: RetryPolicy,
    /// Used while waiting for Ethereum receipts to become queryable.
    pub receipt_settling: RetryPolicy,
    pub ethereum: EthereumConfig,
    pub debug_ports: PortSet,
    pub forked_ports: PortSet,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            scenario_timeout: DEFAULT_SCENARIO_TIMEOUT,
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
            signer_uri: DEFAULT_SIGNER_URI.to_owned(),
            readiness: RetryPolicy::new(
                Duration::from_millis(100),
                Duration::from_secs(2),
                Duration::from_secs(30),
            ),
            receipt_settling: RetryPolicy::new(
                Duration::from_millis(2),
                Duration::from_millis(200),
                Duration::from_secs(5),
            ),
            ethereum: EthereumConfig::default(),
            debug_ports: PortSet {
                p2p: 19931,
                rpc: 19932,
                ws: 19933,
            },
            forked_ports: PortSet {
                p2p: 30333,
                rpc: 9933,
                ws: 9944,
            },
        }
    }
}

impl HarnessConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Loads the file named by `DEVNODE_CONFIG`, or the defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_yaml_file(path),
            Err(_) => Ok(Self::default()),
        }
    }
}

/// Where the Ethereum bridge pallet reports an applied raw transaction, and
/// which RPC methods carry raw transactions and their receipts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EthereumConfig {
    pub pallet: String,
    pub executed_event: String,
    /// Positional field of the executed event holding the transaction hash.
    pub hash_field: usize,
    pub send_raw_method: String,
    pub receipt_method: String,
}

impl Default for EthereumConfig {
    fn default() -> Self {
        Self {
            pallet: "Ethereum".to_owned(),
            executed_event: "Executed".to_owned(),
            hash_field: 2,
            send_raw_method: devnode_rpc_client::ETH_SEND_RAW_TRANSACTION.to_owned(),
            receipt_method: devnode_rpc_client::ETH_GET_TRANSACTION_RECEIPT.to_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSet {
    pub p2p: u16,
    pub rpc: u16,
    pub ws: u16,
}
