//! Deployment configuration
//!
//! Everything is read from `AETHERNET_*` environment variables with
//! devnet defaults; tests and embedders build [`ClientConfig`] directly.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use reqwest::Url;
use solana_sdk::signature::Signature;

use crate::constants::*;
use crate::errors::{AddressError, ConfigError};
use crate::pda::parse_address;
use crate::rpc::Commitment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    Devnet,
    Testnet,
    MainnetBeta,
    Localnet,
}

impl Cluster {
    /// Public RPC endpoint of the cluster
    pub fn endpoint(&self) -> &'static str {
        match self {
            Cluster::Devnet => "https://api.devnet.solana.com",
            Cluster::Testnet => "https://api.testnet.solana.com",
            Cluster::MainnetBeta => "https://api.mainnet-beta.solana.com",
            Cluster::Localnet => "http://127.0.0.1:8899",
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Cluster::Devnet => "devnet",
            Cluster::Testnet => "testnet",
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Localnet => "localnet",
        })
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::MainnetBeta),
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            other => Err(format!("unknown cluster `{other}`")),
        }
    }
}

/// Where the user's node list is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStrategy {
    /// Scan program accounts on the ledger
    Direct,
    /// Query the secondary indexer at this base URL
    Indexed(Url),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub cluster: Cluster,
    pub rpc_url: Url,
    pub program_id: Pubkey,
    /// Raw staking mint; validated per operation so a placeholder is
    /// reported to the user instead of failing at startup
    pub mint: String,
    pub read_strategy: ReadStrategy,
    pub commitment: Commitment,
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl ClientConfig {
    /// Defaults for `cluster`: its public endpoint, the built-in program and
    /// mint, direct ledger reads
    pub fn for_cluster(cluster: Cluster) -> Self {
        Self {
            cluster,
            rpc_url: parse_url(cluster.endpoint()).expect("cluster endpoints are valid URLs"),
            program_id: crate::ID,
            mint: DEFAULT_MINT.to_string(),
            read_strategy: ReadStrategy::Direct,
            commitment: Commitment::Confirmed,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from any variable source; unset and blank values take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let cluster = match get(CLUSTER_ENV) {
            Some(value) => Cluster::from_str(&value).map_err(|reason| ConfigError::InvalidVar {
                var: CLUSTER_ENV,
                reason,
            })?,
            None => Cluster::Devnet,
        };
        let mut config = Self::for_cluster(cluster);

        if let Some(value) = get(RPC_URL_ENV) {
            config.rpc_url = parse_url(&value)?;
        }
        if let Some(value) = get(PROGRAM_ID_ENV) {
            config.program_id = parse_address(&value).map_err(|err| ConfigError::InvalidVar {
                var: PROGRAM_ID_ENV,
                reason: err.to_string(),
            })?;
        }
        if let Some(value) = get(MINT_ENV) {
            config.mint = value.trim().to_string();
        }

        let indexer = get(INDEXER_URL_ENV);
        config.read_strategy = match get(READ_STRATEGY_ENV).as_deref().map(str::trim) {
            Some("direct") => ReadStrategy::Direct,
            Some("indexed") => ReadStrategy::Indexed(parse_url(
                indexer.as_deref().unwrap_or(DEFAULT_INDEXER_URL),
            )?),
            Some(other) => {
                return Err(ConfigError::InvalidVar {
                    var: READ_STRATEGY_ENV,
                    reason: format!("expected `direct` or `indexed`, got `{other}`"),
                })
            }
            None => match indexer {
                Some(url) => ReadStrategy::Indexed(parse_url(&url)?),
                None => ReadStrategy::Direct,
            },
        };

        if let Some(value) = get(COMMITMENT_ENV) {
            config.commitment =
                Commitment::from_str(&value).map_err(|reason| ConfigError::InvalidVar {
                    var: COMMITMENT_ENV,
                    reason,
                })?;
        }
        if let Some(value) = get(CONFIRM_TIMEOUT_ENV) {
            config.confirm_timeout = parse_secs(CONFIRM_TIMEOUT_ENV, &value)?;
        }
        if let Some(value) = get(HTTP_TIMEOUT_ENV) {
            config.http_timeout = parse_secs(HTTP_TIMEOUT_ENV, &value)?;
        }

        Ok(config)
    }

    /// Staking mint, rejecting unset or placeholder values
    pub fn mint(&self) -> Result<Pubkey, AddressError> {
        parse_address(&self.mint)
    }

    /// Block explorer link for a transaction
    pub fn explorer_url(&self, signature: &Signature) -> String {
        let base = format!("https://explorer.solana.com/tx/{signature}");
        match self.cluster {
            Cluster::MainnetBeta => base,
            Cluster::Devnet | Cluster::Testnet => format!("{base}?cluster={}", self.cluster),
            Cluster::Localnet => {
                let endpoint = self.rpc_url.as_str().trim_end_matches('/');
                let encoded: String = url::form_urlencoded::byte_serialize(endpoint.as_bytes()).collect();
                format!("{base}?cluster=custom&customUrl={encoded}")
            }
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_cluster(Cluster::Devnet)
    }
}

fn parse_url(value: &str) -> Result<Url, ConfigError> {
    Url::parse(value.trim()).map_err(|err| ConfigError::InvalidEndpoint {
        url: value.to_string(),
        reason: err.to_string(),
    })
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidVar {
            var,
            reason: format!("expected a positive number of seconds, got `{value}`"),
        }),
    }
}
