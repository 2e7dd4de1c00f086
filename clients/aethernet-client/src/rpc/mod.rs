//! Ledger access
//!
//! [`Ledger`] is the seam between the client and a cluster: the orchestrator
//! submits and confirms through it, the synchronizer reads through it.
//! [`RpcLedger`] talks JSON-RPC to a real node.

pub mod client;
pub mod dto;

use std::fmt;
use std::str::FromStr;

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{account::Account, hash::Hash, signature::Signature, transaction::Transaction};

use crate::errors::LedgerError;

pub use client::RpcLedger;

/// Settlement level, weakest first
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Commitment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "processed" => Ok(Commitment::Processed),
            "confirmed" => Ok(Commitment::Confirmed),
            "finalized" => Ok(Commitment::Finalized),
            other => Err(format!("unknown commitment level `{other}`")),
        }
    }
}

/// Status of a submitted transaction as last reported by the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    /// Highest level reached, `None` while only seen by the leader
    pub confirmation: Option<Commitment>,
    /// Execution error, if the transaction landed but failed
    pub err: Option<String>,
}

impl SignatureStatus {
    pub fn reached(&self, target: Commitment) -> bool {
        self.confirmation.is_some_and(|level| level >= target)
    }
}

/// Server-side filter for program account scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Account data at `offset` starts with `bytes`
    Memcmp { offset: usize, bytes: Vec<u8> },
}

impl AccountFilter {
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            AccountFilter::Memcmp { offset, bytes } => data
                .get(*offset..offset + bytes.len())
                .is_some_and(|window| window == bytes.as_slice()),
        }
    }
}

#[async_trait]
pub trait Ledger: Send + Sync {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError>;

    /// Broadcast a fully signed transaction
    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, LedgerError>;

    /// `None` when the cluster has not seen the signature (yet)
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, LedgerError>;

    /// `None` when the account does not exist
    async fn account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError>;

    /// Accounts in request order, `None` for missing ones
    async fn multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, LedgerError>;

    /// Addresses of accounts owned by `program_id` passing every filter
    async fn program_account_keys(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<Pubkey>, LedgerError>;
}
