use std::time::Duration;

use reqwest::StatusCode;

/// Address parsing and derivation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address is not configured: {0}")]
    Unconfigured(String),

    #[error("token account owner {0} is off the ed25519 curve")]
    OwnerOffCurve(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("invalid endpoint {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

/// Ledger RPC failures
///
/// `Rpc` keeps the node's message verbatim so rejections reach the user
/// unchanged.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ledger RPC transport error: HTTP status {0}")]
    HttpStatus(StatusCode),

    #[error("ledger RPC JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ledger RPC returned an empty response")]
    EmptyResponse,

    #[error("{message}")]
    Rpc { code: i64, message: String },

    #[error("failed to decode ledger response: {0}")]
    Decode(String),
}

/// Secondary indexer failures
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("invalid indexer endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("indexer transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("indexer responded with HTTP status {0}")]
    HttpStatus(StatusCode),
}

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("wallet is not connected")]
    Disconnected,

    #[error("signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Failures building a client from its configuration
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Indexer(#[from] IndexerError),
}

/// Read-path failures; recovered inside the synchronizer, never surfaced
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Indexer(#[from] IndexerError),

    #[error("account {0} not found")]
    NotFound(String),

    #[error("account {address} could not be decoded: {reason}")]
    Decode { address: String, reason: String },
}

/// Orchestrated operation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// Rejected locally before any network call
    #[error("{0}")]
    Precondition(String),

    /// Signature declined, or request rejected by the cluster
    #[error("{0}")]
    Submission(String),

    /// Transaction landed with an error
    #[error("{0}")]
    Confirmation(String),

    #[error("transaction {signature} was not confirmed within {timeout:?}")]
    ConfirmationTimeout { signature: String, timeout: Duration },
}

impl OperationError {
    /// True when the failure was detected before touching the network
    pub fn is_precondition(&self) -> bool {
        matches!(self, OperationError::Precondition(_))
    }
}
