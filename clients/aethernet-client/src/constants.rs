use std::time::Duration;

/// PDA seed of the network statistics singleton
pub const NETWORK_STATS_SEED: &[u8] = b"network-stats";

/// PDA seed of the staking vault
pub const VAULT_SEED: &[u8] = b"vault";

/// Default staking mint
pub const DEFAULT_MINT: &str = "GaTsDjWX53ucB89D2J2m1ZyAHXuQfNurbMyuxBexCR9Y";

/// Value shipped in templates before a deployment sets its mint
pub const MINT_PLACEHOLDER: &str = "YOUR_TOKEN_MINT_ADDRESS_HERE";

/// Byte offset of `NodeDevice::authority` (after the 8-byte discriminator)
pub const NODE_AUTHORITY_OFFSET: usize = 8;

/// Default secondary indexer endpoint
pub const DEFAULT_INDEXER_URL: &str = "http://127.0.0.1:8081";

/// Indexer route returning every known node
pub const INDEXER_NODES_PATH: &str = "nodes";

/// Upper bound on the confirmation wait
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Delay between signature status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-request HTTP timeout for RPC and indexer calls
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Environment
// ============================================================================

pub const CLUSTER_ENV: &str = "AETHERNET_CLUSTER";
pub const RPC_URL_ENV: &str = "AETHERNET_RPC_URL";
pub const PROGRAM_ID_ENV: &str = "AETHERNET_PROGRAM_ID";
pub const MINT_ENV: &str = "AETHERNET_MINT";
pub const INDEXER_URL_ENV: &str = "AETHERNET_INDEXER_URL";
pub const READ_STRATEGY_ENV: &str = "AETHERNET_READ_STRATEGY";
pub const COMMITMENT_ENV: &str = "AETHERNET_COMMITMENT";
pub const CONFIRM_TIMEOUT_ENV: &str = "AETHERNET_CONFIRM_TIMEOUT_SECS";
pub const HTTP_TIMEOUT_ENV: &str = "AETHERNET_HTTP_TIMEOUT_SECS";
