use std::fmt;

use anchor_lang::prelude::*;

// ============================================================================
// Program Accounts
// ============================================================================

/// Registered device record
/// Address: fresh keypair generated at registration, never reused
#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct NodeDevice {
    /// Only signer allowed to update or deregister the node
    pub authority: Pubkey,

    /// Device endpoint
    pub uri: String,
}

impl NodeDevice {
    /// Account discriminator (8) + authority (32) + uri length prefix (4) + uri bytes
    pub fn size(&self) -> usize {
        8 + 32 + 4 + self.uri.len()
    }
}

/// Network-wide counters
/// PDA seeds: [b"network-stats"]
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Live node count
    pub total_nodes: u64,
}

// ============================================================================
// Client View
// ============================================================================

/// One of the connected user's nodes, as rendered in the list view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeView {
    pub address: Pubkey,
    pub authority: Pubkey,
    pub uri: String,
}

impl NodeView {
    pub fn from_account(address: Pubkey, node: NodeDevice) -> Self {
        Self {
            address,
            authority: node.authority,
            uri: node.uri,
        }
    }
}

/// Everything the view layer renders. Rebuilt on every sync, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub identity: Option<Pubkey>,
    pub stats: Option<NetworkStats>,
    pub nodes: Vec<NodeView>,
}

impl ViewState {
    pub fn node(&self, address: &Pubkey) -> Option<&NodeView> {
        self.nodes.iter().find(|node| &node.address == address)
    }

    pub fn stats_readout(&self) -> StatsReadout<'_> {
        StatsReadout(self.stats.as_ref())
    }
}

/// Text of the stats banner
pub struct StatsReadout<'a>(Option<&'a NetworkStats>);

impl fmt::Display for StatsReadout<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(stats) => write!(f, "Total Devices Registered: {}", stats.total_nodes),
            None => f.write_str("Loading Network Stats..."),
        }
    }
}
