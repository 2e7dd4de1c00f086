use anchor_lang::prelude::Pubkey;
use solana_sdk::signature::Signature;
use tokio::sync::broadcast;

use crate::orchestrator::OperationKind;

/// Capacity of the client event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Triggers for view resynchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    WalletConnected {
        identity: Pubkey,
    },
    WalletDisconnected,
    /// Emitted once an orchestrated operation reached confirmation
    OperationCompleted {
        kind: OperationKind,
        node: Pubkey,
        signature: Signature,
    },
}

pub fn channel() -> (broadcast::Sender<RegistryEvent>, broadcast::Receiver<RegistryEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}
