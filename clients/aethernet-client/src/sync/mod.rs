//! View synchronization
//!
//! Keeps [`ViewState`] in line with the backend. Stats always come from the
//! ledger; the node list comes from whichever [`NodeSource`] the deployment
//! selected. Resyncs are event-driven (wallet connect, completed operations),
//! there is no polling, and read failures reset the affected part of the view
//! instead of propagating.

pub mod direct;
pub mod indexer;

use std::sync::Arc;

use anchor_lang::prelude::Pubkey;
use anchor_lang::AccountDeserialize;
use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::config::{ClientConfig, ReadStrategy};
use crate::errors::{IndexerError, SyncError};
use crate::events::RegistryEvent;
use crate::pda::ProgramAddresses;
use crate::rpc::Ledger;
use crate::state::{NetworkStats, NodeView, ViewState};

pub use direct::DirectScan;
pub use indexer::{filter_indexed_nodes, IndexedNode, IndexerSource};

/// A read path producing the connected user's node views
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Zero matches is an empty list, not an error
    async fn fetch_user_records(&self, identity: &Pubkey) -> Result<Vec<NodeView>, SyncError>;
}

/// Node source for the configured read strategy
pub fn source_from_config(
    config: &ClientConfig,
    ledger: Arc<dyn Ledger>,
) -> Result<Box<dyn NodeSource>, IndexerError> {
    Ok(match &config.read_strategy {
        ReadStrategy::Direct => Box::new(DirectScan::new(ledger, config.program_id)),
        ReadStrategy::Indexed(url) => Box::new(IndexerSource::new(url, config.http_timeout)?),
    })
}

pub struct ViewSynchronizer {
    ledger: Arc<dyn Ledger>,
    source: Box<dyn NodeSource>,
    addresses: ProgramAddresses,
    state: ViewState,
}

impl ViewSynchronizer {
    pub fn new(ledger: Arc<dyn Ledger>, source: Box<dyn NodeSource>, program_id: Pubkey) -> Self {
        Self {
            ledger,
            source,
            addresses: ProgramAddresses::new(program_id),
            state: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn identity(&self) -> Option<Pubkey> {
        self.state.identity
    }

    /// Refresh the stats readout; clears it when the read fails
    pub async fn sync_network_stats(&mut self) {
        match self.fetch_network_stats().await {
            Ok(stats) => {
                debug!(total_nodes = stats.total_nodes, "network stats synced");
                self.state.stats = Some(stats);
            }
            Err(err) => {
                error!(%err, "failed to fetch network stats");
                self.state.stats = None;
            }
        }
    }

    /// Refresh the node list for the connected identity; clears it when the
    /// read fails or nobody is connected
    pub async fn sync_user_nodes(&mut self) {
        let Some(identity) = self.state.identity else {
            self.state.nodes.clear();
            return;
        };
        match self.source.fetch_user_records(&identity).await {
            Ok(nodes) => {
                debug!(%identity, count = nodes.len(), "user nodes synced");
                self.state.nodes = nodes;
            }
            Err(err) => {
                error!(%identity, %err, "failed to fetch user nodes");
                self.state.nodes.clear();
            }
        }
    }

    /// Stats and node list together
    pub async fn sync_all(&mut self) {
        self.sync_network_stats().await;
        self.sync_user_nodes().await;
    }

    pub async fn handle_event(&mut self, event: &RegistryEvent) {
        match event {
            RegistryEvent::WalletConnected { identity } => {
                info!(%identity, "syncing view for connected wallet");
                self.state.identity = Some(*identity);
                self.sync_all().await;
            }
            RegistryEvent::WalletDisconnected => {
                self.state = ViewState::default();
            }
            RegistryEvent::OperationCompleted {
                kind, signature, ..
            } => {
                debug!(operation = %kind, %signature, "resyncing after operation");
                self.sync_all().await;
            }
        }
    }

    /// Apply every event already queued on `events` without waiting
    pub async fn drain(&mut self, events: &mut broadcast::Receiver<RegistryEvent>) {
        loop {
            match events.try_recv() {
                Ok(event) => self.handle_event(&event).await,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event queue overflowed, resyncing");
                    self.sync_all().await;
                }
                Err(_) => break,
            }
        }
    }

    /// Follow `events` until every sender is gone
    pub async fn run(mut self, mut events: broadcast::Receiver<RegistryEvent>) -> ViewState {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(&event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event queue overflowed, resyncing");
                    self.sync_all().await;
                }
                Err(RecvError::Closed) => return self.state,
            }
        }
    }

    async fn fetch_network_stats(&self) -> Result<NetworkStats, SyncError> {
        let address = self.addresses.network_stats();
        let account = self
            .ledger
            .account(&address)
            .await?
            .ok_or_else(|| SyncError::NotFound(address.to_string()))?;
        NetworkStats::try_deserialize(&mut account.data.as_slice()).map_err(|err| {
            SyncError::Decode {
                address: address.to_string(),
                reason: err.to_string(),
            }
        })
    }
}
