//! Interactive surface
//!
//! What a front end binds to: a registration form, the list of the user's
//! nodes with deregister and edit actions, and the stats banner. The
//! orchestrator binding only exists while a wallet is connected and is
//! rebuilt whenever the wallet changes.

use std::sync::Arc;

use anchor_lang::prelude::Pubkey;
use tokio::sync::broadcast;
use tracing::info;

use crate::config::ClientConfig;
use crate::errors::{ClientError, IndexerError};
use crate::events::{self, RegistryEvent};
use crate::orchestrator::{
    Operation, OperationFailure, OperationKind, Orchestrator, Receipt, WALLET_UNAVAILABLE,
};
use crate::rpc::{Ledger, RpcLedger};
use crate::state::{NodeView, ViewState};
use crate::sync::{source_from_config, NodeSource, ViewSynchronizer};
use crate::wallet::Wallet;

/// Pending URI edit for one listed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub node: Pubkey,
    pub new_uri: String,
}

pub struct Dashboard {
    config: Arc<ClientConfig>,
    ledger: Arc<dyn Ledger>,
    events: broadcast::Sender<RegistryEvent>,
    subscription: broadcast::Receiver<RegistryEvent>,
    sync: ViewSynchronizer,
    binding: Option<Orchestrator>,
    register_uri: String,
    editing: Option<EditDraft>,
    last_error: Option<String>,
    last_notice: Option<String>,
    last_receipt: Option<Receipt>,
}

impl Dashboard {
    /// Dashboard reading nodes through the configured strategy
    pub fn new(config: ClientConfig, ledger: Arc<dyn Ledger>) -> Result<Self, IndexerError> {
        let source = source_from_config(&config, Arc::clone(&ledger))?;
        Ok(Self::with_source(config, ledger, source))
    }

    /// Dashboard talking JSON-RPC to the configured endpoint
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let ledger: Arc<dyn Ledger> = Arc::new(RpcLedger::from_config(&config)?);
        info!(rpc = %config.rpc_url, cluster = %config.cluster, "dashboard ready");
        Ok(Self::new(config, ledger)?)
    }

    /// [`Dashboard::from_config`] with `AETHERNET_*` settings
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_config(ClientConfig::from_env()?)
    }

    pub fn with_source(
        config: ClientConfig,
        ledger: Arc<dyn Ledger>,
        source: Box<dyn NodeSource>,
    ) -> Self {
        let (events, subscription) = events::channel();
        let sync = ViewSynchronizer::new(Arc::clone(&ledger), source, config.program_id);
        Self {
            config: Arc::new(config),
            ledger,
            events,
            subscription,
            sync,
            binding: None,
            register_uri: String::new(),
            editing: None,
            last_error: None,
            last_notice: None,
            last_receipt: None,
        }
    }

    /// Additional subscription to everything the dashboard publishes
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Wallet
    // ========================================================================

    pub async fn connect(&mut self, wallet: Arc<dyn Wallet>) {
        let Some(identity) = wallet.identity() else {
            self.disconnect().await;
            return;
        };
        info!(%identity, "binding wallet");
        self.binding = Some(Orchestrator::new(
            Arc::clone(&self.ledger),
            wallet,
            Arc::clone(&self.config),
            self.events.clone(),
        ));
        self.editing = None;
        self.publish(RegistryEvent::WalletConnected { identity }).await;
    }

    pub async fn disconnect(&mut self) {
        self.binding = None;
        self.register_uri.clear();
        self.editing = None;
        self.publish(RegistryEvent::WalletDisconnected).await;
    }

    pub fn is_connected(&self) -> bool {
        self.binding.is_some()
    }

    // ========================================================================
    // Register form
    // ========================================================================

    pub fn register_uri(&self) -> &str {
        &self.register_uri
    }

    pub fn set_register_uri(&mut self, uri: impl Into<String>) {
        self.register_uri = uri.into();
    }

    /// Register the URI in the form; the form clears on success
    pub async fn submit_register(&mut self) -> Result<Receipt, OperationFailure> {
        let uri = self.register_uri.clone();
        let receipt = self.run(Operation::Register { uri }).await?;
        self.register_uri.clear();
        Ok(receipt)
    }

    // ========================================================================
    // Node list
    // ========================================================================

    pub async fn deregister(&mut self, node: Pubkey) -> Result<Receipt, OperationFailure> {
        let receipt = self.run(Operation::Deregister { node }).await?;
        if self.editing.as_ref().is_some_and(|draft| draft.node == node) {
            self.editing = None;
        }
        Ok(receipt)
    }

    /// Open the edit field for `node`, prefilled with its current URI
    pub fn begin_edit(&mut self, node: Pubkey) {
        let new_uri = self
            .sync
            .state()
            .node(&node)
            .map(|view| view.uri.clone())
            .unwrap_or_default();
        self.editing = Some(EditDraft { node, new_uri });
    }

    pub fn set_edit_uri(&mut self, uri: impl Into<String>) {
        if let Some(draft) = self.editing.as_mut() {
            draft.new_uri = uri.into();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn editing(&self) -> Option<&EditDraft> {
        self.editing.as_ref()
    }

    /// Submit the open edit; the edit field closes on success
    pub async fn submit_update_uri(&mut self) -> Result<Receipt, OperationFailure> {
        let Some(draft) = self.editing.clone() else {
            let failure =
                OperationFailure::precondition(OperationKind::UpdateUri, "No node is being edited.");
            self.last_error = Some(failure.user_message());
            return Err(failure);
        };
        let receipt = self
            .run(Operation::UpdateUri {
                node: draft.node,
                new_uri: draft.new_uri,
            })
            .await?;
        self.editing = None;
        Ok(receipt)
    }

    // ========================================================================
    // Readouts
    // ========================================================================

    pub fn view(&self) -> &ViewState {
        self.sync.state()
    }

    pub fn nodes(&self) -> &[NodeView] {
        &self.sync.state().nodes
    }

    pub fn stats_readout(&self) -> String {
        self.sync.state().stats_readout().to_string()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_notice(&self) -> Option<&str> {
        self.last_notice.as_deref()
    }

    pub fn last_receipt(&self) -> Option<&Receipt> {
        self.last_receipt.as_ref()
    }

    /// Re-read stats and nodes without waiting for an event
    pub async fn refresh(&mut self) {
        self.sync.sync_all().await;
    }

    async fn run(&mut self, operation: Operation) -> Result<Receipt, OperationFailure> {
        let kind = operation.kind();
        self.last_error = None;
        self.last_notice = None;

        let result = match &self.binding {
            Some(binding) => binding.execute(operation).await,
            None => Err(OperationFailure::precondition(kind, WALLET_UNAVAILABLE)),
        };

        match &result {
            Ok(receipt) => {
                self.last_notice = Some(kind.success_message().to_string());
                self.last_receipt = Some(receipt.clone());
            }
            Err(failure) => self.last_error = Some(failure.user_message()),
        }

        // Completion events queued by the orchestrator drive the resync
        self.sync.drain(&mut self.subscription).await;
        result
    }

    async fn publish(&mut self, event: RegistryEvent) {
        // `subscription` keeps the channel open, so this cannot fail
        let _ = self.events.send(event);
        self.sync.drain(&mut self.subscription).await;
    }
}
