//! Aethernet client
//!
//! Stakes tokens to register devices ("nodes") with the Aethernet registry
//! program, manages the caller's own nodes and keeps a local view of the
//! network in sync with the ledger or a secondary indexer.
//!
//! Layers, leaves first:
//! - [`pda`] derives the program-owned addresses every request needs
//! - [`orchestrator`] builds, submits and confirms one atomic request per action
//! - [`sync`] reconciles ledger or indexer reads into [`state::ViewState`]
//!
//! [`dashboard::Dashboard`] ties them to a wallet for an interactive surface.

use anchor_lang::prelude::*;

pub mod config;
pub mod constants;
pub mod dashboard;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod orchestrator;
pub mod pda;
pub mod rpc;
pub mod state;
pub mod sync;
pub mod wallet;

declare_id!("3je23jfTQJBkYTYhLCBjH2F9thAcaY9g7M7RYR92uhWu");

pub use config::{ClientConfig, Cluster, ReadStrategy};
pub use dashboard::{Dashboard, EditDraft};
pub use errors::{
    AddressError, ClientError, ConfigError, IndexerError, LedgerError, OperationError, SyncError,
    WalletError,
};
pub use events::RegistryEvent;
pub use orchestrator::{
    Operation, OperationFailure, OperationKind, OperationPhase, Orchestrator, Receipt,
};
pub use pda::ProgramAddresses;
pub use rpc::{Commitment, Ledger, RpcLedger};
pub use state::{NetworkStats, NodeDevice, NodeView, ViewState};
pub use sync::{DirectScan, IndexerSource, NodeSource, ViewSynchronizer};
pub use wallet::{KeypairWallet, Wallet};
