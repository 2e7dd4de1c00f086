//! Operation orchestration
//!
//! Every user action runs through the same phases:
//!
//! `Idle -> Validating -> Building -> Submitted -> Confirming -> Succeeded | Failed`
//!
//! Validation failures never touch the network. Everything the program does
//! for one action (record change, stats update, stake movement) goes out in a
//! single transaction, so the cluster applies all of it or none of it; the
//! orchestrator never issues compensating requests and keeps nothing from a
//! failed run.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use anchor_lang::prelude::Pubkey;
use solana_sdk::{
    message::Message,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::errors::{AddressError, OperationError};
use crate::events::RegistryEvent;
use crate::instructions::{
    DeregisterNodeAccounts, NodeRequest, RegisterNode, RegisterNodeAccounts, UpdateUri,
    UpdateUriAccounts,
};
use crate::pda::ProgramAddresses;
use crate::rpc::Ledger;
use crate::wallet::Wallet;

pub(crate) const WALLET_UNAVAILABLE: &str = "Wallet is not connected or program is not available.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Register,
    Deregister,
    UpdateUri,
}

impl OperationKind {
    /// Prefix of user-facing failure messages
    pub fn failure_prefix(&self) -> &'static str {
        match self {
            OperationKind::Register => "Registration failed",
            OperationKind::Deregister => "Deregistration failed",
            OperationKind::UpdateUri => "URI update failed",
        }
    }

    pub fn success_message(&self) -> &'static str {
        match self {
            OperationKind::Register => "Node registered successfully!",
            OperationKind::Deregister => "Node deregistered successfully!",
            OperationKind::UpdateUri => "Node URI updated successfully!",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Register => "register",
            OperationKind::Deregister => "deregister",
            OperationKind::UpdateUri => "update-uri",
        })
    }
}

/// A user action with its inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Register { uri: String },
    Deregister { node: Pubkey },
    UpdateUri { node: Pubkey, new_uri: String },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Register { .. } => OperationKind::Register,
            Operation::Deregister { .. } => OperationKind::Deregister,
            Operation::UpdateUri { .. } => OperationKind::UpdateUri,
        }
    }

    fn in_flight_key(&self) -> InFlightKey {
        match self {
            Operation::Register { uri } => InFlightKey::Register(uri.trim().to_string()),
            Operation::Deregister { node } | Operation::UpdateUri { node, .. } => {
                InFlightKey::Node(*node)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    Idle,
    Validating,
    Building,
    Submitted,
    Confirming,
    Succeeded,
    Failed,
}

/// Result of a confirmed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub kind: OperationKind,
    /// Record the operation acted on (the new record for a registration)
    pub node: Pubkey,
    pub signature: Signature,
    pub explorer_url: String,
    pub phases: Vec<OperationPhase>,
}

/// A failed run; the orchestrator is back to idle and holds nothing from it
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} failed: {error}")]
pub struct OperationFailure {
    pub kind: OperationKind,
    pub error: OperationError,
    pub phases: Vec<OperationPhase>,
}

impl OperationFailure {
    /// Failure detected before an orchestrator was involved
    pub(crate) fn precondition(kind: OperationKind, message: &str) -> Self {
        let mut run = Run::start(kind);
        run.enter(OperationPhase::Validating);
        run.fail(OperationError::Precondition(message.to_string()))
    }

    /// Whether the run got as far as handing a request to the wallet
    pub fn reached(&self, phase: OperationPhase) -> bool {
        self.phases.contains(&phase)
    }

    /// Message shown to the user
    pub fn user_message(&self) -> String {
        if self.error.is_precondition() {
            self.error.to_string()
        } else {
            format!("{}: {}", self.kind.failure_prefix(), self.error)
        }
    }
}

/// Phase history of one run
struct Run {
    kind: OperationKind,
    phases: Vec<OperationPhase>,
}

impl Run {
    fn start(kind: OperationKind) -> Self {
        Self {
            kind,
            phases: vec![OperationPhase::Idle],
        }
    }

    fn enter(&mut self, phase: OperationPhase) {
        debug!(operation = %self.kind, ?phase, "operation phase");
        self.phases.push(phase);
    }

    fn fail(mut self, error: OperationError) -> OperationFailure {
        self.enter(OperationPhase::Failed);
        warn!(operation = %self.kind, %error, "operation failed");
        OperationFailure {
            kind: self.kind,
            error,
            phases: self.phases,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InFlightKey {
    Register(String),
    Node(Pubkey),
}

/// Released on drop, including when the caller abandons the future
struct InFlightGuard {
    registry: Arc<Mutex<HashSet<InFlightKey>>>,
    key: InFlightKey,
}

impl InFlightGuard {
    fn acquire(registry: &Arc<Mutex<HashSet<InFlightKey>>>, key: InFlightKey) -> Option<Self> {
        let mut active = registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(key.clone()) {
            return None;
        }
        Some(Self {
            registry: Arc::clone(registry),
            key,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.key);
    }
}

/// Builds, submits and confirms registry operations for one wallet binding
///
/// Cheap to clone; clones share the in-flight set.
#[derive(Clone)]
pub struct Orchestrator {
    ledger: Arc<dyn Ledger>,
    wallet: Arc<dyn Wallet>,
    config: Arc<ClientConfig>,
    addresses: ProgramAddresses,
    events: broadcast::Sender<RegistryEvent>,
    in_flight: Arc<Mutex<HashSet<InFlightKey>>>,
}

impl Orchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        wallet: Arc<dyn Wallet>,
        config: Arc<ClientConfig>,
        events: broadcast::Sender<RegistryEvent>,
    ) -> Self {
        let addresses = ProgramAddresses::new(config.program_id);
        Self {
            ledger,
            wallet,
            config,
            addresses,
            events,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    pub async fn register(&self, uri: impl Into<String>) -> Result<Receipt, OperationFailure> {
        self.execute(Operation::Register { uri: uri.into() }).await
    }

    pub async fn deregister(&self, node: Pubkey) -> Result<Receipt, OperationFailure> {
        self.execute(Operation::Deregister { node }).await
    }

    pub async fn update_uri(
        &self,
        node: Pubkey,
        new_uri: impl Into<String>,
    ) -> Result<Receipt, OperationFailure> {
        self.execute(Operation::UpdateUri {
            node,
            new_uri: new_uri.into(),
        })
        .await
    }

    /// Run one operation to settlement
    pub async fn execute(&self, operation: Operation) -> Result<Receipt, OperationFailure> {
        let mut run = Run::start(operation.kind());

        // === Validating ===
        run.enter(OperationPhase::Validating);
        let (authority, mint) = match self.validate(&operation) {
            Ok(checked) => checked,
            Err(err) => return Err(run.fail(err)),
        };
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, operation.in_flight_key())
        else {
            return Err(run.fail(OperationError::Precondition(
                "An identical operation is already in progress.".to_string(),
            )));
        };

        // === Building ===
        run.enter(OperationPhase::Building);
        let request = match self.build_request(authority, mint, &operation) {
            Ok(request) => request,
            Err(err) => return Err(run.fail(OperationError::Precondition(err.to_string()))),
        };
        let node = request.node();
        let transaction = match self.build_transaction(&request).await {
            Ok(transaction) => transaction,
            Err(err) => return Err(run.fail(err)),
        };
        // The fresh record keypair has done its job once it co-signed
        drop(request);

        // === Submitted ===
        run.enter(OperationPhase::Submitted);
        let signature = match self.wallet.sign_and_send(transaction).await {
            Ok(signature) => signature,
            Err(err) => return Err(run.fail(OperationError::Submission(err.to_string()))),
        };
        info!(operation = %run.kind, %signature, %node, "transaction submitted");

        // === Confirming ===
        run.enter(OperationPhase::Confirming);
        if let Err(err) = self.confirm(&signature).await {
            return Err(run.fail(err));
        }
        info!(
            operation = %run.kind,
            %signature,
            commitment = %self.config.commitment,
            "transaction confirmed"
        );

        // === Succeeded ===
        run.enter(OperationPhase::Succeeded);
        // Nobody listening is fine; the view just stays as it was
        let _ = self.events.send(RegistryEvent::OperationCompleted {
            kind: run.kind,
            node,
            signature,
        });

        Ok(Receipt {
            kind: run.kind,
            node,
            signature,
            explorer_url: self.config.explorer_url(&signature),
            phases: run.phases,
        })
    }

    /// Local checks; returns the signer and, for staking operations, the mint
    fn validate(&self, operation: &Operation) -> Result<(Pubkey, Option<Pubkey>), OperationError> {
        let authority = self
            .wallet
            .identity()
            .ok_or_else(|| OperationError::Precondition(WALLET_UNAVAILABLE.to_string()))?;

        let needs_mint = match operation {
            Operation::Register { uri } => {
                if uri.trim().is_empty() {
                    return Err(OperationError::Precondition("Please enter a URI.".to_string()));
                }
                true
            }
            Operation::Deregister { .. } => true,
            Operation::UpdateUri { new_uri, .. } => {
                if new_uri.trim().is_empty() {
                    return Err(OperationError::Precondition(
                        "Please enter a new URI.".to_string(),
                    ));
                }
                false
            }
        };

        let mint = if needs_mint {
            Some(self.config.mint().map_err(|err| match err {
                AddressError::Unconfigured(_) => OperationError::Precondition(
                    "Please configure the staking mint address (AETHERNET_MINT).".to_string(),
                ),
                other => OperationError::Precondition(other.to_string()),
            })?)
        } else {
            None
        };

        Ok((authority, mint))
    }

    fn build_request(
        &self,
        authority: Pubkey,
        mint: Option<Pubkey>,
        operation: &Operation,
    ) -> Result<NodeRequest, AddressError> {
        let staking = |mint: Option<Pubkey>| {
            let mint = mint.ok_or_else(|| AddressError::Unconfigured("mint".to_string()))?;
            let stake = self.addresses.stake_accounts(&authority, &mint)?;
            Ok::<_, AddressError>((mint, stake))
        };

        let request = match operation {
            Operation::Register { uri } => {
                let (mint, stake) = staking(mint)?;
                let node_keypair = Keypair::new();
                NodeRequest::Register {
                    accounts: RegisterNodeAccounts {
                        authority,
                        node_device: node_keypair.pubkey(),
                        network_stats: self.addresses.network_stats(),
                        user_token_account: stake.user_token_account,
                        vault_token_account: stake.vault_token_account,
                        vault: self.addresses.vault(),
                        mint,
                    },
                    args: RegisterNode {
                        uri: uri.trim().to_string(),
                    },
                    node_keypair,
                }
            }
            Operation::Deregister { node } => {
                let (mint, stake) = staking(mint)?;
                NodeRequest::Deregister {
                    accounts: DeregisterNodeAccounts {
                        authority,
                        node_device: *node,
                        network_stats: self.addresses.network_stats(),
                        mint,
                        user_token_account: stake.user_token_account,
                        vault_token_account: stake.vault_token_account,
                        vault: self.addresses.vault(),
                    },
                }
            }
            Operation::UpdateUri { node, new_uri } => NodeRequest::UpdateUri {
                accounts: UpdateUriAccounts {
                    authority,
                    node_device: *node,
                },
                args: UpdateUri {
                    new_uri: new_uri.trim().to_string(),
                },
            },
        };

        debug!(node = %request.node(), authority = %request.authority(), "request built");
        Ok(request)
    }

    /// One-instruction transaction paid by the wallet, co-signed where needed
    async fn build_transaction(&self, request: &NodeRequest) -> Result<Transaction, OperationError> {
        let instruction = request.to_instruction(self.addresses.program_id());
        let blockhash = self
            .ledger
            .latest_blockhash()
            .await
            .map_err(|err| OperationError::Submission(err.to_string()))?;

        let message =
            Message::new_with_blockhash(&[instruction], Some(&request.authority()), &blockhash);
        let mut transaction = Transaction::new_unsigned(message);
        let co_signers = request.co_signers();
        if !co_signers.is_empty() {
            transaction
                .try_partial_sign(co_signers.as_slice(), blockhash)
                .map_err(|err| OperationError::Submission(err.to_string()))?;
        }
        Ok(transaction)
    }

    /// Poll until the configured commitment, an execution error or the timeout
    async fn confirm(&self, signature: &Signature) -> Result<(), OperationError> {
        let target = self.config.commitment;
        let timeout = self.config.confirm_timeout;
        let poll_interval = self.config.poll_interval;

        let wait = async {
            loop {
                match self.ledger.signature_status(signature).await {
                    Ok(Some(status)) => {
                        if let Some(err) = status.err {
                            return Err(OperationError::Confirmation(err));
                        }
                        if status.reached(target) {
                            return Ok(());
                        }
                    }
                    Ok(None) => {}
                    // Status reads are retried until the deadline
                    Err(err) => debug!(%signature, %err, "signature status unavailable"),
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(OperationError::ConfirmationTimeout {
                signature: signature.to_string(),
                timeout,
            }),
        }
    }
}
