//! In-memory cluster running the registry program's rules
//!
//! Implements [`Ledger`] so the orchestrator and the synchronizer can be
//! driven end to end without a validator. Each transaction is checked for
//! valid signatures and a known blockhash, then executed against a copy of
//! the state that is committed only if every instruction succeeds.
//!
//! These helpers are shared across multiple test files. Each test binary
//! only uses a subset, so dead_code warnings are expected and suppressed.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use aethernet_client::instructions::{DeregisterNode, RegisterNode, UpdateUri};
use aethernet_client::rpc::{AccountFilter, Commitment, SignatureStatus};
use aethernet_client::state::{NetworkStats, NodeDevice};
use aethernet_client::sync::IndexedNode;
use aethernet_client::{Ledger, LedgerError, ProgramAddresses};
use anchor_lang::{AccountDeserialize, AccountSerialize, AnchorDeserialize, Discriminator};
use async_trait::async_trait;
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature, transaction::Transaction,
};

/// Tokens moved into the vault per registered node
pub const STAKE_AMOUNT: u64 = 100_000_000;

/// Anchor `ConstraintHasOne`
pub const CONSTRAINT_HAS_ONE: u32 = 2001;
/// Anchor `ConstraintSeeds`
pub const CONSTRAINT_SEEDS: u32 = 2006;
/// Anchor `AccountNotInitialized`
pub const ACCOUNT_NOT_INITIALIZED: u32 = 3012;
/// Anchor `AccountNotAssociatedTokenAccount`
pub const NOT_ASSOCIATED_TOKEN_ACCOUNT: u32 = 3014;
/// SPL token `InsufficientFunds`
pub const INSUFFICIENT_FUNDS: u32 = 1;
/// System program `AccountAlreadyInUse`
pub const ACCOUNT_ALREADY_IN_USE: u32 = 0;

const RENT_LAMPORTS: u64 = 1_461_600;

/// Message the cluster reports for a failed instruction
pub fn program_error(code: u32) -> String {
    format!("Error processing Instruction 0: custom program error: {code:#x}")
}

#[derive(Debug, Clone, Default)]
struct Ledgers {
    accounts: HashMap<Pubkey, Account>,
    token_balances: HashMap<Pubkey, u64>,
}

#[derive(Default)]
struct ClusterState {
    ledgers: Ledgers,
    blockhashes: HashSet<Hash>,
    statuses: HashMap<Signature, SignatureStatus>,
    submitted: Vec<Transaction>,
    reject_sends: Option<String>,
    skip_preflight: bool,
    withhold_confirmation: bool,
    fail_scans: bool,
}

pub struct SimulatedCluster {
    addresses: ProgramAddresses,
    mint: Pubkey,
    state: Mutex<ClusterState>,
}

impl SimulatedCluster {
    /// Cluster with the program deployed at the crate's id and its network
    /// stats account initialized to zero
    pub fn new() -> Self {
        Self::with_program(aethernet_client::ID)
    }

    pub fn with_program(program_id: Pubkey) -> Self {
        let cluster = Self {
            addresses: ProgramAddresses::new(program_id),
            mint: Pubkey::new_unique(),
            state: Mutex::new(ClusterState::default()),
        };
        cluster.set_total_nodes(0);
        cluster
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap()
    }

    pub fn program_id(&self) -> Pubkey {
        self.addresses.program_id()
    }

    pub fn addresses(&self) -> &ProgramAddresses {
        &self.addresses
    }

    pub fn mint(&self) -> Pubkey {
        self.mint
    }

    // ========================================================================
    // Seeding
    // ========================================================================

    /// Credit `owner`'s token account for the staking mint
    pub fn fund(&self, owner: &Pubkey, amount: u64) {
        let token_account = self.user_token_account(owner);
        *self
            .state()
            .ledgers
            .token_balances
            .entry(token_account)
            .or_default() += amount;
    }

    pub fn set_total_nodes(&self, total_nodes: u64) {
        let mut data = Vec::new();
        NetworkStats { total_nodes }.try_serialize(&mut data).unwrap();
        let address = self.addresses.network_stats();
        let account = self.program_account(data);
        self.state().ledgers.accounts.insert(address, account);
    }

    pub fn remove_network_stats(&self) {
        let address = self.addresses.network_stats();
        self.state().ledgers.accounts.remove(&address);
    }

    /// Store a node record directly, bypassing staking
    pub fn insert_node(&self, authority: &Pubkey, uri: &str) -> Pubkey {
        let address = Pubkey::new_unique();
        let mut data = Vec::new();
        NodeDevice {
            authority: *authority,
            uri: uri.to_string(),
        }
        .try_serialize(&mut data)
        .unwrap();
        let account = self.program_account(data);
        self.state().ledgers.accounts.insert(address, account);
        address
    }

    pub fn insert_account(&self, address: Pubkey, account: Account) {
        self.state().ledgers.accounts.insert(address, account);
    }

    // ========================================================================
    // Fault injection
    // ========================================================================

    /// Fail every submission with `message`, as a wallet or node rejection would
    pub fn reject_sends(&self, message: &str) {
        self.state().reject_sends = Some(message.to_string());
    }

    /// Land failing transactions instead of rejecting them at preflight
    pub fn skip_preflight(&self) {
        self.state().skip_preflight = true;
    }

    /// Accept transactions but never report a status for them
    pub fn withhold_confirmation(&self) {
        self.state().withhold_confirmation = true;
    }

    pub fn fail_scans(&self) {
        self.state().fail_scans = true;
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn submitted(&self) -> Vec<Transaction> {
        self.state().submitted.clone()
    }

    pub fn node(&self, address: &Pubkey) -> Option<NodeDevice> {
        let account = self.state().ledgers.accounts.get(address)?.clone();
        NodeDevice::try_deserialize(&mut account.data.as_slice()).ok()
    }

    pub fn total_nodes(&self) -> Option<u64> {
        let address = self.addresses.network_stats();
        let account = self.state().ledgers.accounts.get(&address)?.clone();
        NetworkStats::try_deserialize(&mut account.data.as_slice())
            .ok()
            .map(|stats| stats.total_nodes)
    }

    pub fn token_balance(&self, owner: &Pubkey) -> u64 {
        let token_account = self.user_token_account(owner);
        self.balance_of(&token_account)
    }

    pub fn vault_balance(&self) -> u64 {
        let token_account = self.vault_token_account();
        self.balance_of(&token_account)
    }

    /// Every node record in the indexer's wire shape
    pub fn indexed_nodes(&self) -> Vec<IndexedNode> {
        let state = self.state();
        let mut nodes: Vec<IndexedNode> = state
            .ledgers
            .accounts
            .iter()
            .filter(|(_, account)| account.owner == self.program_id())
            .filter_map(|(address, account)| {
                let node = NodeDevice::try_deserialize(&mut account.data.as_slice()).ok()?;
                Some(IndexedNode {
                    pubkey: address.to_string(),
                    authority: node.authority.to_string(),
                    uri: node.uri,
                })
            })
            .collect();
        nodes.sort_by(|a, b| a.pubkey.cmp(&b.pubkey));
        nodes
    }

    fn balance_of(&self, token_account: &Pubkey) -> u64 {
        self.state()
            .ledgers
            .token_balances
            .get(token_account)
            .copied()
            .unwrap_or_default()
    }

    fn user_token_account(&self, owner: &Pubkey) -> Pubkey {
        spl_associated_token_account::get_associated_token_address(owner, &self.mint)
    }

    fn vault_token_account(&self) -> Pubkey {
        spl_associated_token_account::get_associated_token_address(
            &self.addresses.vault(),
            &self.mint,
        )
    }

    fn program_account(&self, data: Vec<u8>) -> Account {
        Account {
            lamports: RENT_LAMPORTS,
            data,
            owner: self.program_id(),
            executable: false,
            rent_epoch: 0,
        }
    }

    // ========================================================================
    // Program
    // ========================================================================

    fn execute(&self, ledgers: &mut Ledgers, transaction: &Transaction) -> Result<(), String> {
        let message = &transaction.message;
        for compiled in &message.instructions {
            let program = message.account_keys[compiled.program_id_index as usize];
            if program != self.program_id() {
                return Err("Error processing Instruction 0: incorrect program id".to_string());
            }
            let keys: Vec<Pubkey> = compiled
                .accounts
                .iter()
                .map(|index| message.account_keys[*index as usize])
                .collect();
            let signed = |position: usize| {
                compiled
                    .accounts
                    .get(position)
                    .is_some_and(|index| message.is_signer(*index as usize))
            };
            if !signed(0) {
                return Err(
                    "Error processing Instruction 0: missing required signature".to_string(),
                );
            }

            let (discriminator, args) = compiled.data.split_at(8.min(compiled.data.len()));
            if discriminator == RegisterNode::DISCRIMINATOR {
                let args = RegisterNode::try_from_slice(args).map_err(|err| err.to_string())?;
                if !signed(1) {
                    return Err(
                        "Error processing Instruction 0: missing required signature".to_string(),
                    );
                }
                self.register_node(ledgers, &keys, args.uri)
                    .map_err(program_error)?;
            } else if discriminator == DeregisterNode::DISCRIMINATOR {
                self.deregister_node(ledgers, &keys).map_err(program_error)?;
            } else if discriminator == UpdateUri::DISCRIMINATOR {
                let args = UpdateUri::try_from_slice(args).map_err(|err| err.to_string())?;
                self.update_uri(ledgers, &keys, args.new_uri)
                    .map_err(program_error)?;
            } else {
                // Anchor `InstructionFallbackNotFound`
                return Err(program_error(101));
            }
        }
        Ok(())
    }

    fn check_staking_accounts(
        &self,
        authority: &Pubkey,
        network_stats: &Pubkey,
        vault: &Pubkey,
        mint: &Pubkey,
        user_token_account: &Pubkey,
        vault_token_account: &Pubkey,
    ) -> Result<(), u32> {
        if network_stats != &self.addresses.network_stats() || vault != &self.addresses.vault() {
            return Err(CONSTRAINT_SEEDS);
        }
        if mint != &self.mint
            || user_token_account != &self.user_token_account(authority)
            || vault_token_account != &self.vault_token_account()
        {
            return Err(NOT_ASSOCIATED_TOKEN_ACCOUNT);
        }
        Ok(())
    }

    fn register_node(&self, ledgers: &mut Ledgers, keys: &[Pubkey], uri: String) -> Result<(), u32> {
        let [authority, node_device, network_stats, user_token_account, vault_token_account, vault, mint, ..] =
            keys
        else {
            return Err(ACCOUNT_NOT_INITIALIZED);
        };
        self.check_staking_accounts(
            authority,
            network_stats,
            vault,
            mint,
            user_token_account,
            vault_token_account,
        )?;
        if ledgers.accounts.contains_key(node_device) {
            return Err(ACCOUNT_ALREADY_IN_USE);
        }

        adjust_total_nodes(ledgers, network_stats, |total| total.checked_add(1))?;
        transfer(ledgers, user_token_account, vault_token_account, STAKE_AMOUNT)?;

        let mut data = Vec::new();
        NodeDevice {
            authority: *authority,
            uri,
        }
        .try_serialize(&mut data)
        .map_err(|_| ACCOUNT_NOT_INITIALIZED)?;
        ledgers
            .accounts
            .insert(*node_device, self.program_account(data));
        Ok(())
    }

    fn deregister_node(&self, ledgers: &mut Ledgers, keys: &[Pubkey]) -> Result<(), u32> {
        let [authority, node_device, network_stats, mint, user_token_account, vault_token_account, vault, ..] =
            keys
        else {
            return Err(ACCOUNT_NOT_INITIALIZED);
        };
        let node = load_node(ledgers, node_device, &self.program_id())?;
        if &node.authority != authority {
            return Err(CONSTRAINT_HAS_ONE);
        }
        self.check_staking_accounts(
            authority,
            network_stats,
            vault,
            mint,
            user_token_account,
            vault_token_account,
        )?;

        adjust_total_nodes(ledgers, network_stats, |total| total.checked_sub(1))?;
        transfer(ledgers, vault_token_account, user_token_account, STAKE_AMOUNT)?;
        ledgers.accounts.remove(node_device);
        Ok(())
    }

    fn update_uri(&self, ledgers: &mut Ledgers, keys: &[Pubkey], new_uri: String) -> Result<(), u32> {
        let [authority, node_device, ..] = keys else {
            return Err(ACCOUNT_NOT_INITIALIZED);
        };
        let mut node = load_node(ledgers, node_device, &self.program_id())?;
        if &node.authority != authority {
            return Err(CONSTRAINT_HAS_ONE);
        }

        node.uri = new_uri;
        let mut data = Vec::new();
        node.try_serialize(&mut data)
            .map_err(|_| ACCOUNT_NOT_INITIALIZED)?;
        ledgers
            .accounts
            .insert(*node_device, self.program_account(data));
        Ok(())
    }
}

impl Default for SimulatedCluster {
    fn default() -> Self {
        Self::new()
    }
}

fn load_node(ledgers: &Ledgers, address: &Pubkey, program_id: &Pubkey) -> Result<NodeDevice, u32> {
    let account = ledgers
        .accounts
        .get(address)
        .filter(|account| &account.owner == program_id)
        .ok_or(ACCOUNT_NOT_INITIALIZED)?;
    NodeDevice::try_deserialize(&mut account.data.as_slice()).map_err(|_| ACCOUNT_NOT_INITIALIZED)
}

fn adjust_total_nodes(
    ledgers: &mut Ledgers,
    address: &Pubkey,
    change: impl FnOnce(u64) -> Option<u64>,
) -> Result<(), u32> {
    let account = ledgers
        .accounts
        .get_mut(address)
        .ok_or(ACCOUNT_NOT_INITIALIZED)?;
    let stats = NetworkStats::try_deserialize(&mut account.data.as_slice())
        .map_err(|_| ACCOUNT_NOT_INITIALIZED)?;
    let total_nodes = change(stats.total_nodes).ok_or(ACCOUNT_NOT_INITIALIZED)?;
    let mut data = Vec::new();
    NetworkStats { total_nodes }
        .try_serialize(&mut data)
        .map_err(|_| ACCOUNT_NOT_INITIALIZED)?;
    account.data = data;
    Ok(())
}

fn transfer(ledgers: &mut Ledgers, from: &Pubkey, to: &Pubkey, amount: u64) -> Result<(), u32> {
    let source = ledgers.token_balances.entry(*from).or_default();
    *source = source.checked_sub(amount).ok_or(INSUFFICIENT_FUNDS)?;
    *ledgers.token_balances.entry(*to).or_default() += amount;
    Ok(())
}

fn rpc_error(code: i64, message: impl Into<String>) -> LedgerError {
    LedgerError::Rpc {
        code,
        message: message.into(),
    }
}

#[async_trait]
impl Ledger for SimulatedCluster {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let blockhash = Hash::new_unique();
        self.state().blockhashes.insert(blockhash);
        Ok(blockhash)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        let mut state = self.state();
        if let Some(message) = &state.reject_sends {
            return Err(rpc_error(-32003, message.clone()));
        }
        if !state.blockhashes.contains(&transaction.message.recent_blockhash) {
            return Err(rpc_error(-32002, "Blockhash not found"));
        }
        if transaction.verify().is_err() {
            return Err(rpc_error(
                -32003,
                "Transaction signature verification failure",
            ));
        }
        state.submitted.push(transaction.clone());

        let signature = transaction.signatures[0];
        let mut working = state.ledgers.clone();
        let outcome = self.execute(&mut working, transaction);
        let err = match outcome {
            Ok(()) => {
                state.ledgers = working;
                None
            }
            Err(err) if !state.skip_preflight => {
                return Err(rpc_error(
                    -32002,
                    format!("Transaction simulation failed: {err}"),
                ));
            }
            Err(err) => Some(err),
        };

        if !state.withhold_confirmation {
            state.statuses.insert(
                signature,
                SignatureStatus {
                    confirmation: Some(Commitment::Processed),
                    err,
                },
            );
        }
        Ok(signature)
    }

    /// Each query advances the reported commitment by one level
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, LedgerError> {
        let mut state = self.state();
        let Some(status) = state.statuses.get_mut(signature) else {
            return Ok(None);
        };
        let reported = status.clone();
        status.confirmation = match status.confirmation {
            Some(Commitment::Processed) => Some(Commitment::Confirmed),
            _ => Some(Commitment::Finalized),
        };
        Ok(Some(reported))
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        Ok(self.state().ledgers.accounts.get(address).cloned())
    }

    async fn multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, LedgerError> {
        let state = self.state();
        Ok(addresses
            .iter()
            .map(|address| state.ledgers.accounts.get(address).cloned())
            .collect())
    }

    async fn program_account_keys(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<Pubkey>, LedgerError> {
        let state = self.state();
        if state.fail_scans {
            return Err(rpc_error(-32010, "scan unavailable"));
        }
        let mut keys: Vec<Pubkey> = state
            .ledgers
            .accounts
            .iter()
            .filter(|(_, account)| &account.owner == program_id)
            .filter(|(_, account)| filters.iter().all(|filter| filter.matches(&account.data)))
            .map(|(address, _)| *address)
            .collect();
        keys.sort();
        Ok(keys)
    }
}
