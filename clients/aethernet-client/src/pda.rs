//! Address derivation
//!
//! The program derives the same addresses on its side and rejects any request
//! carrying a mismatched account, so these must stay byte-for-byte identical
//! to the program's seeds and to the associated-token scheme.

use std::str::FromStr;

use anchor_lang::prelude::Pubkey;
use tracing::debug;

use crate::constants::{MINT_PLACEHOLDER, NETWORK_STATS_SEED, VAULT_SEED};
use crate::errors::AddressError;

/// Derive a program-owned address from a fixed seed
pub fn derive_global_address(seed: &[u8], program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[seed], program_id)
}

/// Derive an associated token account
///
/// `allow_owner_off_curve` must be set for PDA owners such as the vault.
pub fn derive_token_address(
    owner: &Pubkey,
    mint: &Pubkey,
    allow_owner_off_curve: bool,
) -> Result<Pubkey, AddressError> {
    if !allow_owner_off_curve && !owner.is_on_curve() {
        return Err(AddressError::OwnerOffCurve(owner.to_string()));
    }
    Ok(spl_associated_token_account::get_associated_token_address(
        owner, mint,
    ))
}

/// Token account of a wallet holder
pub fn derive_user_token_address(owner: &Pubkey, mint: &Pubkey) -> Result<Pubkey, AddressError> {
    derive_token_address(owner, mint, false)
}

/// Token account of the vault PDA
pub fn derive_vault_token_address(vault: &Pubkey, mint: &Pubkey) -> Pubkey {
    // The off-curve check is skipped, so this cannot fail.
    spl_associated_token_account::get_associated_token_address(vault, mint)
}

/// Parse a configured base58 address, rejecting template placeholders
pub fn parse_address(value: &str) -> Result<Pubkey, AddressError> {
    let value = value.trim();
    if value.is_empty() || value == MINT_PLACEHOLDER {
        return Err(AddressError::Unconfigured(value.to_string()));
    }
    let address =
        Pubkey::from_str(value).map_err(|_| AddressError::InvalidAddress(value.to_string()))?;
    if address == Pubkey::default() {
        return Err(AddressError::Unconfigured(value.to_string()));
    }
    Ok(address)
}

/// Token accounts moved by a stake or refund
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeAccounts {
    pub user_token_account: Pubkey,
    pub vault_token_account: Pubkey,
}

/// Global PDAs of one program deployment
///
/// Seed-only addresses never change for a given program, so they are derived
/// once on construction and reused for the lifetime of the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramAddresses {
    program_id: Pubkey,
    network_stats: (Pubkey, u8),
    vault: (Pubkey, u8),
}

impl ProgramAddresses {
    pub fn new(program_id: Pubkey) -> Self {
        let network_stats = derive_global_address(NETWORK_STATS_SEED, &program_id);
        let vault = derive_global_address(VAULT_SEED, &program_id);
        debug!(
            program = %program_id,
            network_stats = %network_stats.0,
            vault = %vault.0,
            "derived program addresses"
        );
        Self {
            program_id,
            network_stats,
            vault,
        }
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    pub fn network_stats(&self) -> Pubkey {
        self.network_stats.0
    }

    pub fn network_stats_bump(&self) -> u8 {
        self.network_stats.1
    }

    pub fn vault(&self) -> Pubkey {
        self.vault.0
    }

    pub fn vault_bump(&self) -> u8 {
        self.vault.1
    }

    /// User and vault token accounts for `mint`
    pub fn stake_accounts(&self, owner: &Pubkey, mint: &Pubkey) -> Result<StakeAccounts, AddressError> {
        Ok(StakeAccounts {
            user_token_account: derive_user_token_address(owner, mint)?,
            vault_token_account: derive_vault_token_address(&self.vault(), mint),
        })
    }
}

impl Default for ProgramAddresses {
    fn default() -> Self {
        Self::new(crate::ID)
    }
}
