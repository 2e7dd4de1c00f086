use anchor_lang::prelude::*;
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};

/// `deregister_node()` takes no arguments
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DeregisterNode {}

impl Discriminator for DeregisterNode {
    // sha256("global:deregister_node")[..8]
    const DISCRIMINATOR: &'static [u8] = &[0x5c, 0xb1, 0x5d, 0x1e, 0x45, 0xb1, 0x2e, 0xb1];
}

impl InstructionData for DeregisterNode {}

/// Accounts for `deregister_node`
///
/// 0. authority (writable, signer) - must match node_device.authority
/// 1. node_device (writable) - closed, rent returned to authority
/// 2. network_stats (writable)
/// 3. mint
/// 4. user_token_account (writable) - receives the stake refund
/// 5. vault_token_account (writable)
/// 6. vault - PDA signing the refund
/// 7. token_program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeregisterNodeAccounts {
    pub authority: Pubkey,
    pub node_device: Pubkey,
    pub network_stats: Pubkey,
    pub mint: Pubkey,
    pub user_token_account: Pubkey,
    pub vault_token_account: Pubkey,
    pub vault: Pubkey,
}

impl ToAccountMetas for DeregisterNodeAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.authority, true),
            AccountMeta::new(self.node_device, false),
            AccountMeta::new(self.network_stats, false),
            AccountMeta::new_readonly(self.mint, false),
            AccountMeta::new(self.user_token_account, false),
            AccountMeta::new(self.vault_token_account, false),
            AccountMeta::new_readonly(self.vault, false),
            AccountMeta::new_readonly(anchor_spl::token::ID, false),
        ]
    }
}
