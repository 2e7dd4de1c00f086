use anchor_lang::prelude::*;
use anchor_lang::solana_program::{system_program, sysvar};
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};

/// `register_node(uri)` arguments
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct RegisterNode {
    pub uri: String,
}

impl Discriminator for RegisterNode {
    // sha256("global:register_node")[..8]
    const DISCRIMINATOR: &'static [u8] = &[0x66, 0x55, 0x75, 0x72, 0xc2, 0xbc, 0xd3, 0xa8];
}

impl InstructionData for RegisterNode {}

/// Accounts for `register_node`
///
/// 0. authority (writable, signer) - stakes tokens and pays rent
/// 1. node_device (writable, signer) - new record, fresh keypair
/// 2. network_stats (writable) - PDA [b"network-stats"]
/// 3. user_token_account (writable) - authority's ATA for the mint
/// 4. vault_token_account (writable) - vault's ATA for the mint
/// 5. vault - PDA [b"vault"]
/// 6. mint
/// 7. system_program
/// 8. token_program
/// 9. associated_token_program
/// 10. rent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterNodeAccounts {
    pub authority: Pubkey,
    pub node_device: Pubkey,
    pub network_stats: Pubkey,
    pub user_token_account: Pubkey,
    pub vault_token_account: Pubkey,
    pub vault: Pubkey,
    pub mint: Pubkey,
}

impl ToAccountMetas for RegisterNodeAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.authority, true),
            AccountMeta::new(self.node_device, true),
            AccountMeta::new(self.network_stats, false),
            AccountMeta::new(self.user_token_account, false),
            AccountMeta::new(self.vault_token_account, false),
            AccountMeta::new_readonly(self.vault, false),
            AccountMeta::new_readonly(self.mint, false),
            AccountMeta::new_readonly(system_program::ID, false),
            AccountMeta::new_readonly(anchor_spl::token::ID, false),
            AccountMeta::new_readonly(spl_associated_token_account::id(), false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
        ]
    }
}
