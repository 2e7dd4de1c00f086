use anchor_lang::prelude::*;
use anchor_lang::{Discriminator, InstructionData, ToAccountMetas};

/// `update_uri(new_uri)` arguments
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct UpdateUri {
    pub new_uri: String,
}

impl Discriminator for UpdateUri {
    // sha256("global:update_uri")[..8]
    const DISCRIMINATOR: &'static [u8] = &[0xfc, 0xf2, 0x51, 0xc1, 0x30, 0x2b, 0x01, 0x59];
}

impl InstructionData for UpdateUri {}

/// Accounts for `update_uri`
///
/// 0. authority (signer) - must match node_device.authority
/// 1. node_device (writable)
///
/// No stake moves, so stats, vault and token accounts are not involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateUriAccounts {
    pub authority: Pubkey,
    pub node_device: Pubkey,
}

impl ToAccountMetas for UpdateUriAccounts {
    fn to_account_metas(&self, _is_signer: Option<bool>) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.authority, true),
            AccountMeta::new(self.node_device, false),
        ]
    }
}
