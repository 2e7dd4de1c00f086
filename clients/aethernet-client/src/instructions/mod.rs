//! Typed binding for the registry program's instructions
//!
//! Each instruction has an argument type implementing [`InstructionData`]
//! (discriminator + borsh args) and an account type implementing
//! [`ToAccountMetas`] with signer and writable flags fixed by the program.

pub mod deregister_node;
pub mod register_node;
pub mod update_uri;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::{InstructionData, ToAccountMetas};
use solana_sdk::signature::Keypair;

pub use deregister_node::*;
pub use register_node::*;
pub use update_uri::*;

/// One fully-specified request against the registry program
///
/// Each variant carries exactly the accounts its instruction needs, so a
/// request cannot be built with an account missing.
pub enum NodeRequest {
    Register {
        accounts: RegisterNodeAccounts,
        args: RegisterNode,
        /// Freshly generated identity of the new record; co-signs the request
        node_keypair: Keypair,
    },
    Deregister {
        accounts: DeregisterNodeAccounts,
    },
    UpdateUri {
        accounts: UpdateUriAccounts,
        args: UpdateUri,
    },
}

impl NodeRequest {
    /// Address of the record the request acts on
    pub fn node(&self) -> Pubkey {
        match self {
            NodeRequest::Register { accounts, .. } => accounts.node_device,
            NodeRequest::Deregister { accounts } => accounts.node_device,
            NodeRequest::UpdateUri { accounts, .. } => accounts.node_device,
        }
    }

    /// Signer paying for and authorizing the request
    pub fn authority(&self) -> Pubkey {
        match self {
            NodeRequest::Register { accounts, .. } => accounts.authority,
            NodeRequest::Deregister { accounts } => accounts.authority,
            NodeRequest::UpdateUri { accounts, .. } => accounts.authority,
        }
    }

    /// Keypairs that must sign besides the wallet
    pub fn co_signers(&self) -> Vec<&Keypair> {
        match self {
            NodeRequest::Register { node_keypair, .. } => vec![node_keypair],
            NodeRequest::Deregister { .. } | NodeRequest::UpdateUri { .. } => Vec::new(),
        }
    }

    pub fn to_instruction(&self, program_id: Pubkey) -> Instruction {
        let (accounts, data) = match self {
            NodeRequest::Register { accounts, args, .. } => {
                (accounts.to_account_metas(None), args.data())
            }
            NodeRequest::Deregister { accounts } => {
                (accounts.to_account_metas(None), DeregisterNode {}.data())
            }
            NodeRequest::UpdateUri { accounts, args } => {
                (accounts.to_account_metas(None), args.data())
            }
        };

        Instruction {
            program_id,
            accounts,
            data,
        }
    }
}
