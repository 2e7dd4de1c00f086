use std::sync::Arc;

use anchor_lang::prelude::Pubkey;
use anchor_lang::{AccountDeserialize, Discriminator};
use async_trait::async_trait;
use tracing::debug;

use super::NodeSource;
use crate::constants::NODE_AUTHORITY_OFFSET;
use crate::errors::SyncError;
use crate::rpc::{AccountFilter, Ledger};
use crate::state::{NodeDevice, NodeView};

/// Reads the user's nodes straight from the ledger
///
/// A program account scan narrowed server-side to `NodeDevice` accounts whose
/// authority is the user, then one batched fetch of the matching bodies.
pub struct DirectScan {
    ledger: Arc<dyn Ledger>,
    program_id: Pubkey,
}

impl DirectScan {
    pub fn new(ledger: Arc<dyn Ledger>, program_id: Pubkey) -> Self {
        Self { ledger, program_id }
    }

    /// Filters selecting `identity`'s node records
    pub fn filters(identity: &Pubkey) -> Vec<AccountFilter> {
        vec![
            AccountFilter::Memcmp {
                offset: 0,
                bytes: NodeDevice::DISCRIMINATOR.to_vec(),
            },
            AccountFilter::Memcmp {
                offset: NODE_AUTHORITY_OFFSET,
                bytes: identity.to_bytes().to_vec(),
            },
        ]
    }
}

#[async_trait]
impl NodeSource for DirectScan {
    async fn fetch_user_records(&self, identity: &Pubkey) -> Result<Vec<NodeView>, SyncError> {
        let keys = self
            .ledger
            .program_account_keys(&self.program_id, &Self::filters(identity))
            .await?;
        debug!(%identity, matches = keys.len(), "program account scan");
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let accounts = self.ledger.multiple_accounts(&keys).await?;
        let mut nodes = Vec::with_capacity(keys.len());
        for (address, account) in keys.into_iter().zip(accounts) {
            // Closed between the scan and the fetch
            let Some(account) = account else {
                continue;
            };
            let node = NodeDevice::try_deserialize(&mut account.data.as_slice()).map_err(|err| {
                SyncError::Decode {
                    address: address.to_string(),
                    reason: err.to_string(),
                }
            })?;
            nodes.push(NodeView::from_account(address, node));
        }
        Ok(nodes)
    }
}
