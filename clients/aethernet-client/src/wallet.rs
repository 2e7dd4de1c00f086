use std::sync::{Arc, RwLock};

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use solana_sdk::{
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
use tracing::info;

use crate::errors::WalletError;
use crate::rpc::Ledger;

/// Signing capability of a connected wallet
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Connected identity, `None` once disconnected
    fn identity(&self) -> Option<Pubkey>;

    /// Add the wallet's signature and broadcast
    ///
    /// Co-signatures already present on `transaction` are kept.
    async fn sign_and_send(&self, transaction: Transaction) -> Result<Signature, WalletError>;
}

/// Wallet backed by a local keypair, submitting through a [`Ledger`]
pub struct KeypairWallet {
    keypair: RwLock<Option<Arc<Keypair>>>,
    ledger: Arc<dyn Ledger>,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair, ledger: Arc<dyn Ledger>) -> Self {
        info!(identity = %keypair.pubkey(), "wallet connected");
        Self {
            keypair: RwLock::new(Some(Arc::new(keypair))),
            ledger,
        }
    }

    /// Forget the keypair; later signing attempts fail with `Disconnected`
    pub fn disconnect(&self) {
        let mut guard = self.keypair.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(keypair) = guard.take() {
            info!(identity = %keypair.pubkey(), "wallet disconnected");
        }
    }

    fn keypair(&self) -> Option<Arc<Keypair>> {
        self.keypair
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Wallet for KeypairWallet {
    fn identity(&self) -> Option<Pubkey> {
        self.keypair().map(|keypair| keypair.pubkey())
    }

    async fn sign_and_send(&self, mut transaction: Transaction) -> Result<Signature, WalletError> {
        let keypair = self.keypair().ok_or(WalletError::Disconnected)?;
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[keypair.as_ref()], blockhash)
            .map_err(|err| WalletError::Signing(err.to_string()))?;

        Ok(self.ledger.send_transaction(&transaction).await?)
    }
}
