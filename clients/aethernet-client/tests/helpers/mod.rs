//! Test helpers for client integration tests
//!
//! Tests run the real orchestrator and synchronizer against
//! [`SimulatedCluster`], an in-memory [`aethernet_client::Ledger`] applying
//! the registry program's rules, and against an indexer served by axum.
//! [`rpc::RpcNode`] stands in for a cluster node when exercising
//! [`aethernet_client::RpcLedger`] over HTTP.

#![allow(dead_code)]

pub mod cluster;

pub use cluster::*;
pub use indexer::*;
pub use rpc::*;

use std::sync::Arc;
use std::time::Duration;

use aethernet_client::{events, ClientConfig, Cluster, KeypairWallet, Ledger, Orchestrator};
use axum::Router;
use reqwest::Url;
use solana_sdk::signature::{Keypair, Signer};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// HTTP stand-in on a loopback port; stops serving when dropped
pub struct TestServer {
    url: Url,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Base URL to configure the client with
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn(app: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    TestServer {
        url: Url::parse(&format!("http://{address}")).unwrap(),
        handle,
    }
}

/// Localnet config pointed at `cluster`'s program and mint, with short waits
pub fn test_config(cluster: &SimulatedCluster) -> ClientConfig {
    let mut config = ClientConfig::for_cluster(Cluster::Localnet);
    config.program_id = cluster.program_id();
    config.mint = cluster.mint().to_string();
    config.confirm_timeout = Duration::from_secs(2);
    config.poll_interval = Duration::from_millis(5);
    config
}

/// Honors `RUST_LOG` when debugging a failing test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Funded keypair with a wallet submitting to `cluster`
pub fn funded_wallet(cluster: &Arc<SimulatedCluster>, stakes: u64) -> (Keypair, Arc<KeypairWallet>) {
    let keypair = Keypair::new();
    cluster.fund(&keypair.pubkey(), stakes * STAKE_AMOUNT);
    let ledger: Arc<dyn Ledger> = cluster.clone();
    let wallet = Arc::new(KeypairWallet::new(keypair.insecure_clone(), ledger));
    (keypair, wallet)
}

/// Orchestrator for `wallet` with its own event channel
pub fn orchestrator_for(
    cluster: &Arc<SimulatedCluster>,
    wallet: Arc<KeypairWallet>,
    config: ClientConfig,
) -> (
    Orchestrator,
    tokio::sync::broadcast::Receiver<aethernet_client::RegistryEvent>,
) {
    let (sender, receiver) = events::channel();
    let ledger: Arc<dyn Ledger> = cluster.clone();
    let orchestrator = Orchestrator::new(ledger, wallet, Arc::new(config), sender);
    (orchestrator, receiver)
}
