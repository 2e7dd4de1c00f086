use std::str::FromStr;
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::NodeSource;
use crate::constants::INDEXER_NODES_PATH;
use crate::errors::{IndexerError, SyncError};
use crate::state::NodeView;

/// Flat record served by the indexer's `GET /nodes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedNode {
    pub pubkey: String,
    pub authority: String,
    pub uri: String,
}

/// Reads the user's nodes from the secondary indexer
///
/// The indexer returns every known node; filtering by authority happens here.
#[derive(Debug, Clone)]
pub struct IndexerSource {
    inner: Client,
    nodes_url: Url,
}

impl IndexerSource {
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, IndexerError> {
        let nodes_url = nodes_url(base)?;
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self { inner, nodes_url })
    }

    pub fn nodes_url(&self) -> &Url {
        &self.nodes_url
    }

    /// Full snapshot of the index
    pub async fn fetch_all(&self) -> Result<Vec<IndexedNode>, IndexerError> {
        let response = self.inner.get(self.nodes_url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(IndexerError::HttpStatus(response.status()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl NodeSource for IndexerSource {
    async fn fetch_user_records(&self, identity: &Pubkey) -> Result<Vec<NodeView>, SyncError> {
        let all = self.fetch_all().await?;
        debug!(%identity, indexed = all.len(), "indexer snapshot");
        Ok(filter_indexed_nodes(all, identity))
    }
}

/// Keep `identity`'s records and map them to views
///
/// Records with unparseable keys are skipped.
pub fn filter_indexed_nodes(records: Vec<IndexedNode>, identity: &Pubkey) -> Vec<NodeView> {
    records
        .into_iter()
        .filter_map(|record| {
            let Ok(authority) = Pubkey::from_str(&record.authority) else {
                warn!(
                    authority = %record.authority,
                    "skipping indexed node with invalid authority"
                );
                return None;
            };
            if authority != *identity {
                return None;
            }
            let Ok(address) = Pubkey::from_str(&record.pubkey) else {
                warn!(pubkey = %record.pubkey, "skipping indexed node with invalid address");
                return None;
            };
            Some(NodeView {
                address,
                authority,
                uri: record.uri,
            })
        })
        .collect()
}

fn nodes_url(base: &Url) -> Result<Url, IndexerError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(INDEXER_NODES_PATH)
        .map_err(|err| IndexerError::InvalidEndpoint(err.to_string()))
}
