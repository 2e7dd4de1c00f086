use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use solana_sdk::{account::Account, hash::Hash, signature::Signature, transaction::Transaction};
use tracing::{debug, trace};

use super::dto::{
    AccountDto, BlockhashDto, JsonRpcRequest, JsonRpcResponse, KeyedAccountDto,
    SignatureStatusDto, WithContext, JSONRPC_VERSION,
};
use super::{AccountFilter, Commitment, Ledger, SignatureStatus};
use crate::config::ClientConfig;
use crate::errors::LedgerError;

/// Typed JSON-RPC client for a cluster node
#[derive(Debug)]
pub struct RpcLedger {
    inner: Client,
    url: Url,
    commitment: Commitment,
    timeout: Duration,
    next_id: AtomicU64,
}

impl RpcLedger {
    pub fn new(url: Url, commitment: Commitment, timeout: Duration) -> Result<Self, LedgerError> {
        let inner = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner,
            url,
            commitment,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Client for the configured endpoint, read commitment and HTTP timeout
    pub fn from_config(config: &ClientConfig) -> Result<Self, LedgerError> {
        Self::new(config.rpc_url.clone(), config.commitment, config.http_timeout)
    }

    /// Returns the RPC endpoint used by the client.
    pub fn endpoint(&self) -> &Url {
        &self.url
    }

    /// Commitment attached to every read
    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issues a raw JSON-RPC call returning the untyped [`Value`] payload.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let payload = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        trace!(method, "ledger rpc request");

        let response = self.inner.post(self.url.clone()).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(LedgerError::HttpStatus(response.status()));
        }

        let response: JsonRpcResponse = response.json().await?;
        if let Some(error) = response.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        response.result.ok_or(LedgerError::EmptyResponse)
    }

    /// Issues a JSON-RPC call and deserialises the result into `R`.
    pub async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<R, LedgerError> {
        let value = self.request(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    fn read_config(&self) -> Value {
        json!({ "encoding": "base64", "commitment": self.commitment.as_str() })
    }
}

#[async_trait]
impl Ledger for RpcLedger {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let response: WithContext<BlockhashDto> = self
            .call(
                "getLatestBlockhash",
                json!([{ "commitment": self.commitment.as_str() }]),
            )
            .await?;
        Hash::from_str(&response.value.blockhash)
            .map_err(|err| LedgerError::Decode(format!("blockhash: {err}")))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature, LedgerError> {
        let wire = bincode::serialize(transaction)
            .map_err(|err| LedgerError::Decode(format!("transaction: {err}")))?;
        let signature: String = self
            .call(
                "sendTransaction",
                json!([
                    STANDARD.encode(wire),
                    { "encoding": "base64", "preflightCommitment": Commitment::Processed.as_str() }
                ]),
            )
            .await?;
        debug!(%signature, "transaction broadcast");
        Signature::from_str(&signature)
            .map_err(|err| LedgerError::Decode(format!("signature: {err}")))
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<SignatureStatus>, LedgerError> {
        let response: WithContext<Vec<Option<SignatureStatusDto>>> = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": false }]),
            )
            .await?;

        let Some(status) = response.value.into_iter().next().flatten() else {
            return Ok(None);
        };
        let confirmation = match status.confirmation_status {
            Some(level) => Some(Commitment::from_str(&level).map_err(LedgerError::Decode)?),
            None => None,
        };
        Ok(Some(SignatureStatus {
            confirmation,
            err: status.err.map(|err| err.to_string()),
        }))
    }

    async fn account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        let response: WithContext<Option<AccountDto>> = self
            .call(
                "getAccountInfo",
                json!([address.to_string(), self.read_config()]),
            )
            .await?;
        response.value.map(decode_account).transpose()
    }

    async fn multiple_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, LedgerError> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = addresses.iter().map(Pubkey::to_string).collect();
        let response: WithContext<Vec<Option<AccountDto>>> = self
            .call("getMultipleAccounts", json!([keys, self.read_config()]))
            .await?;
        response
            .value
            .into_iter()
            .map(|account| account.map(decode_account).transpose())
            .collect()
    }

    async fn program_account_keys(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<Pubkey>, LedgerError> {
        let mut config = self.read_config();
        config["dataSlice"] = json!({ "offset": 0, "length": 0 });
        config["filters"] = Value::Array(filters.iter().map(filter_json).collect());

        let accounts: Vec<KeyedAccountDto> = self
            .call(
                "getProgramAccounts",
                json!([program_id.to_string(), config]),
            )
            .await?;
        accounts
            .into_iter()
            .map(|keyed| parse_pubkey(&keyed.pubkey))
            .collect()
    }
}

fn filter_json(filter: &AccountFilter) -> Value {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => json!({
            "memcmp": { "offset": offset, "bytes": bs58::encode(bytes).into_string() }
        }),
    }
}

fn parse_pubkey(value: &str) -> Result<Pubkey, LedgerError> {
    Pubkey::from_str(value).map_err(|_| LedgerError::Decode(format!("pubkey `{value}`")))
}

fn decode_account(dto: AccountDto) -> Result<Account, LedgerError> {
    let (payload, encoding) = dto.data;
    if encoding != "base64" {
        return Err(LedgerError::Decode(format!(
            "unexpected account encoding `{encoding}`"
        )));
    }
    let data = STANDARD
        .decode(payload)
        .map_err(|err| LedgerError::Decode(format!("account data: {err}")))?;
    Ok(Account {
        lamports: dto.lamports,
        data,
        owner: parse_pubkey(&dto.owner)?,
        executable: dto.executable,
        rent_epoch: dto.rent_epoch,
    })
}
