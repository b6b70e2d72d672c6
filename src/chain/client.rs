use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as B64, Engine};
use reqwest::Client;
use rocket::serde::json::{serde_json, Value};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use solana_sdk::transaction::Transaction;

use super::{
    pubkey::{Hash, Pubkey},
    transaction::VoteTransaction,
};

/// Substrings with which the runtime reports that an account being created
/// already exists.
const EXISTING_ACCOUNT_MARKERS: [&str; 2] = ["already in use", "Account already exists"];

/// Whether an error text reports an attempt to create an existing account.
pub fn mentions_existing_account(text: &str) -> bool {
    EXISTING_ACCOUNT_MARKERS.iter().any(|m| text.contains(m))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The node could not be reached or answered with garbage. Safe to retry.
    #[error("chain query failed: {0}")]
    QueryFailed(String),
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        logs: Vec<String>,
    },
    #[error("transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },
    #[error("transaction {0} was not confirmed in time")]
    Unconfirmed(String),
}

impl ChainError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueryFailed(_) | Self::Unconfirmed(_))
    }

    /// Whether the failure says the account being created exists already,
    /// which for vote accounts means the vote was cast before.
    pub fn is_existing_account(&self) -> bool {
        match self {
            Self::Rpc { message, logs, .. } => {
                mentions_existing_account(message)
                    || logs.iter().any(|l| mentions_existing_account(l))
            }
            Self::TransactionFailed { reason, .. } => mentions_existing_account(reason),
            _ => false,
        }
    }
}

/// Match accounts whose data contains `bytes` at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedAccount {
    pub pubkey: Pubkey,
    pub data: Vec<u8>,
}

/// The ledger operations the voting system relies on.
#[rocket::async_trait]
pub trait ChainClient: Send + Sync {
    /// Data of the account at `address`, or `None` if it does not exist.
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ChainError>;

    /// Every account owned by `program_id` passing all the filters.
    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<KeyedAccount>, ChainError>;

    async fn latest_blockhash(&self) -> Result<Hash, ChainError>;

    /// Broadcast a fully signed transaction and wait for confirmation,
    /// returning its signature.
    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<String, ChainError>;
}

/// Shared chain client, placed in managed state.
#[derive(Clone)]
pub struct ChainHandle(Arc<dyn ChainClient>);

impl ChainHandle {
    pub fn new(client: impl ChainClient + 'static) -> Self {
        Self(Arc::new(client))
    }
}

impl Deref for ChainHandle {
    type Target = dyn ChainClient;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Speaks the JSON-RPC dialect of a Solana-compatible node.
pub struct RpcChainClient {
    http: Client,
    url: String,
    commitment: String,
    confirm_attempts: u32,
    confirm_interval: Duration,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<RpcErrorData>,
}

#[derive(Deserialize)]
struct RpcErrorData {
    #[serde(default)]
    logs: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Deserialize)]
struct RpcAccount {
    /// `[base64, "base64"]`
    data: (String, String),
}

#[derive(Deserialize)]
struct RpcKeyedAccount {
    pubkey: String,
    account: RpcAccount,
}

#[derive(Deserialize)]
struct RpcBlockhash {
    blockhash: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcSignatureStatus {
    err: Option<Value>,
    confirmation_status: Option<String>,
}

impl RpcChainClient {
    pub fn new(
        url: impl Into<String>,
        commitment: impl Into<String>,
        confirm_attempts: u32,
        confirm_interval: Duration,
    ) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
            commitment: commitment.into(),
            confirm_attempts,
            confirm_interval,
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        debug!("RPC {method}");
        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ChainError::QueryFailed(format!("{method}: {e}")))?
            .json()
            .await
            .map_err(|e| ChainError::QueryFailed(format!("{method}: {e}")))?;

        if let Some(error) = response.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
                logs: error.data.and_then(|d| d.logs).unwrap_or_default(),
            });
        }
        response
            .result
            .ok_or_else(|| ChainError::QueryFailed(format!("{method}: empty response")))
    }

    fn decode_data(method: &str, data: &(String, String)) -> Result<Vec<u8>, ChainError> {
        B64.decode(&data.0)
            .map_err(|e| ChainError::QueryFailed(format!("{method}: bad account data: {e}")))
    }
}

#[rocket::async_trait]
impl ChainClient for RpcChainClient {
    async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ChainError> {
        const METHOD: &str = "getAccountInfo";
        let params = serde_json::json!([
            address.to_string(),
            { "encoding": "base64", "commitment": self.commitment }
        ]);
        let info: WithContext<Option<RpcAccount>> = self.call(METHOD, params).await?;
        info.value
            .map(|account| Self::decode_data(METHOD, &account.data))
            .transpose()
    }

    async fn program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[MemcmpFilter],
    ) -> Result<Vec<KeyedAccount>, ChainError> {
        const METHOD: &str = "getProgramAccounts";
        let filters: Vec<Value> = filters
            .iter()
            .map(|f| {
                serde_json::json!({
                    "memcmp": {
                        "offset": f.offset,
                        "bytes": B64.encode(&f.bytes),
                        "encoding": "base64"
                    }
                })
            })
            .collect();
        let params = serde_json::json!([
            program_id.to_string(),
            { "encoding": "base64", "commitment": self.commitment, "filters": filters }
        ]);
        let accounts: Vec<RpcKeyedAccount> = self.call(METHOD, params).await?;
        accounts
            .into_iter()
            .map(|keyed| {
                Ok(KeyedAccount {
                    pubkey: keyed
                        .pubkey
                        .parse()
                        .map_err(|e| ChainError::QueryFailed(format!("{METHOD}: {e}")))?,
                    data: Self::decode_data(METHOD, &keyed.account.data)?,
                })
            })
            .collect()
    }

    async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
        const METHOD: &str = "getLatestBlockhash";
        let params = serde_json::json!([{ "commitment": self.commitment }]);
        let latest: WithContext<RpcBlockhash> = self.call(METHOD, params).await?;
        latest
            .value
            .blockhash
            .parse()
            .map_err(|e| ChainError::QueryFailed(format!("{METHOD}: {e}")))
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<String, ChainError> {
        let encoded = transaction
            .to_base64()
            .map_err(|e| ChainError::QueryFailed(format!("sendTransaction: {e}")))?;
        let params = serde_json::json!([
            encoded,
            { "encoding": "base64", "preflightCommitment": self.commitment }
        ]);
        let signature: String = self.call("sendTransaction", params).await?;
        info!("Sent transaction {signature}, awaiting confirmation");

        for _ in 0..self.confirm_attempts {
            let params = serde_json::json!([[signature]]);
            let statuses: WithContext<Vec<Option<RpcSignatureStatus>>> =
                self.call("getSignatureStatuses", params).await?;
            if let Some(Some(status)) = statuses.value.into_iter().next() {
                if let Some(err) = status.err {
                    return Err(ChainError::TransactionFailed {
                        signature,
                        reason: err.to_string(),
                    });
                }
                let reached = match status.confirmation_status.as_deref() {
                    Some("finalized") => true,
                    Some("confirmed") => self.commitment != "finalized",
                    Some("processed") => self.commitment == "processed",
                    _ => false,
                };
                if reached {
                    return Ok(signature);
                }
            }
            rocket::tokio::time::sleep(self.confirm_interval).await;
        }
        Err(ChainError::Unconfirmed(signature))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// An in-memory ledger with a single program.
    #[derive(Default)]
    pub struct MockChain {
        pub accounts: Mutex<BTreeMap<Pubkey, Vec<u8>>>,
        pub sent: Mutex<Vec<Transaction>>,
        /// Returned by the next `send_and_confirm` instead of succeeding.
        pub send_error: Mutex<Option<ChainError>>,
        pub fail_queries: bool,
        pub calls: AtomicUsize,
    }

    impl MockChain {
        pub fn with_account(self, address: Pubkey, data: Vec<u8>) -> Self {
            self.accounts.lock().unwrap().insert(address, data);
            self
        }

        pub fn failing() -> Self {
            Self {
                fail_queries: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn enter(&self) -> Result<(), ChainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries {
                Err(ChainError::QueryFailed("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[rocket::async_trait]
    impl ChainClient for MockChain {
        async fn account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, ChainError> {
            self.enter()?;
            Ok(self.accounts.lock().unwrap().get(address).cloned())
        }

        async fn program_accounts(
            &self,
            _program_id: &Pubkey,
            filters: &[MemcmpFilter],
        ) -> Result<Vec<KeyedAccount>, ChainError> {
            self.enter()?;
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
                .map(|(pubkey, data)| KeyedAccount {
                    pubkey: *pubkey,
                    data: data.clone(),
                })
                .collect())
        }

        async fn latest_blockhash(&self) -> Result<Hash, ChainError> {
            self.enter()?;
            Ok(Hash::new_from_array([5; 32]))
        }

        async fn send_and_confirm(&self, transaction: &Transaction) -> Result<String, ChainError> {
            self.enter()?;
            if let Some(error) = self.send_error.lock().unwrap().take() {
                return Err(error);
            }
            self.sent.lock().unwrap().push(transaction.clone());
            Ok(transaction.id().unwrap_or_default())
        }
    }
}
