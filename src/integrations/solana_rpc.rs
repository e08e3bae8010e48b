use ethers::types::U256;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    services::onchain::{CallError, CallResult, SplReader},
    utils::parse_raw_units,
};

fn rpc_request(method: &str, params: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    })
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount_string: Option<String>,
}

impl TokenAmount {
    pub fn raw(&self) -> Result<U256> {
        parse_raw_units(&self.amount)
    }
}

#[derive(Debug, Deserialize)]
struct KeyedAccount {
    account: ParsedAccount,
}

#[derive(Debug, Deserialize)]
struct ParsedAccount {
    data: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    parsed: ParsedInfo,
}

#[derive(Debug, Deserialize)]
struct ParsedInfo {
    info: TokenAccountInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenAccountInfo {
    token_amount: TokenAmount,
}

/// Solana JSON-RPC client
#[derive(Clone, Debug)]
pub struct SolanaRpcClient {
    rpc_url: String,
    client: Client,
}

impl SolanaRpcClient {
    pub fn new(rpc_url: &str, read_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(read_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build Solana client: {}", e)))?;
        Ok(Self {
            rpc_url: rpc_url.to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.rpc_url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> CallResult<T> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(&rpc_request(method, params))
            .send()
            .await
            .map_err(|e| CallError::Unreachable(format!("{} failed: {}", method, e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Unreachable(format!(
                "{} returned HTTP {}",
                method, status
            )));
        }
        let body: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| CallError::Unreachable(format!("{} decode failed: {}", method, e)))?;
        if let Some(error) = body.error {
            return Err(CallError::Failed(format!(
                "{} error {}: {}",
                method, error.code, error.message
            )));
        }
        body.result
            .ok_or_else(|| CallError::Failed(format!("{} returned no result", method)))
    }

    /// Get current slot
    pub async fn get_slot(&self) -> CallResult<u64> {
        self.request("getSlot", serde_json::json!([])).await
    }
}

#[async_trait]
impl SplReader for SolanaRpcClient {
    async fn token_supply(&self, mint: &str) -> CallResult<TokenAmount> {
        let result: WithContext<TokenAmount> = self
            .request("getTokenSupply", serde_json::json!([mint]))
            .await?;
        Ok(result.value)
    }

    async fn token_balance(&self, owner: &str, mint: &str) -> CallResult<U256> {
        let result: WithContext<Vec<KeyedAccount>> = self
            .request(
                "getTokenAccountsByOwner",
                serde_json::json!([
                    owner,
                    { "mint": mint },
                    { "encoding": "jsonParsed" }
                ]),
            )
            .await?;
        sum_token_accounts(&result.value)
    }
}

fn sum_token_accounts(accounts: &[KeyedAccount]) -> CallResult<U256> {
    let mut total = U256::zero();
    for keyed in accounts {
        let raw = keyed
            .account
            .data
            .parsed
            .info
            .token_amount
            .raw()
            .map_err(|e| CallError::Failed(e.to_string()))?;
        total = total.saturating_add(raw);
    }
    Ok(total)
}
