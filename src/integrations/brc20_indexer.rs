use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    services::onchain::{Brc20Reader, CallError, CallResult},
};

/// UniSat-compatible BRC-20 indexer.
#[derive(Clone, Debug)]
pub struct Brc20Indexer {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct IndexerEnvelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockchainInfo {
    pub blocks: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerInfo {
    pub ticker: String,
    #[serde(default)]
    pub max: Option<String>,
    #[serde(default)]
    pub minted: Option<String>,
    #[serde(default)]
    pub decimal: Option<u8>,
}

impl TickerInfo {
    /// Circulating amount as a decimal string; falls back to the deploy max.
    pub fn supply(&self) -> Option<&str> {
        self.minted
            .as_deref()
            .or(self.max.as_deref())
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerBalance {
    #[serde(default)]
    pub overall_balance: Option<String>,
    #[serde(default)]
    pub available_balance: Option<String>,
    #[serde(default)]
    pub transferable_balance: Option<String>,
}

impl TickerBalance {
    pub fn overall(&self) -> &str {
        self.overall_balance
            .as_deref()
            .or(self.available_balance.as_deref())
            .unwrap_or("0")
    }
}

impl Brc20Indexer {
    pub fn new(base_url: &str, api_key: Option<String>, read_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(read_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build indexer client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> CallResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.get(&url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        let response = req
            .send()
            .await
            .map_err(|e| CallError::Unreachable(format!("GET {} failed: {}", path, e)))?;
        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(CallError::Unreachable(format!(
                "GET {} returned HTTP {}",
                path, status
            )));
        }
        if !status.is_success() {
            return Err(CallError::Failed(format!(
                "GET {} returned HTTP {}",
                path, status
            )));
        }
        let envelope: IndexerEnvelope<T> = response
            .json()
            .await
            .map_err(|e| CallError::Unreachable(format!("GET {} decode failed: {}", path, e)))?;
        unwrap_envelope(path, envelope)
    }

    pub async fn blockchain_info(&self) -> CallResult<BlockchainInfo> {
        self.get("/v1/indexer/blockchain/info").await
    }
}

#[async_trait]
impl Brc20Reader for Brc20Indexer {
    async fn ticker(&self, ticker: &str) -> CallResult<TickerInfo> {
        self.get(&format!("/v1/indexer/brc20/{}/info", ticker)).await
    }

    async fn holding(&self, address: &str, ticker: &str) -> CallResult<TickerBalance> {
        self.get(&format!(
            "/v1/indexer/address/{}/brc20/{}/info",
            address, ticker
        ))
        .await
    }
}

fn unwrap_envelope<T>(path: &str, envelope: IndexerEnvelope<T>) -> CallResult<T> {
    if envelope.code != 0 {
        return Err(CallError::Failed(format!(
            "GET {} returned code {}: {}",
            path, envelope.code, envelope.msg
        )));
    }
    envelope
        .data
        .ok_or_else(|| CallError::Failed(format!("GET {} returned no data", path)))
}
