use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider, ProviderError, RpcError},
    signers::{LocalWallet, Signer},
    types::{transaction::eip2718::TypedTransaction, Address, Bytes, TransactionRequest, U256, U64},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::{
    constants::RECEIPT_POLL_INTERVAL_MS,
    error::{AppError, Result},
    integrations::{
        brc20_indexer::{TickerBalance, TickerInfo},
        solana_rpc::TokenAmount,
    },
};

/// Outcome of a read that did not return data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The endpoint did not answer (transport failure, rate limit, timeout).
    Unreachable(String),
    /// The endpoint answered but the call reverted or is not implemented.
    Failed(String),
}

impl CallError {
    pub fn into_app_error(self) -> AppError {
        match self {
            Self::Unreachable(msg) => AppError::NetworkError(msg),
            Self::Failed(msg) => AppError::InvalidContract(msg),
        }
    }
}

pub type CallResult<T> = std::result::Result<T, CallError>;

#[async_trait]
pub trait EvmReader: Send + Sync {
    fn endpoint(&self) -> &str;
    async fn block_number(&self) -> CallResult<u64>;
    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> CallResult<Bytes>;
    async fn code_size(&self, address: Address) -> CallResult<usize>;
}

/// Submits state-changing calls from one signer and waits for inclusion.
#[async_trait]
pub trait EvmInvoker: Send + Sync {
    fn sender(&self) -> Address;
    /// Returns the transaction hash once the receipt reports success.
    async fn submit(&self, to: Address, data: Bytes) -> Result<String>;
}

pub trait EvmClient: EvmReader {
    fn invoker(&self, wallet: LocalWallet) -> Arc<dyn EvmInvoker>;
}

/// SPL token reads on a Solana cluster.
#[async_trait]
pub trait SplReader: Send + Sync {
    /// Fails with `CallError::Failed` when `mint` is not a token mint.
    async fn token_supply(&self, mint: &str) -> CallResult<TokenAmount>;
    /// Sum of `owner`'s token accounts for `mint`, in raw units.
    async fn token_balance(&self, owner: &str, mint: &str) -> CallResult<U256>;
}

#[async_trait]
pub trait Brc20Reader: Send + Sync {
    async fn ticker(&self, ticker: &str) -> CallResult<TickerInfo>;
    async fn holding(&self, address: &str, ticker: &str) -> CallResult<TickerBalance>;
}

pub struct HttpEvmClient {
    endpoint: String,
    chain_id: u64,
    provider: Provider<Http>,
    read_timeout: Duration,
    receipt_timeout: Duration,
}

impl HttpEvmClient {
    pub fn new(
        endpoint: &str,
        chain_id: u64,
        read_timeout: Duration,
        receipt_timeout: Duration,
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(endpoint)
            .map_err(|e| AppError::Internal(format!("Invalid EVM RPC URL {}: {}", endpoint, e)))?
            .interval(Duration::from_millis(RECEIPT_POLL_INTERVAL_MS));
        Ok(Self {
            endpoint: endpoint.to_string(),
            chain_id,
            provider,
            read_timeout,
            receipt_timeout,
        })
    }

    async fn bounded<T, F>(&self, method: &str, fut: F) -> CallResult<T>
    where
        F: std::future::Future<Output = std::result::Result<T, ProviderError>>,
    {
        match timeout(self.read_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(classify_provider_error(method, err)),
            Err(_) => Err(CallError::Unreachable(format!(
                "{} timed out after {}ms on {}",
                method,
                self.read_timeout.as_millis(),
                self.endpoint
            ))),
        }
    }
}

#[async_trait]
impl EvmReader for HttpEvmClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn block_number(&self) -> CallResult<u64> {
        let block = self
            .bounded("eth_blockNumber", self.provider.get_block_number())
            .await?;
        Ok(block.as_u64())
    }

    async fn call(&self, to: Address, data: Bytes) -> CallResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.bounded("eth_call", self.provider.call(&tx, None)).await
    }

    async fn code_size(&self, address: Address) -> CallResult<usize> {
        let code = self
            .bounded("eth_getCode", self.provider.get_code(address, None))
            .await?;
        Ok(code.len())
    }
}

impl EvmClient for HttpEvmClient {
    fn invoker(&self, wallet: LocalWallet) -> Arc<dyn EvmInvoker> {
        let wallet = wallet.with_chain_id(self.chain_id);
        Arc::new(SignedEvmInvoker {
            client: SignerMiddleware::new(self.provider.clone(), wallet),
            receipt_timeout: self.receipt_timeout,
        })
    }
}

struct SignedEvmInvoker {
    client: SignerMiddleware<Provider<Http>, LocalWallet>,
    receipt_timeout: Duration,
}

#[async_trait]
impl EvmInvoker for SignedEvmInvoker {
    fn sender(&self) -> Address {
        self.client.address()
    }

    async fn submit(&self, to: Address, data: Bytes) -> Result<String> {
        let tx = TransactionRequest::new().to(to).data(data);
        let pending = self
            .client
            .send_transaction(tx, None)
            .await
            .map_err(|e| AppError::DistributionFailure(format!("send failed: {}", e)))?;
        let tx_hash = format!("{:#x}", pending.tx_hash());
        tracing::info!("submitted {} to {:#x}", tx_hash, to);

        let receipt = match timeout(self.receipt_timeout, pending).await {
            Ok(Ok(Some(receipt))) => receipt,
            Ok(Ok(None)) => {
                return Err(AppError::DistributionFailure(format!(
                    "transaction {} dropped from mempool",
                    tx_hash
                )))
            }
            Ok(Err(e)) => {
                return Err(AppError::DistributionFailure(format!(
                    "receipt for {} unavailable: {}",
                    tx_hash, e
                )))
            }
            Err(_) => {
                return Err(AppError::DistributionFailure(format!(
                    "transaction {} not confirmed within {}s",
                    tx_hash,
                    self.receipt_timeout.as_secs()
                )))
            }
        };

        if receipt.status != Some(U64::one()) {
            return Err(AppError::DistributionFailure(format!(
                "transaction {} reverted",
                tx_hash
            )));
        }
        Ok(tx_hash)
    }
}

fn classify_provider_error(method: &str, err: ProviderError) -> CallError {
    let message = format!("{} failed: {}", method, err);
    let answered = match &err {
        ProviderError::JsonRpcClientError(inner) => inner.as_error_response().is_some(),
        _ => false,
    };
    classify_message(answered, message)
}

// A JSON-RPC error body still counts as unreachable when it is a rate limit.
fn classify_message(answered: bool, message: String) -> CallError {
    if answered && !looks_like_transient_evm_error(&message) {
        return CallError::Failed(message);
    }
    CallError::Unreachable(message)
}

fn looks_like_transient_evm_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("too many requests")
        || lower.contains("429")
        || lower.contains("rate limit")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("gateway")
        || lower.contains("temporarily unavailable")
        || lower.contains("connection reset")
        || lower.contains("eof while parsing")
}
