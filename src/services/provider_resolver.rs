use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

use crate::{
    config::Config,
    error::{AppError, Result},
    integrations::{brc20_indexer::Brc20Indexer, solana_rpc::SolanaRpcClient},
    models::{AddressFormat, ChainProfile},
};

use super::{
    chain_registry::ChainRegistry,
    onchain::{EvmClient, EvmReader, HttpEvmClient},
};

/// A connection whose endpoint answered a liveness probe.
#[derive(Clone)]
pub enum LiveConnection {
    Evm(Arc<dyn EvmClient>),
    Solana(SolanaRpcClient),
    Bitcoin(Brc20Indexer),
}

impl LiveConnection {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Evm(client) => client.endpoint(),
            Self::Solana(client) => client.endpoint(),
            Self::Bitcoin(indexer) => indexer.endpoint(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Evm(_) => "evm",
            Self::Solana(_) => "solana",
            Self::Bitcoin(_) => "brc20-indexer",
        }
    }
}

impl std::fmt::Debug for LiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveConnection")
            .field("kind", &self.kind())
            .field("endpoint", &self.endpoint())
            .finish()
    }
}

/// Opens a client for one endpoint and proves it answers.
#[async_trait]
pub trait EndpointConnector: Send + Sync {
    async fn connect(&self, chain: &ChainProfile, endpoint: &str) -> Result<LiveConnection>;
}

pub struct RpcEndpointConnector {
    read_timeout: Duration,
    receipt_timeout: Duration,
    brc20_api_key: Option<String>,
}

impl RpcEndpointConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            read_timeout: Duration::from_secs(config.rpc_read_timeout_secs),
            receipt_timeout: Duration::from_secs(config.distribution_receipt_timeout_secs),
            brc20_api_key: config.brc20_indexer_api_key.clone(),
        }
    }
}

#[async_trait]
impl EndpointConnector for RpcEndpointConnector {
    async fn connect(&self, chain: &ChainProfile, endpoint: &str) -> Result<LiveConnection> {
        match chain.address_format {
            AddressFormat::Evm => {
                let client = HttpEvmClient::new(
                    endpoint,
                    chain.numeric_chain_id,
                    self.read_timeout,
                    self.receipt_timeout,
                )?;
                let block = client.block_number().await.map_err(|e| e.into_app_error())?;
                tracing::debug!("{} endpoint {} at block {}", chain.id, endpoint, block);
                Ok(LiveConnection::Evm(Arc::new(client)))
            }
            AddressFormat::Base58 => {
                let client = SolanaRpcClient::new(endpoint, self.read_timeout)?;
                let slot = client.get_slot().await.map_err(|e| e.into_app_error())?;
                tracing::debug!("{} endpoint {} at slot {}", chain.id, endpoint, slot);
                Ok(LiveConnection::Solana(client))
            }
            AddressFormat::Bitcoin => {
                let indexer =
                    Brc20Indexer::new(endpoint, self.brc20_api_key.clone(), self.read_timeout)?;
                let info = indexer
                    .blockchain_info()
                    .await
                    .map_err(|e| e.into_app_error())?;
                tracing::debug!("{} indexer {} at height {}", chain.id, endpoint, info.blocks);
                Ok(LiveConnection::Bitcoin(indexer))
            }
        }
    }
}

/// Picks the first candidate endpoint of a chain that answers in time.
pub struct ProviderResolver {
    registry: Arc<ChainRegistry>,
    connector: Arc<dyn EndpointConnector>,
    probe_timeout: Duration,
}

impl ProviderResolver {
    pub fn new(
        registry: Arc<ChainRegistry>,
        connector: Arc<dyn EndpointConnector>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            connector,
            probe_timeout,
        }
    }

    pub fn from_config(registry: Arc<ChainRegistry>, config: &Config) -> Self {
        Self::new(
            registry,
            Arc::new(RpcEndpointConnector::new(config)),
            Duration::from_millis(config.rpc_probe_timeout_ms),
        )
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn shared_registry(&self) -> Arc<ChainRegistry> {
        self.registry.clone()
    }

    pub async fn resolve(&self, chain_id: &str) -> Result<LiveConnection> {
        let chain = self.registry.get(chain_id)?;
        self.resolve_profile(chain).await
    }

    /// Candidates are tried strictly in order, each bounded by the probe timeout.
    pub async fn resolve_profile(&self, chain: &ChainProfile) -> Result<LiveConnection> {
        let started = Instant::now();
        for endpoint in &chain.candidate_endpoints {
            match timeout(self.probe_timeout, self.connector.connect(chain, endpoint)).await {
                Ok(Ok(connection)) => {
                    tracing::info!(
                        "{} resolved to {} in {}ms",
                        chain.id,
                        endpoint,
                        started.elapsed().as_millis()
                    );
                    return Ok(connection);
                }
                Ok(Err(err)) => {
                    tracing::warn!("{} endpoint {} failed probe: {}", chain.id, endpoint, err);
                }
                Err(_) => {
                    tracing::warn!(
                        "{} endpoint {} timed out after {}ms",
                        chain.id,
                        endpoint,
                        self.probe_timeout.as_millis()
                    );
                }
            }
        }

        tracing::error!(
            "{} unavailable: {} endpoints exhausted",
            chain.id,
            chain.candidate_endpoints.len()
        );
        Err(AppError::ChainUnavailable {
            chain: chain.id.clone(),
            attempts: chain.candidate_endpoints.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeEvm;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Probe {
        Up,
        Down,
        Hang,
    }

    struct ScriptedConnector {
        script: HashMap<String, Probe>,
        attempts: Mutex<Vec<String>>,
    }

    impl ScriptedConnector {
        fn new(script: &[(&str, Probe)]) -> Self {
            Self {
                script: script
                    .iter()
                    .map(|(url, probe)| (url.to_string(), *probe))
                    .collect(),
                attempts: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EndpointConnector for ScriptedConnector {
        async fn connect(&self, _chain: &ChainProfile, endpoint: &str) -> Result<LiveConnection> {
            self.attempts.lock().unwrap().push(endpoint.to_string());
            match self.script.get(endpoint).copied().unwrap_or(Probe::Down) {
                Probe::Up => Ok(LiveConnection::Evm(Arc::new(FakeEvm::new(endpoint)))),
                Probe::Down => Err(AppError::NetworkError("connection refused".to_string())),
                Probe::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(AppError::NetworkError("unreachable".to_string()))
                }
            }
        }
    }

    fn chain(endpoints: &[&str]) -> ChainProfile {
        let mut profile = ChainRegistry::with_defaults()
            .get("Ethereum")
            .unwrap()
            .clone();
        profile.candidate_endpoints = endpoints.iter().map(|s| s.to_string()).collect();
        profile
    }

    fn resolver(connector: Arc<ScriptedConnector>) -> ProviderResolver {
        ProviderResolver::new(
            Arc::new(ChainRegistry::with_defaults()),
            connector,
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn first_responsive_endpoint_wins() {
        let connector = Arc::new(ScriptedConnector::new(&[
            ("https://a.example", Probe::Down),
            ("https://b.example", Probe::Up),
            ("https://c.example", Probe::Up),
        ]));
        let resolver = resolver(connector.clone());
        let profile = chain(&["https://a.example", "https://b.example", "https://c.example"]);

        let connection = resolver.resolve_profile(&profile).await.unwrap();
        assert_eq!(connection.endpoint(), "https://b.example");
        assert_eq!(
            connector.attempts(),
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[tokio::test]
    async fn hanging_endpoints_are_bounded_by_probe_timeout() {
        let connector = Arc::new(ScriptedConnector::new(&[
            ("https://a.example", Probe::Hang),
            ("https://b.example", Probe::Hang),
            ("https://c.example", Probe::Up),
        ]));
        let resolver = resolver(connector);
        let profile = chain(&["https://a.example", "https://b.example", "https://c.example"]);

        let started = Instant::now();
        let connection = resolver.resolve_profile(&profile).await.unwrap();
        assert_eq!(connection.endpoint(), "https://c.example");
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn exhausted_candidates_report_chain_unavailable() {
        let connector = Arc::new(ScriptedConnector::new(&[
            ("https://a.example", Probe::Down),
            ("https://b.example", Probe::Hang),
        ]));
        let resolver = resolver(connector.clone());
        let profile = chain(&["https://a.example", "https://b.example"]);

        let err = resolver.resolve_profile(&profile).await.unwrap_err();
        match err {
            AppError::ChainUnavailable { chain, attempts } => {
                assert_eq!(chain, "Ethereum");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err_is_retryable(&resolver, &profile).await);
        assert_eq!(connector.attempts().len(), 4);
    }

    async fn err_is_retryable(resolver: &ProviderResolver, profile: &ChainProfile) -> bool {
        resolver
            .resolve_profile(profile)
            .await
            .map(|_| false)
            .unwrap_or_else(|e| e.is_retryable())
    }

    #[tokio::test]
    async fn unknown_chain_is_rejected_before_probing() {
        let connector = Arc::new(ScriptedConnector::new(&[]));
        let resolver = resolver(connector.clone());
        assert!(matches!(
            resolver.resolve("Fantom").await,
            Err(AppError::UnknownChain(_))
        ));
        assert!(connector.attempts().is_empty());
    }
}
