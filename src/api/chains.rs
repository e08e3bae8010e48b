use axum::{extract::State, Json};
use serde::Serialize;

use crate::{
    error::Result,
    models::{AddressFormat, ApiResponse, ChainProfile, TokenStandard},
};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct ChainSummary {
    pub id: String,
    pub numeric_chain_id: u64,
    pub native_currency_symbol: String,
    pub address_format: AddressFormat,
    pub supported_standards: Vec<TokenStandard>,
    pub endpoint_count: usize,
}

impl From<&ChainProfile> for ChainSummary {
    fn from(profile: &ChainProfile) -> Self {
        Self {
            id: profile.id.clone(),
            numeric_chain_id: profile.numeric_chain_id,
            native_currency_symbol: profile.native_currency_symbol.clone(),
            address_format: profile.address_format,
            supported_standards: profile.supported_standards.clone(),
            endpoint_count: profile.candidate_endpoints.len(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChainStatus {
    pub id: String,
    pub available: bool,
    pub endpoint: Option<String>,
    pub error: Option<String>,
}

/// GET /api/v1/chains
pub async fn list_chains(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ChainSummary>>>> {
    let chains = state
        .registry
        .profiles()
        .iter()
        .map(ChainSummary::from)
        .collect();
    Ok(Json(ApiResponse::success(chains)))
}

/// GET /api/v1/chains/status
///
/// Resolves every chain at once; one unavailable chain does not fail the call.
pub async fn chain_status(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ChainStatus>>>> {
    let probes = state.registry.profiles().iter().map(|profile| {
        let resolver = state.resolver.clone();
        async move {
            match resolver.resolve_profile(profile).await {
                Ok(connection) => ChainStatus {
                    id: profile.id.clone(),
                    available: true,
                    endpoint: Some(connection.endpoint().to_string()),
                    error: None,
                },
                Err(err) => ChainStatus {
                    id: profile.id.clone(),
                    available: false,
                    endpoint: None,
                    error: Some(err.to_string()),
                },
            }
        }
    });

    let statuses = futures_util::future::join_all(probes).await;
    Ok(Json(ApiResponse::success(statuses)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::state_with;
    use crate::services::testing::FakeEvm;
    use std::sync::Arc;

    #[tokio::test]
    async fn list_chains_hides_endpoint_urls() {
        let state = state_with(Arc::new(FakeEvm::new("https://rpc.example")), "UNUSED_KEY");
        let Json(response) = list_chains(State(state)).await.unwrap();
        let bitcoin = response.data.iter().find(|c| c.id == "Bitcoin").unwrap();
        assert_eq!(bitcoin.supported_standards, vec![TokenStandard::Brc20]);
        assert_eq!(bitcoin.endpoint_count, 1);
        let json = serde_json::to_string(&response.data).unwrap();
        assert!(!json.contains("https://"));
    }

    #[tokio::test]
    async fn chain_status_reports_each_chain_independently() {
        let state = state_with(Arc::new(FakeEvm::new("https://rpc.example")), "UNUSED_KEY");
        let Json(response) = chain_status(State(state)).await.unwrap();
        assert_eq!(response.data.len(), 8);

        let ethereum = response.data.iter().find(|c| c.id == "Ethereum").unwrap();
        assert!(ethereum.available);
        assert_eq!(ethereum.endpoint.as_deref(), Some("https://rpc.example"));

        let solana = response.data.iter().find(|c| c.id == "Solana").unwrap();
        assert!(!solana.available);
        assert!(solana.error.as_deref().unwrap().contains("unavailable"));
    }
}
