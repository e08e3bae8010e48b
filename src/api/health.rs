use axum::{extract::State, Json};
use serde::Serialize;
use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
    pub chains: usize,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.db {
        Some(db) => {
            if db.pool().acquire().await.is_ok() {
                "connected"
            } else {
                "disconnected"
            }
        }
        None => "in-memory",
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        chains: state.registry.profiles().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::state_with;
    use crate::services::testing::FakeEvm;
    use std::sync::Arc;

    #[tokio::test]
    async fn health_reports_in_memory_store_and_chain_count() {
        let state = state_with(Arc::new(FakeEvm::new("https://rpc.example")), "UNUSED_KEY");
        let Json(health) = health_check(State(state)).await;
        assert_eq!(health.database, "in-memory");
        assert_eq!(health.chains, 8);
    }
}
