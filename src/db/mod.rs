use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::{DistributionResult, UnifiedRewardConfig},
};

#[async_trait]
pub trait RewardConfigStore: Send + Sync {
    async fn load(&self, campaign_id: &str) -> Result<Option<UnifiedRewardConfig>>;
    async fn save(&self, config: &UnifiedRewardConfig) -> Result<()>;
}

#[async_trait]
pub trait DistributionAuditLog: Send + Sync {
    async fn append(&self, campaign_id: &str, result: &DistributionResult) -> Result<()>;
    /// Oldest first.
    async fn list(&self, campaign_id: &str) -> Result<Vec<DistributionResult>>;
}

// ==================== POSTGRES ====================
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, config: &Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Result<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(format!("payload encoding failed: {}", e)))
}

fn from_payload<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Internal(format!("stored payload is unreadable: {}", e)))
}

#[async_trait]
impl RewardConfigStore for Database {
    async fn load(&self, campaign_id: &str) -> Result<Option<UnifiedRewardConfig>> {
        let row = sqlx::query("SELECT payload FROM reward_configs WHERE campaign_id = $1")
            .bind(campaign_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| from_payload(row.try_get::<serde_json::Value, _>("payload")?))
            .transpose()
    }

    async fn save(&self, config: &UnifiedRewardConfig) -> Result<()> {
        sqlx::query(
            "INSERT INTO reward_configs (campaign_id, payload, updated_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (campaign_id) DO UPDATE
             SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at",
        )
        .bind(&config.campaign_id)
        .bind(to_payload(config)?)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DistributionAuditLog for Database {
    async fn append(&self, campaign_id: &str, result: &DistributionResult) -> Result<()> {
        sqlx::query(
            "INSERT INTO distribution_audit (campaign_id, tier, success, payload, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(campaign_id)
        .bind(result.tier.as_str())
        .bind(result.success)
        .bind(to_payload(result)?)
        .bind(result.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, campaign_id: &str) -> Result<Vec<DistributionResult>> {
        let rows = sqlx::query(
            "SELECT payload FROM distribution_audit WHERE campaign_id = $1 ORDER BY id ASC",
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| from_payload(row.try_get::<serde_json::Value, _>("payload")?))
            .collect()
    }
}

// ==================== IN-MEMORY ====================
/// Used when `DATABASE_URL` is unset; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    configs: RwLock<HashMap<String, UnifiedRewardConfig>>,
    audit: RwLock<HashMap<String, Vec<DistributionResult>>>,
}

#[async_trait]
impl RewardConfigStore for InMemoryStore {
    async fn load(&self, campaign_id: &str) -> Result<Option<UnifiedRewardConfig>> {
        Ok(self.configs.read().await.get(campaign_id).cloned())
    }

    async fn save(&self, config: &UnifiedRewardConfig) -> Result<()> {
        self.configs
            .write()
            .await
            .insert(config.campaign_id.clone(), config.clone());
        Ok(())
    }
}

#[async_trait]
impl DistributionAuditLog for InMemoryStore {
    async fn append(&self, campaign_id: &str, result: &DistributionResult) -> Result<()> {
        self.audit
            .write()
            .await
            .entry(campaign_id.to_string())
            .or_default()
            .push(result.clone());
        Ok(())
    }

    async fn list(&self, campaign_id: &str) -> Result<Vec<DistributionResult>> {
        Ok(self
            .audit
            .read()
            .await
            .get(campaign_id)
            .cloned()
            .unwrap_or_default())
    }
}
