// src/api/mod.rs
pub mod campaigns;
pub mod chains;
pub mod health;
pub mod rewards;

use axum::http::{HeaderMap, HeaderName};
use std::sync::Arc;

use crate::{
    config::Config,
    constants::ADMIN_KEY_HEADER,
    db::{Database, DistributionAuditLog, InMemoryStore, RewardConfigStore},
    error::{AppError, Result},
    services::{
        chain_registry::ChainRegistry,
        credentials::{CredentialSource, EnvCredentialSource},
        distribution::DistributionExecutor,
        introspector::{ContractIntrospector, Introspect},
        provider_resolver::ProviderResolver,
        reward_config::RewardConfigurator,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ChainRegistry>,
    pub resolver: Arc<ProviderResolver>,
    pub introspector: Arc<dyn Introspect>,
    pub configurator: Arc<RewardConfigurator>,
    pub executor: Arc<DistributionExecutor>,
    pub configs: Arc<dyn RewardConfigStore>,
    pub audit: Arc<dyn DistributionAuditLog>,
    pub credentials: Arc<dyn CredentialSource>,
    pub db: Option<Database>,
}

impl AppState {
    /// Wires live collaborators; falls back to in-memory stores without a database.
    pub fn new(config: Config, db: Option<Database>) -> Self {
        let registry = Arc::new(ChainRegistry::from_config(&config));
        let resolver = Arc::new(ProviderResolver::from_config(registry.clone(), &config));
        let credentials: Arc<dyn CredentialSource> =
            Arc::new(EnvCredentialSource::from_config(&config));

        let configs: Arc<dyn RewardConfigStore>;
        let audit: Arc<dyn DistributionAuditLog>;
        match &db {
            Some(db) => {
                configs = Arc::new(db.clone());
                audit = Arc::new(db.clone());
            }
            None => {
                tracing::warn!("DATABASE_URL not set; reward configs are kept in memory");
                let memory = Arc::new(InMemoryStore::default());
                configs = memory.clone();
                audit = memory;
            }
        }

        Self::from_parts(config, resolver, credentials, configs, audit, db)
    }

    pub fn from_parts(
        config: Config,
        resolver: Arc<ProviderResolver>,
        credentials: Arc<dyn CredentialSource>,
        configs: Arc<dyn RewardConfigStore>,
        audit: Arc<dyn DistributionAuditLog>,
        db: Option<Database>,
    ) -> Self {
        let registry = resolver.shared_registry();
        let introspector: Arc<dyn Introspect> =
            Arc::new(ContractIntrospector::new(resolver.clone()));
        let configurator = Arc::new(RewardConfigurator::new(
            registry.clone(),
            introspector.clone(),
        ));
        let executor = Arc::new(DistributionExecutor::new(resolver.clone()));

        Self {
            config,
            registry,
            resolver,
            introspector,
            configurator,
            executor,
            configs,
            audit,
            credentials,
            db,
        }
    }
}

pub fn require_admin_key(headers: &HeaderMap, state: &AppState) -> Result<()> {
    let expected = state
        .config
        .admin_api_key
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::AuthError(
                "ADMIN_API_KEY is not configured on backend. Distribution is disabled.".to_string(),
            )
        })?;

    let header_name = HeaderName::from_static(ADMIN_KEY_HEADER);
    let provided = headers
        .get(&header_name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            AppError::AuthError(format!(
                "Missing admin key. Send header '{}' to access this endpoint.",
                ADMIN_KEY_HEADER
            ))
        })?;

    if provided != expected {
        return Err(AppError::AuthError("Invalid admin key".to_string()));
    }
    Ok(())
}
