use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod db;
mod error;
mod integrations;
mod models;
mod services;
mod utils;

use config::Config;
use constants::API_VERSION;
use db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reward_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting reward distribution backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);

    let db = match config.database_url.as_deref() {
        Some(url) => {
            let db = Database::new(url, &config).await?;
            tracing::info!("Running database migrations...");
            db.run_migrations().await?;
            Some(db)
        }
        None => None,
    };

    let app_state = api::AppState::new(config.clone(), db);
    tracing::info!(
        "{} chains registered",
        app_state.registry.profiles().len()
    );

    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Chains
        .route("/api/v1/chains", get(api::chains::list_chains))
        .route("/api/v1/chains/status", get(api::chains::chain_status))
        // Reward setup
        .route(
            "/api/v1/rewards/validate-address",
            post(api::rewards::validate_address),
        )
        .route("/api/v1/rewards/introspect", post(api::rewards::introspect))
        .route("/api/v1/rewards/configure", post(api::rewards::configure))
        // Campaigns
        .route(
            "/api/v1/campaigns/{campaign_id}/rewards",
            get(api::campaigns::get_rewards).put(api::campaigns::update_rewards),
        )
        .route(
            "/api/v1/campaigns/{campaign_id}/distribute",
            post(api::campaigns::distribute),
        )
        .route(
            "/api/v1/campaigns/{campaign_id}/distributions",
            get(api::campaigns::list_distributions),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

