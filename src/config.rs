use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use url::Url;

use crate::constants::{
    DEFAULT_DISTRIBUTOR_KEY_ENV, DEFAULT_PROBE_TIMEOUT_MS, DEFAULT_READ_TIMEOUT_SECS,
    DEFAULT_RECEIPT_TIMEOUT_SECS, RPC_OVERRIDE_ENV_PREFIX,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Database (in-memory stores when unset)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Chains: upper-cased chain id -> endpoints tried before the public ones
    pub rpc_overrides: HashMap<String, Vec<String>>,
    pub rpc_probe_timeout_ms: u64,
    pub rpc_read_timeout_secs: u64,
    pub distribution_receipt_timeout_secs: u64,

    // BRC-20 indexer
    pub brc20_indexer_api_key: Option<String>,

    // Distribution
    pub admin_api_key: Option<String>,
    pub distributor_key_env: String,

    // CORS
    pub cors_allowed_origins: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,

            rpc_overrides: rpc_overrides_from_env(env::vars()),
            rpc_probe_timeout_ms: env::var("RPC_PROBE_TIMEOUT_MS")
                .unwrap_or_else(|_| DEFAULT_PROBE_TIMEOUT_MS.to_string())
                .parse()?,
            rpc_read_timeout_secs: env::var("RPC_READ_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_READ_TIMEOUT_SECS.to_string())
                .parse()?,
            distribution_receipt_timeout_secs: env::var("DISTRIBUTION_RECEIPT_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_RECEIPT_TIMEOUT_SECS.to_string())
                .parse()?,

            brc20_indexer_api_key: env::var("BRC20_INDEXER_API_KEY").ok(),

            admin_api_key: env::var("ADMIN_API_KEY").ok(),
            distributor_key_env: env::var("DISTRIBUTOR_KEY_ENV")
                .unwrap_or_else(|_| DEFAULT_DISTRIBUTOR_KEY_ENV.to_string()),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc_probe_timeout_ms == 0 {
            anyhow::bail!("RPC_PROBE_TIMEOUT_MS must be > 0");
        }
        if self.rpc_read_timeout_secs == 0 {
            anyhow::bail!("RPC_READ_TIMEOUT_SECS must be > 0");
        }
        if self.distribution_receipt_timeout_secs == 0 {
            anyhow::bail!("DISTRIBUTION_RECEIPT_TIMEOUT_SECS must be > 0");
        }
        if self.distributor_key_env.trim().is_empty() {
            anyhow::bail!("DISTRIBUTOR_KEY_ENV is empty");
        }
        if self.is_production() && self.database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required in production");
        }

        if self.rpc_probe_timeout_ms > 10_000 {
            tracing::warn!(
                "RPC_PROBE_TIMEOUT_MS={} is high; chain resolution may stall",
                self.rpc_probe_timeout_ms
            );
        }
        if self.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; reward configs and audit log are in-memory only");
        }
        if self
            .admin_api_key
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .is_none()
        {
            tracing::warn!("ADMIN_API_KEY not set; distribution endpoint is disabled");
        }
        if self.brc20_indexer_api_key.is_none() {
            tracing::warn!("BRC20_INDEXER_API_KEY not set; BRC-20 reads may be rate limited");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.trim().to_ascii_lowercase().as_str(),
            "prod" | "production" | "mainnet"
        )
    }

    pub fn rpc_overrides_for(&self, chain_id: &str) -> &[String] {
        self.rpc_overrides
            .get(&override_key(chain_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// "BNB Chain" -> "BNB_CHAIN"
pub fn override_key(chain_id: &str) -> String {
    chain_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

pub fn split_rpc_urls(raw: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for url in raw
        .split([',', ';', '\n', '\r', ' '])
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            _ => {
                tracing::warn!("ignoring RPC override {:?}: not an http(s) URL", url);
                continue;
            }
        }
        if !urls.iter().any(|existing| existing == url) {
            urls.push(url.to_string());
        }
    }
    urls
}

fn rpc_overrides_from_env(
    vars: impl Iterator<Item = (String, String)>,
) -> HashMap<String, Vec<String>> {
    let mut overrides = HashMap::new();
    for (key, value) in vars {
        let Some(chain) = key.strip_prefix(RPC_OVERRIDE_ENV_PREFIX) else {
            continue;
        };
        let urls = split_rpc_urls(&value);
        if chain.is_empty() || urls.is_empty() {
            continue;
        }
        overrides.insert(chain.to_ascii_uppercase(), urls);
    }
    overrides
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        environment: "development".to_string(),
        database_url: None,
        database_max_connections: 1,
        rpc_overrides: HashMap::new(),
        rpc_probe_timeout_ms: 50,
        rpc_read_timeout_secs: 1,
        distribution_receipt_timeout_secs: 1,
        brc20_indexer_api_key: None,
        admin_api_key: Some("admin".to_string()),
        distributor_key_env: "TEST_DISTRIBUTOR_PRIVATE_KEY".to_string(),
        cors_allowed_origins: "*".to_string(),
    }
}
