use std::collections::HashMap;

use crate::{
    config::Config,
    error::{AppError, Result},
    models::{AddressFormat, ChainProfile, TokenStandard},
};

const EVM_STANDARDS: [TokenStandard; 3] = [
    TokenStandard::Erc20,
    TokenStandard::Erc1155,
    TokenStandard::Erc721,
];

/// Immutable catalog of supported chains, built once and injected.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    profiles: Vec<ChainProfile>,
    index: HashMap<String, usize>,
}

impl ChainRegistry {
    pub fn new(profiles: Vec<ChainProfile>) -> Self {
        let mut index = HashMap::new();
        for (position, profile) in profiles.iter().enumerate() {
            index.insert(lookup_key(&profile.id), position);
        }
        Self { profiles, index }
    }

    /// Built-in catalog with configured endpoints placed ahead of the public ones.
    pub fn from_config(config: &Config) -> Self {
        let profiles = default_profiles()
            .into_iter()
            .map(|mut profile| {
                let overrides = config.rpc_overrides_for(&profile.id);
                if !overrides.is_empty() {
                    profile.candidate_endpoints =
                        merge_endpoints(overrides, &profile.candidate_endpoints);
                }
                profile
            })
            .collect();
        Self::new(profiles)
    }

    pub fn with_defaults() -> Self {
        Self::new(default_profiles())
    }

    pub fn get(&self, chain_id: &str) -> Result<&ChainProfile> {
        let key = canonical_chain_key(chain_id);
        self.index
            .get(&key)
            .and_then(|position| self.profiles.get(*position))
            .ok_or_else(|| AppError::UnknownChain(chain_id.trim().to_string()))
    }

    pub fn profiles(&self) -> &[ChainProfile] {
        &self.profiles
    }
}

fn lookup_key(id: &str) -> String {
    id.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

// Accepts common aliases ("eth", "bsc", "matic", ...).
fn canonical_chain_key(chain_id: &str) -> String {
    let key = lookup_key(chain_id);
    let canonical = match key.as_str() {
        "eth" | "mainnet" | "1" => "ethereum",
        "matic" | "pol" | "137" => "polygon",
        "bsc" | "bnb" | "binance" | "binancesmartchain" | "56" => "bnbchain",
        "avax" | "avalanchec" | "cchain" | "43114" => "avalanche",
        "chz" | "chilizchain" | "88888" => "chiliz",
        "8453" => "base",
        "sol" => "solana",
        "btc" => "bitcoin",
        _ => return key,
    };
    canonical.to_string()
}

fn merge_endpoints(preferred: &[String], rest: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(preferred.len() + rest.len());
    for url in preferred.iter().chain(rest.iter()) {
        if !merged.iter().any(|existing| existing == url) {
            merged.push(url.clone());
        }
    }
    merged
}

fn evm_profile(id: &str, chain_id: u64, native: &str, endpoints: &[&str]) -> ChainProfile {
    ChainProfile {
        id: id.to_string(),
        numeric_chain_id: chain_id,
        candidate_endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
        native_currency_symbol: native.to_string(),
        address_format: AddressFormat::Evm,
        supported_standards: EVM_STANDARDS.to_vec(),
    }
}

// Last entry of each list is the last-resort default.
pub fn default_profiles() -> Vec<ChainProfile> {
    vec![
        evm_profile(
            "Ethereum",
            1,
            "ETH",
            &[
                "https://eth.llamarpc.com",
                "https://ethereum-rpc.publicnode.com",
                "https://rpc.ankr.com/eth",
                "https://cloudflare-eth.com",
                "https://eth.drpc.org",
            ],
        ),
        evm_profile(
            "Polygon",
            137,
            "POL",
            &[
                "https://polygon-rpc.com",
                "https://polygon-bor-rpc.publicnode.com",
                "https://rpc.ankr.com/polygon",
                "https://polygon.drpc.org",
            ],
        ),
        evm_profile(
            "BNB Chain",
            56,
            "BNB",
            &[
                "https://bsc-dataseed.binance.org",
                "https://bsc-dataseed1.defibit.io",
                "https://bsc-rpc.publicnode.com",
                "https://rpc.ankr.com/bsc",
            ],
        ),
        evm_profile(
            "Avalanche",
            43114,
            "AVAX",
            &[
                "https://api.avax.network/ext/bc/C/rpc",
                "https://avalanche-c-chain-rpc.publicnode.com",
                "https://rpc.ankr.com/avalanche",
            ],
        ),
        evm_profile(
            "Chiliz",
            88888,
            "CHZ",
            &[
                "https://rpc.chiliz.com",
                "https://chiliz-rpc.publicnode.com",
                "https://rpc.ankr.com/chiliz",
            ],
        ),
        evm_profile(
            "Base",
            8453,
            "ETH",
            &[
                "https://mainnet.base.org",
                "https://base-rpc.publicnode.com",
                "https://base.llamarpc.com",
                "https://rpc.ankr.com/base",
            ],
        ),
        ChainProfile {
            id: "Solana".to_string(),
            numeric_chain_id: 101,
            candidate_endpoints: vec![
                "https://api.mainnet-beta.solana.com".to_string(),
                "https://solana-rpc.publicnode.com".to_string(),
                "https://rpc.ankr.com/solana".to_string(),
            ],
            native_currency_symbol: "SOL".to_string(),
            address_format: AddressFormat::Base58,
            supported_standards: vec![TokenStandard::Spl],
        },
        ChainProfile {
            id: "Bitcoin".to_string(),
            numeric_chain_id: 0,
            candidate_endpoints: vec!["https://open-api.unisat.io".to_string()],
            native_currency_symbol: "BTC".to_string(),
            address_format: AddressFormat::Bitcoin,
            supported_standards: vec![TokenStandard::Brc20],
        },
    ]
}
