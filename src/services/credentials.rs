use async_trait::async_trait;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;
use std::fmt;

use crate::{
    config::{override_key, Config},
    error::{AppError, Result},
    models::{AddressFormat, ChainProfile},
};

/// Signing key for one distribution attempt. Never serialized or logged.
pub struct SigningCredential {
    wallet: LocalWallet,
}

impl SigningCredential {
    pub fn from_private_key(key: &str) -> Result<Self> {
        let wallet = key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|_| AppError::CredentialError("private key is not a valid secp256k1 key".to_string()))?;
        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub(crate) fn wallet(&self) -> LocalWallet {
        self.wallet.clone()
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("address", &format!("{:#x}", self.address()))
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Called right before a distribution; the result is dropped afterwards.
    async fn acquire(&self, chain: &ChainProfile) -> Result<SigningCredential>;
}

/// Reads the key from the environment at acquisition time.
///
/// `<VAR>_<CHAIN>` (e.g. `DISTRIBUTOR_PRIVATE_KEY_POLYGON`) wins over `<VAR>`.
pub struct EnvCredentialSource {
    var_name: String,
}

impl EnvCredentialSource {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.distributor_key_env.trim())
    }

    fn lookup(&self, chain: &ChainProfile) -> Option<String> {
        let scoped = format!("{}_{}", self.var_name, override_key(&chain.id));
        [scoped, self.var_name.clone()]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok())
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
    }
}

#[async_trait]
impl CredentialSource for EnvCredentialSource {
    async fn acquire(&self, chain: &ChainProfile) -> Result<SigningCredential> {
        if chain.address_format != AddressFormat::Evm {
            return Err(AppError::CredentialError(format!(
                "no signer available for {} ({} addresses)",
                chain.id, chain.address_format
            )));
        }
        let key = self.lookup(chain).ok_or_else(|| {
            AppError::CredentialError(format!("{} is not set", self.var_name))
        })?;
        let credential = SigningCredential::from_private_key(&key)?;
        tracing::debug!(
            "signer {:#x} acquired for {}",
            credential.address(),
            chain.id
        );
        Ok(credential)
    }
}
