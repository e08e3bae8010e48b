//! Reads token metadata and a holder balance from a live endpoint.
//!
//! Each field degrades to its documented default when the contract does not
//! support the read; the fields that were defaulted are listed on the
//! descriptor. An endpoint that stops answering aborts the whole read with
//! `NetworkError`. Descriptors are never cached here.

mod brc20;
pub mod decode;
mod evm;
mod solana;

pub(crate) use evm::parse_token_id;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    models::{ChainProfile, ContractDescriptor, DescriptorField, TokenStandard},
};

use super::{
    address_validator,
    onchain::{CallError, CallResult},
    provider_resolver::{LiveConnection, ProviderResolver},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntrospectionRequest {
    pub chain_id: String,
    pub contract_address: String,
    pub standard: TokenStandard,
    pub holder_address: String,
    #[serde(default)]
    pub token_id: Option<String>,
}

#[async_trait]
pub trait Introspect: Send + Sync {
    async fn introspect(&self, request: &IntrospectionRequest) -> Result<ContractDescriptor>;
}

pub struct ContractIntrospector {
    resolver: Arc<ProviderResolver>,
}

impl ContractIntrospector {
    pub fn new(resolver: Arc<ProviderResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Introspect for ContractIntrospector {
    async fn introspect(&self, request: &IntrospectionRequest) -> Result<ContractDescriptor> {
        let chain = self.resolver.registry().get(&request.chain_id)?;
        chain.ensure_supports(request.standard)?;
        address_validator::validate_contract_reference(
            &request.contract_address,
            chain,
            request.standard,
        )?;
        address_validator::validate(&request.holder_address, chain.address_format)?;

        let connection = self.resolver.resolve_profile(chain).await?;
        let descriptor = describe(&connection, chain, request).await?;
        if !descriptor.defaulted_fields.is_empty() {
            tracing::info!(
                "{} {} on {} resolved with defaults for {:?}",
                descriptor.standard,
                descriptor.contract_address,
                chain.id,
                descriptor.defaulted_fields
            );
        }
        Ok(descriptor)
    }
}

/// Reads a descriptor over an already resolved connection.
pub async fn describe(
    connection: &LiveConnection,
    chain: &ChainProfile,
    request: &IntrospectionRequest,
) -> Result<ContractDescriptor> {
    match (connection, request.standard) {
        (LiveConnection::Evm(client), standard) if standard.is_evm() => {
            evm::describe(client.as_ref(), chain, request).await
        }
        (LiveConnection::Solana(client), TokenStandard::Spl) => {
            solana::describe(client, chain, request).await
        }
        (LiveConnection::Bitcoin(indexer), TokenStandard::Brc20) => {
            brc20::describe(indexer, chain, request).await
        }
        (connection, standard) => Err(AppError::UnsupportedStandard(format!(
            "{} cannot be read over a {} connection",
            standard,
            connection.kind()
        ))),
    }
}

/// Records which fields fell back to their defaults.
#[derive(Debug, Default)]
struct FieldDefaults {
    fields: Vec<DescriptorField>,
}

impl FieldDefaults {
    fn settle<T>(&mut self, field: DescriptorField, read: CallResult<T>, default: T) -> Result<T> {
        match read {
            Ok(value) => Ok(value),
            Err(CallError::Unreachable(message)) => Err(AppError::NetworkError(message)),
            Err(CallError::Failed(message)) => {
                tracing::debug!("{:?} unavailable, using default: {}", field, message);
                self.fields.push(field);
                Ok(default)
            }
        }
    }

    fn mark(&mut self, field: DescriptorField) {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }

    fn into_vec(self) -> Vec<DescriptorField> {
        self.fields
    }
}
