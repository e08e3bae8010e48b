use ethers::types::U256;

use super::{FieldDefaults, IntrospectionRequest};
use crate::{
    constants::MAX_TOKEN_DECIMALS,
    error::{AppError, Result},
    models::{ChainProfile, ContractDescriptor, DescriptorField, TokenStandard},
    services::onchain::{Brc20Reader, CallError},
    utils::parse_decimal_units,
};

pub(super) async fn describe<I: Brc20Reader + ?Sized>(
    indexer: &I,
    chain: &ChainProfile,
    request: &IntrospectionRequest,
) -> Result<ContractDescriptor> {
    let ticker = request.contract_address.trim();
    let holder = request.holder_address.trim();

    let (info, balance) = tokio::join!(indexer.ticker(ticker), indexer.holding(holder, ticker));

    let info = match info {
        Ok(info) => info,
        Err(CallError::Unreachable(message)) => return Err(AppError::NetworkError(message)),
        Err(CallError::Failed(message)) => {
            return Err(AppError::InvalidContract(format!(
                "BRC-20 ticker {} not deployed: {}",
                ticker, message
            )))
        }
    };

    let mut defaults = FieldDefaults::default();
    let decimals = match info.decimal.filter(|decimal| *decimal <= MAX_TOKEN_DECIMALS) {
        Some(decimal) => decimal,
        None => {
            defaults.mark(DescriptorField::Decimals);
            TokenStandard::Brc20.default_decimals()
        }
    };
    let total_supply = match info.supply() {
        Some(supply) => parse_decimal_units(supply, decimals)?,
        None => {
            defaults.mark(DescriptorField::TotalSupply);
            U256::zero()
        }
    };
    let balance = defaults.settle(DescriptorField::HolderBalance, balance.map(Some), None)?;
    let holder_balance = match balance {
        Some(balance) => parse_decimal_units(balance.overall(), decimals)?,
        None => U256::zero(),
    };

    Ok(ContractDescriptor {
        chain_id: chain.id.clone(),
        contract_address: info.ticker.clone(),
        standard: TokenStandard::Brc20,
        token_id: None,
        token_id_defaulted: false,
        name: info.ticker.clone(),
        symbol: info.ticker.to_ascii_uppercase(),
        decimals,
        total_supply,
        holder_address: holder.to_string(),
        holder_balance,
        defaulted_fields: defaults.into_vec(),
    })
}
