use ethers::types::U256;

use super::{FieldDefaults, IntrospectionRequest};
use crate::{
    constants::{MAX_TOKEN_DECIMALS, UNKNOWN_TOKEN_NAME, UNKNOWN_TOKEN_SYMBOL},
    error::{AppError, Result},
    models::{ChainProfile, ContractDescriptor, DescriptorField, TokenStandard},
    services::onchain::{CallError, SplReader},
};

// Mint metadata lives in a separate program; name and symbol stay placeholders.
pub(super) async fn describe<C: SplReader + ?Sized>(
    client: &C,
    chain: &ChainProfile,
    request: &IntrospectionRequest,
) -> Result<ContractDescriptor> {
    let mint = request.contract_address.trim();
    let holder = request.holder_address.trim();

    let (supply, balance) = tokio::join!(
        client.token_supply(mint),
        client.token_balance(holder, mint),
    );

    let supply = match supply {
        Ok(supply) => supply,
        Err(CallError::Unreachable(message)) => return Err(AppError::NetworkError(message)),
        Err(CallError::Failed(message)) => {
            return Err(AppError::InvalidContract(format!(
                "{} is not an SPL mint on {}: {}",
                mint, chain.id, message
            )))
        }
    };
    if supply.decimals > MAX_TOKEN_DECIMALS {
        return Err(AppError::InvalidContract(format!(
            "{} reports {} decimals",
            mint, supply.decimals
        )));
    }
    let total_supply = supply.raw()?;

    let mut defaults = FieldDefaults::default();
    let holder_balance = defaults.settle(DescriptorField::HolderBalance, balance, U256::zero())?;
    defaults.mark(DescriptorField::Name);
    defaults.mark(DescriptorField::Symbol);

    Ok(ContractDescriptor {
        chain_id: chain.id.clone(),
        contract_address: mint.to_string(),
        standard: TokenStandard::Spl,
        token_id: None,
        token_id_defaulted: false,
        name: UNKNOWN_TOKEN_NAME.to_string(),
        symbol: UNKNOWN_TOKEN_SYMBOL.to_string(),
        decimals: supply.decimals,
        total_supply,
        holder_address: holder.to_string(),
        holder_balance,
        defaulted_fields: defaults.into_vec(),
    })
}
