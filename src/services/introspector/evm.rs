use ethers::abi::AbiEncode;
use ethers::types::{Address, Bytes, U256};

use super::{
    decode::{decode_bool, decode_text, decode_u8, decode_uint, typed_bytes32, typed_string},
    FieldDefaults, IntrospectionRequest,
};
use crate::{
    constants::{
        DEFAULT_ERC1155_TOKEN_ID, ERC1155_INTERFACE_ID, ERC721_INTERFACE_ID, MAX_TOKEN_DECIMALS,
        UNKNOWN_TOKEN_NAME, UNKNOWN_TOKEN_SYMBOL,
    },
    error::{AppError, Result},
    models::{BalanceQuery, ChainProfile, ContractDescriptor, DescriptorField, TokenStandard},
    services::{
        address_validator::parse_evm_address,
        onchain::{CallError, CallResult, EvmReader},
        token_abi::{erc1155, erc20, erc20_bytes32, erc721},
    },
};

#[derive(Debug, Clone, Copy)]
enum TextField {
    Name,
    Symbol,
}

pub(super) async fn describe<C: EvmReader + ?Sized>(
    client: &C,
    chain: &ChainProfile,
    request: &IntrospectionRequest,
) -> Result<ContractDescriptor> {
    let standard = request.standard;
    let contract = parse_evm_address(&request.contract_address)?;
    let holder = parse_evm_address(&request.holder_address)?;

    let code_size = client
        .code_size(contract)
        .await
        .map_err(CallError::into_app_error)?;
    if code_size == 0 {
        return Err(AppError::InvalidContract(format!(
            "no contract deployed at {} on {}",
            request.contract_address, chain.id
        )));
    }

    match standard {
        TokenStandard::Erc721 => {
            ensure_interface(client, contract, ERC721_INTERFACE_ID, "ERC-721").await?
        }
        TokenStandard::Erc1155 => {
            ensure_interface(client, contract, ERC1155_INTERFACE_ID, "ERC-1155").await?
        }
        _ => {}
    }

    let (token_id, token_id_defaulted) = match standard {
        TokenStandard::Erc1155 => match request
            .token_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            Some(id) => (Some(id.to_string()), false),
            None => (Some(DEFAULT_ERC1155_TOKEN_ID.to_string()), true),
        },
        _ => (None, false),
    };
    let id = token_id.as_deref().map(parse_token_id).transpose()?;

    let (name, symbol, decimals, total_supply, holder_balance) = tokio::join!(
        read_text(client, contract, standard, TextField::Name),
        read_text(client, contract, standard, TextField::Symbol),
        read_decimals(client, contract, standard),
        read_word(client, contract, total_supply_call(standard, id)),
        read_word(client, contract, balance_call(standard, holder, id)),
    );

    let mut defaults = FieldDefaults::default();
    let name = defaults.settle(DescriptorField::Name, name, UNKNOWN_TOKEN_NAME.to_string())?;
    let symbol = defaults.settle(
        DescriptorField::Symbol,
        symbol,
        UNKNOWN_TOKEN_SYMBOL.to_string(),
    )?;
    let decimals = defaults.settle(
        DescriptorField::Decimals,
        decimals,
        standard.default_decimals(),
    )?;
    let total_supply = defaults.settle(DescriptorField::TotalSupply, total_supply, U256::zero())?;
    let holder_balance =
        defaults.settle(DescriptorField::HolderBalance, holder_balance, U256::zero())?;

    Ok(ContractDescriptor {
        chain_id: chain.id.clone(),
        contract_address: request.contract_address.trim().to_string(),
        standard,
        token_id,
        token_id_defaulted,
        name,
        symbol,
        decimals,
        total_supply,
        holder_address: request.holder_address.trim().to_string(),
        holder_balance,
        defaulted_fields: defaults.into_vec(),
    })
}

pub(crate) fn parse_token_id(value: &str) -> Result<U256> {
    let trimmed = value.trim();
    let parsed = match trimmed.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_dec_str(trimmed).ok(),
    };
    parsed.ok_or_else(|| AppError::BadRequest(format!("Invalid token id: {}", value)))
}

// A failing ERC-165 call is tolerated; only an explicit `false` rejects.
async fn ensure_interface<C: EvmReader + ?Sized>(
    client: &C,
    contract: Address,
    interface_id: [u8; 4],
    label: &str,
) -> Result<()> {
    let calldata = erc721::SupportsInterfaceCall { interface_id }.encode();
    match client.call(contract, calldata.into()).await {
        Ok(raw) => match decode_bool(&raw) {
            Some(false) => Err(AppError::InvalidContract(format!(
                "{:#x} does not implement {} (interface 0x{})",
                contract,
                label,
                hex::encode(interface_id)
            ))),
            _ => Ok(()),
        },
        Err(CallError::Unreachable(message)) => Err(AppError::NetworkError(message)),
        Err(CallError::Failed(message)) => {
            tracing::debug!("supportsInterface unavailable on {:#x}: {}", contract, message);
            Ok(())
        }
    }
}

fn text_calls(field: TextField) -> (Vec<u8>, Vec<u8>) {
    match field {
        TextField::Name => (
            erc20::NameCall.encode(),
            erc20_bytes32::NameCall.encode(),
        ),
        TextField::Symbol => (
            erc20::SymbolCall.encode(),
            erc20_bytes32::SymbolCall.encode(),
        ),
    }
}

/// Fungible tokens get the full fallback chain; NFT collections a single
/// decoded read.
async fn read_text<C: EvmReader + ?Sized>(
    client: &C,
    contract: Address,
    standard: TokenStandard,
    field: TextField,
) -> CallResult<String> {
    let (typed_call, bytes32_call) = text_calls(field);

    let raw = match client.call(contract, typed_call.into()).await {
        Ok(raw) => Some(raw),
        Err(CallError::Unreachable(message)) => return Err(CallError::Unreachable(message)),
        Err(CallError::Failed(_)) => None,
    };
    if let Some(raw) = &raw {
        if standard == TokenStandard::Erc20 {
            if let Some(text) = typed_string(raw) {
                return Ok(text);
            }
        }
        if let Some((strategy, text)) = decode_text(raw) {
            tracing::debug!("{:?} of {:#x} decoded as {}", field, contract, strategy);
            return Ok(text);
        }
    }
    if standard != TokenStandard::Erc20 {
        return Err(CallError::Failed(format!("{:?} not readable", field)));
    }

    let raw = client.call(contract, bytes32_call.into()).await?;
    typed_bytes32(&raw).ok_or_else(|| CallError::Failed(format!("{:?} not decodable", field)))
}

async fn read_decimals<C: EvmReader + ?Sized>(
    client: &C,
    contract: Address,
    standard: TokenStandard,
) -> CallResult<u8> {
    if standard != TokenStandard::Erc20 {
        return Ok(standard.default_decimals());
    }
    let raw = client
        .call(contract, erc20::DecimalsCall.encode().into())
        .await?;
    let decimals =
        decode_u8(&raw).ok_or_else(|| CallError::Failed("decimals not decodable".to_string()))?;
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(CallError::Failed(format!(
            "decimals {} exceeds {}",
            decimals, MAX_TOKEN_DECIMALS
        )));
    }
    Ok(decimals)
}

fn total_supply_call(standard: TokenStandard, id: Option<U256>) -> Bytes {
    let calldata = match (standard, id) {
        (TokenStandard::Erc1155, Some(id)) => erc1155::TotalSupplyCall { id }.encode(),
        (TokenStandard::Erc721, _) => erc721::TotalSupplyCall.encode(),
        _ => erc20::TotalSupplyCall.encode(),
    };
    calldata.into()
}

fn balance_call(standard: TokenStandard, holder: Address, id: Option<U256>) -> Bytes {
    let calldata = match (standard.balance_query(), id) {
        (BalanceQuery::PerTokenId, Some(id)) => erc1155::BalanceOfCall {
            account: holder,
            id,
        }
        .encode(),
        (BalanceQuery::OwnedCount, _) => erc721::BalanceOfCall { owner: holder }.encode(),
        _ => erc20::BalanceOfCall { owner: holder }.encode(),
    };
    calldata.into()
}

async fn read_word<C: EvmReader + ?Sized>(client: &C, contract: Address, calldata: Bytes) -> CallResult<U256> {
    let raw = client.call(contract, calldata).await?;
    decode_uint(&raw).ok_or_else(|| CallError::Failed("uint256 not decodable".to_string()))
}
