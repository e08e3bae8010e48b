//! Pure address format checks per chain family. No network I/O.

use ethers::types::Address;
use ethers::utils::to_checksum;
use std::str::FromStr;

use crate::{
    constants::{BRC20_TICKER_MAX_LEN, BRC20_TICKER_MIN_LEN},
    error::{AppError, Result},
    models::{AddressFormat, ChainProfile, TokenStandard},
};

const EVM_ADDRESS_LEN: usize = 42;
const BASE58_MIN_LEN: usize = 32;
const BASE58_MAX_LEN: usize = 44;
const BTC_LEGACY_MIN_LEN: usize = 26;
const BTC_LEGACY_MAX_LEN: usize = 35;
const BTC_BECH32_MIN_LEN: usize = 42;
const BTC_BECH32_MAX_LEN: usize = 62;

pub fn validate(address: &str, family: AddressFormat) -> Result<()> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(AppError::AddressRequired);
    }
    let ok = match family {
        AddressFormat::Evm => is_valid_evm_address(trimmed),
        AddressFormat::Base58 => is_valid_base58_address(trimmed),
        AddressFormat::Bitcoin => is_valid_bitcoin_address(trimmed),
    };
    if ok {
        return Ok(());
    }
    Err(AppError::MalformedAddress {
        family: family.label().to_string(),
        address: trimmed.to_string(),
    })
}

/// Validates what identifies the reward asset: a contract / mint address, or a
/// BRC-20 ticker.
pub fn validate_contract_reference(
    value: &str,
    chain: &ChainProfile,
    standard: TokenStandard,
) -> Result<()> {
    if standard != TokenStandard::Brc20 {
        return validate(value, chain.address_format);
    }
    let ticker = value.trim();
    if ticker.is_empty() {
        return Err(AppError::AddressRequired);
    }
    let len = ticker.len();
    if (BRC20_TICKER_MIN_LEN..=BRC20_TICKER_MAX_LEN).contains(&len)
        && !ticker.chars().any(char::is_whitespace)
    {
        return Ok(());
    }
    Err(AppError::MalformedAddress {
        family: "BRC-20 ticker".to_string(),
        address: ticker.to_string(),
    })
}

fn is_valid_evm_address(value: &str) -> bool {
    value.len() == EVM_ADDRESS_LEN
        && value.starts_with("0x")
        && value[2..].chars().all(|c| c.is_ascii_hexdigit())
}

fn is_base58(value: &str) -> bool {
    bs58::decode(value).into_vec().is_ok()
}

fn is_valid_base58_address(value: &str) -> bool {
    (BASE58_MIN_LEN..=BASE58_MAX_LEN).contains(&value.len()) && is_base58(value)
}

fn is_valid_bitcoin_address(value: &str) -> bool {
    if value.starts_with("bc1") {
        return (BTC_BECH32_MIN_LEN..=BTC_BECH32_MAX_LEN).contains(&value.len())
            && value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    }
    (value.starts_with('1') || value.starts_with('3'))
        && (BTC_LEGACY_MIN_LEN..=BTC_LEGACY_MAX_LEN).contains(&value.len())
        && is_base58(value)
}

/// EIP-55 checksum form of a format-valid EVM address.
pub fn normalize_evm_address(address: &str) -> Result<String> {
    validate(address, AddressFormat::Evm)?;
    let parsed = parse_evm_address(address)?;
    Ok(to_checksum(&parsed, None))
}

pub fn parse_evm_address(address: &str) -> Result<Address> {
    let trimmed = address.trim();
    validate(trimmed, AddressFormat::Evm)?;
    Address::from_str(trimmed).map_err(|_| AppError::MalformedAddress {
        family: AddressFormat::Evm.label().to_string(),
        address: trimmed.to_string(),
    })
}
