// Unit conversion helpers shared by the configuration model and the executor.

use ethers::types::U256;
use rust_decimal::Decimal;

use crate::error::{AppError, Result};

/// Converts a human amount into raw minimal units (`amount * 10^decimals`).
pub fn to_minimal_units(amount: Decimal, decimals: u8) -> Result<U256> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AppError::InvalidAmount(format!(
            "amount must not be negative: {}",
            amount
        )));
    }
    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > u32::from(decimals) {
        return Err(AppError::InvalidAmount(format!(
            "{} has more than {} fractional digits",
            amount, decimals
        )));
    }
    let mantissa = normalized.mantissa().unsigned_abs();
    let out_of_range = || AppError::InvalidAmount(format!("amount out of range: {}", amount));
    let factor = ten_pow(u32::from(decimals) - scale).ok_or_else(out_of_range)?;
    U256::from(mantissa)
        .checked_mul(factor)
        .ok_or_else(out_of_range)
}

/// `10^exp`, or `None` past 10^77.
fn ten_pow(exp: u32) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

/// Formats raw minimal units with exactly `decimals` fractional digits.
pub fn format_units(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }
    // A base past U256::MAX exceeds every raw value.
    let (whole, fraction) = match ten_pow(u32::from(decimals)) {
        Some(base) => (raw / base, raw % base),
        None => (U256::zero(), raw),
    };
    format!(
        "{}.{:0>width$}",
        whole,
        fraction.to_string(),
        width = decimals as usize
    )
}

/// Formats a decimal with exactly `decimals` fractional digits.
///
/// Values that do not convert to minimal units (negative, or finer than
/// `decimals`) are printed as they are.
pub fn format_decimal(value: Decimal, decimals: u8) -> String {
    match to_minimal_units(value, decimals) {
        Ok(raw) => format_units(raw, decimals),
        Err(_) => value.normalize().to_string(),
    }
}

/// Parses a base-10 integer string (as returned by Solana / indexer APIs).
pub fn parse_raw_units(value: &str) -> Result<U256> {
    U256::from_dec_str(value.trim())
        .map_err(|e| AppError::Internal(format!("Invalid integer amount '{}': {}", value, e)))
}

/// Parses a decimal string like `"1000.5"` into raw units at `decimals`.
pub fn parse_decimal_units(value: &str, decimals: u8) -> Result<U256> {
    let amount: Decimal = value
        .trim()
        .parse()
        .map_err(|e| AppError::Internal(format!("Invalid decimal amount '{}': {}", value, e)))?;
    to_minimal_units(amount, decimals)
}

pub fn u256_to_u64(value: U256) -> Option<u64> {
    if value > U256::from(u64::MAX) {
        return None;
    }
    Some(value.as_u64())
}
