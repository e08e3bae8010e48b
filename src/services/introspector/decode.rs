//! Decoders for raw `eth_call` return data.

use ethers::abi::{decode, ParamType, Token};
use ethers::types::U256;

type TextStrategy = fn(&[u8]) -> Option<String>;

/// Tried in order against raw `name()` / `symbol()` return data.
pub const TEXT_STRATEGIES: &[(&str, TextStrategy)] = &[
    ("abi string", lenient_abi_string),
    ("bytes32", null_padded_bytes32),
];

/// Strict ABI `string` decoding, as a typed call would do it.
pub fn typed_string(raw: &[u8]) -> Option<String> {
    match decode(&[ParamType::String], raw).ok()?.pop()? {
        Token::String(value) => clean(&value),
        _ => None,
    }
}

/// Strict ABI `bytes32` decoding.
pub fn typed_bytes32(raw: &[u8]) -> Option<String> {
    match decode(&[ParamType::FixedBytes(32)], raw).ok()?.pop()? {
        Token::FixedBytes(bytes) => text_from_bytes(&bytes),
        _ => None,
    }
}

pub fn decode_text(raw: &[u8]) -> Option<(&'static str, String)> {
    TEXT_STRATEGIES
        .iter()
        .find_map(|(label, strategy)| strategy(raw).map(|text| (*label, text)))
}

pub fn decode_uint(raw: &[u8]) -> Option<U256> {
    match decode(&[ParamType::Uint(256)], raw).ok()?.pop()? {
        Token::Uint(value) => Some(value),
        _ => None,
    }
}

pub fn decode_u8(raw: &[u8]) -> Option<u8> {
    let value = decode_uint(raw)?;
    if value > U256::from(u8::MAX) {
        return None;
    }
    Some(value.as_u32() as u8)
}

pub fn decode_bool(raw: &[u8]) -> Option<bool> {
    match decode(&[ParamType::Bool], raw).ok()?.pop()? {
        Token::Bool(value) => Some(value),
        _ => None,
    }
}

// Offset/length words, but tolerant of missing tail padding and trailing NULs.
fn lenient_abi_string(raw: &[u8]) -> Option<String> {
    if raw.len() < 64 {
        return None;
    }
    let offset = U256::from_big_endian(&raw[..32]);
    if offset > U256::from(raw.len()) {
        return None;
    }
    let offset = offset.as_usize();
    let len_end = offset.checked_add(32)?;
    if len_end > raw.len() {
        return None;
    }
    let len = U256::from_big_endian(&raw[offset..len_end]);
    if len > U256::from(raw.len() - len_end) {
        return None;
    }
    let body = &raw[len_end..len_end + len.as_usize()];
    text_from_bytes(body)
}

fn null_padded_bytes32(raw: &[u8]) -> Option<String> {
    if raw.len() != 32 {
        return None;
    }
    text_from_bytes(raw)
}

fn text_from_bytes(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let text = std::str::from_utf8(&bytes[..end]).ok()?;
    clean(text)
}

fn clean(value: &str) -> Option<String> {
    let trimmed = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
        return None;
    }
    Some(trimmed.to_string())
}
