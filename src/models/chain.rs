use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

// ==================== ADDRESS FORMAT ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFormat {
    Evm,
    Base58,
    Bitcoin,
}

impl AddressFormat {
    pub fn label(self) -> &'static str {
        match self {
            Self::Evm => "EVM",
            Self::Base58 => "Base58",
            Self::Bitcoin => "Bitcoin",
        }
    }
}

impl fmt::Display for AddressFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ==================== TOKEN STANDARD ====================
/// Deserializes from any spelling `FromStr` accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum TokenStandard {
    #[serde(rename = "ERC20")]
    Erc20,
    #[serde(rename = "ERC1155")]
    Erc1155,
    #[serde(rename = "ERC721")]
    Erc721,
    #[serde(rename = "SPL")]
    Spl,
    #[serde(rename = "BRC20")]
    Brc20,
}

/// How a holder balance is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BalanceQuery {
    Flat,
    PerTokenId,
    OwnedCount,
}

/// Arguments of a single transfer instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransferShape {
    Amount,
    IdAndAmount,
    IdOnly,
}

impl TokenStandard {
    pub const ALL: [TokenStandard; 5] = [
        TokenStandard::Erc20,
        TokenStandard::Erc1155,
        TokenStandard::Erc721,
        TokenStandard::Spl,
        TokenStandard::Brc20,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Erc20 => "ERC20",
            Self::Erc1155 => "ERC1155",
            Self::Erc721 => "ERC721",
            Self::Spl => "SPL",
            Self::Brc20 => "BRC20",
        }
    }

    pub fn default_decimals(self) -> u8 {
        match self {
            Self::Erc20 | Self::Brc20 => 18,
            Self::Spl => 9,
            Self::Erc1155 | Self::Erc721 => 0,
        }
    }

    pub fn is_divisible(self) -> bool {
        matches!(self, Self::Erc20 | Self::Spl | Self::Brc20)
    }

    pub fn balance_query(self) -> BalanceQuery {
        match self {
            Self::Erc1155 => BalanceQuery::PerTokenId,
            Self::Erc721 => BalanceQuery::OwnedCount,
            Self::Erc20 | Self::Spl | Self::Brc20 => BalanceQuery::Flat,
        }
    }

    pub fn transfer_shape(self) -> TransferShape {
        match self {
            Self::Erc1155 => TransferShape::IdAndAmount,
            Self::Erc721 => TransferShape::IdOnly,
            Self::Erc20 | Self::Spl | Self::Brc20 => TransferShape::Amount,
        }
    }

    pub fn is_evm(self) -> bool {
        matches!(self, Self::Erc20 | Self::Erc1155 | Self::Erc721)
    }
}

impl fmt::Display for TokenStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStandard {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "ERC20" | "FUNGIBLE" => Ok(Self::Erc20),
            "ERC1155" | "SEMIFUNGIBLE" => Ok(Self::Erc1155),
            "ERC721" | "NONFUNGIBLE" | "NFT" => Ok(Self::Erc721),
            "SPL" | "SPLTOKEN" => Ok(Self::Spl),
            "BRC20" => Ok(Self::Brc20),
            _ => Err(AppError::UnsupportedStandard(format!(
                "{} (expected one of {})",
                s.trim(),
                Self::ALL.map(Self::as_str).join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for TokenStandard {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ==================== CHAIN PROFILE ====================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainProfile {
    pub id: String,
    pub numeric_chain_id: u64,
    pub candidate_endpoints: Vec<String>,
    pub native_currency_symbol: String,
    pub address_format: AddressFormat,
    pub supported_standards: Vec<TokenStandard>,
}

impl ChainProfile {
    pub fn supports(&self, standard: TokenStandard) -> bool {
        self.supported_standards.contains(&standard)
    }

    pub fn ensure_supports(&self, standard: TokenStandard) -> Result<(), AppError> {
        if self.supports(standard) {
            return Ok(());
        }
        Err(AppError::UnsupportedStandard(format!(
            "{} is not available on {}",
            standard, self.id
        )))
    }
}
