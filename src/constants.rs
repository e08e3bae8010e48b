/// Application constants

// API version
pub const API_VERSION: &str = "v1";
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

// Endpoint resolution
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1_500;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;
pub const RPC_OVERRIDE_ENV_PREFIX: &str = "RPC_URL_";

// Distribution
pub const DEFAULT_RECEIPT_TIMEOUT_SECS: u64 = 180;
pub const DEFAULT_DISTRIBUTOR_KEY_ENV: &str = "DISTRIBUTOR_PRIVATE_KEY";
pub const RECEIPT_POLL_INTERVAL_MS: u64 = 1_500;

// Reward tiers
pub const PREMIUM_RECIPIENT_COUNT: u64 = 3;
/// Smallest per-recipient amount for divisible standards, as (mantissa, scale).
pub const DIVISIBLE_MIN_AMOUNT: (i64, u32) = (1, 4); // 0.0001
pub const NON_DIVISIBLE_MIN_AMOUNT: i64 = 1;

// Introspection placeholders and defaults
pub const UNKNOWN_TOKEN_NAME: &str = "Unknown Token";
pub const UNKNOWN_TOKEN_SYMBOL: &str = "UNKNOWN";
pub const DEFAULT_ERC1155_TOKEN_ID: &str = "0";
/// Largest `decimals` whose scale factor (`10^decimals`) fits in a U256.
pub const MAX_TOKEN_DECIMALS: u8 = 77;

// ERC-165 interface ids
pub const ERC721_INTERFACE_ID: [u8; 4] = [0x80, 0xac, 0x58, 0xcd];
pub const ERC1155_INTERFACE_ID: [u8; 4] = [0xd9, 0xb6, 0x7a, 0x26];

// BRC-20 tickers are 4 or 5 bytes
pub const BRC20_TICKER_MIN_LEN: usize = 4;
pub const BRC20_TICKER_MAX_LEN: usize = 5;
