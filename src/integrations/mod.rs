pub mod brc20_indexer;
pub mod solana_rpc;
