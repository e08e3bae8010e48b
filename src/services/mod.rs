// Reward distribution services
pub mod address_validator;
pub mod chain_registry;
pub mod credentials;
pub mod distribution;
pub mod introspector;
pub mod onchain;
pub mod provider_resolver;
pub mod reward_config;
pub mod token_abi;

#[cfg(test)]
pub(crate) mod testing;
