use ethers::abi::AbiEncode;
use ethers::types::{Address, Bytes, U256};
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    constants::DEFAULT_ERC1155_TOKEN_ID,
    error::{AppError, Result},
    models::{
        ChainProfile, ConfigStatus, ContractDescriptor, DistributionResult, RewardConfig,
        TokenStandard, TransferRecord, TransferShape,
    },
    utils::{format_units, to_minimal_units, u256_to_u64},
};

use super::{
    address_validator::{self, parse_evm_address},
    credentials::SigningCredential,
    introspector::{decode::decode_uint, parse_token_id},
    onchain::{CallError, EvmClient, EvmInvoker},
    provider_resolver::{LiveConnection, ProviderResolver},
    token_abi::{erc1155, erc20, erc721},
};

/// Pays a validated reward to every recipient, one transaction per transfer.
pub struct DistributionExecutor {
    resolver: Arc<ProviderResolver>,
}

struct Payout<'a> {
    client: &'a dyn EvmClient,
    invoker: Arc<dyn EvmInvoker>,
    contract: Address,
    recipients: Vec<(String, Address)>,
    amount: Decimal,
    raw_amount: U256,
}

impl DistributionExecutor {
    pub fn new(resolver: Arc<ProviderResolver>) -> Self {
        Self { resolver }
    }

    /// Never retries; transfers confirmed before a failure stay in the result.
    pub async fn distribute(
        &self,
        config: &RewardConfig,
        recipients: Vec<String>,
        credential: SigningCredential,
    ) -> DistributionResult {
        let recipients: Vec<String> = recipients.iter().map(|r| r.trim().to_string()).collect();
        let mut transfers = Vec::new();
        match self
            .run(config, &recipients, credential, &mut transfers)
            .await
        {
            Ok(()) => {
                tracing::info!(
                    "{} distribution on {} paid {} recipients in {} transfers",
                    config.tier.as_str(),
                    config.chain_id.as_deref().unwrap_or_default(),
                    recipients.len(),
                    transfers.len()
                );
                DistributionResult::completed(config, recipients, transfers)
            }
            Err(err) => {
                tracing::error!(
                    "{} distribution on {} stopped after {} transfers: {}",
                    config.tier.as_str(),
                    config.chain_id.as_deref().unwrap_or_default(),
                    transfers.len(),
                    err
                );
                DistributionResult::failed(config, recipients, transfers, err.to_string())
            }
        }
    }

    async fn run(
        &self,
        config: &RewardConfig,
        recipients: &[String],
        credential: SigningCredential,
        transfers: &mut Vec<TransferRecord>,
    ) -> Result<()> {
        let (standard, descriptor, amount) = ready_parts(config)?;
        if !standard.is_evm() {
            return Err(AppError::UnsupportedStandard(format!(
                "automated {} payouts are not supported",
                standard
            )));
        }
        if recipients.is_empty() {
            return Err(AppError::BadRequest("no recipients to pay".to_string()));
        }
        if recipients.len() as u64 > config.recipient_count {
            return Err(AppError::BadRequest(format!(
                "{} recipients exceed the {} tier's {} slots",
                recipients.len(),
                config.tier.as_str(),
                config.recipient_count
            )));
        }

        let chain = self.resolver.registry().get(&descriptor.chain_id)?;
        let recipients = parse_recipients(chain, recipients)?;
        let contract = parse_evm_address(&descriptor.contract_address)?;
        let raw_amount = to_minimal_units(amount, descriptor.decimals)?;

        let client = match self.resolver.resolve_profile(chain).await? {
            LiveConnection::Evm(client) => client,
            other => {
                return Err(AppError::Internal(format!(
                    "{} resolved to a {} connection",
                    chain.id,
                    other.kind()
                )))
            }
        };
        let invoker = client.invoker(credential.wallet());
        drop(credential);

        let payout = Payout {
            client: client.as_ref(),
            invoker,
            contract,
            recipients,
            amount,
            raw_amount,
        };
        match standard.transfer_shape() {
            TransferShape::Amount => pay_erc20(&payout, descriptor, transfers).await,
            TransferShape::IdAndAmount => pay_erc1155(&payout, config, descriptor, transfers).await,
            TransferShape::IdOnly => pay_erc721(&payout, descriptor, transfers).await,
        }
    }
}

fn ready_parts(config: &RewardConfig) -> Result<(TokenStandard, &ContractDescriptor, Decimal)> {
    if config.status != ConfigStatus::Valid || !config.is_valid {
        return Err(AppError::BadRequest(format!(
            "{} reward configuration is not valid",
            config.tier.as_str()
        )));
    }
    match (
        config.standard,
        config.resolved_contract.as_ref(),
        config.amount_per_recipient,
    ) {
        (Some(standard), Some(descriptor), Some(amount)) => Ok((standard, descriptor, amount)),
        _ => Err(AppError::BadRequest(
            "reward configuration is incomplete".to_string(),
        )),
    }
}

// Every address is checked before the first transfer goes out.
fn parse_recipients(chain: &ChainProfile, recipients: &[String]) -> Result<Vec<(String, Address)>> {
    recipients
        .iter()
        .map(|recipient| {
            address_validator::validate(recipient, chain.address_format)?;
            Ok((recipient.clone(), parse_evm_address(recipient)?))
        })
        .collect()
}

async fn read_balance(payout: &Payout<'_>, calldata: Vec<u8>) -> Result<U256> {
    let raw = payout
        .client
        .call(payout.contract, calldata.into())
        .await
        .map_err(CallError::into_app_error)?;
    decode_uint(&raw).ok_or_else(|| {
        AppError::InvalidContract(format!("balanceOf on {:#x} is not decodable", payout.contract))
    })
}

fn ensure_covers(available: U256, required: U256, decimals: u8) -> Result<()> {
    if available >= required {
        return Ok(());
    }
    Err(AppError::InsufficientBalance {
        required: format_units(required, decimals),
        available: format_units(available, decimals),
    })
}

fn required_total(payout: &Payout<'_>) -> Result<U256> {
    payout
        .raw_amount
        .checked_mul(U256::from(payout.recipients.len()))
        .ok_or_else(|| AppError::InvalidAmount("total amount overflows uint256".to_string()))
}

async fn pay_erc20(
    payout: &Payout<'_>,
    descriptor: &ContractDescriptor,
    transfers: &mut Vec<TransferRecord>,
) -> Result<()> {
    let sender = payout.invoker.sender();
    let available = read_balance(payout, erc20::BalanceOfCall { owner: sender }.encode()).await?;
    ensure_covers(available, required_total(payout)?, descriptor.decimals)?;

    for (recipient, to) in &payout.recipients {
        let calldata = erc20::TransferCall {
            to: *to,
            amount: payout.raw_amount,
        }
        .encode();
        let tx_hash = payout
            .invoker
            .submit(payout.contract, Bytes::from(calldata))
            .await?;
        tracing::info!("ERC20 {} -> {} in {}", payout.amount, recipient, tx_hash);
        transfers.push(TransferRecord {
            recipient: recipient.clone(),
            tx_hash,
            amount: payout.amount,
            token_ids: Vec::new(),
        });
    }
    Ok(())
}

async fn pay_erc1155(
    payout: &Payout<'_>,
    config: &RewardConfig,
    descriptor: &ContractDescriptor,
    transfers: &mut Vec<TransferRecord>,
) -> Result<()> {
    let token_id = config
        .token_id
        .clone()
        .or_else(|| descriptor.token_id.clone())
        .unwrap_or_else(|| DEFAULT_ERC1155_TOKEN_ID.to_string());
    let id = parse_token_id(&token_id)?;
    let sender = payout.invoker.sender();

    let available = read_balance(
        payout,
        erc1155::BalanceOfCall {
            account: sender,
            id,
        }
        .encode(),
    )
    .await?;
    ensure_covers(available, required_total(payout)?, 0)?;

    for (recipient, to) in &payout.recipients {
        let calldata = erc1155::SafeTransferFromCall {
            from: sender,
            to: *to,
            id,
            amount: payout.raw_amount,
            data: Bytes::new(),
        }
        .encode();
        let tx_hash = payout
            .invoker
            .submit(payout.contract, Bytes::from(calldata))
            .await?;
        tracing::info!(
            "ERC1155 {} x #{} -> {} in {}",
            payout.amount,
            token_id,
            recipient,
            tx_hash
        );
        transfers.push(TransferRecord {
            recipient: recipient.clone(),
            tx_hash,
            amount: payout.amount,
            token_ids: vec![token_id.clone()],
        });
    }
    Ok(())
}

async fn pay_erc721(
    payout: &Payout<'_>,
    descriptor: &ContractDescriptor,
    transfers: &mut Vec<TransferRecord>,
) -> Result<()> {
    let sender = payout.invoker.sender();
    let required = required_total(payout)?;
    let owned = read_balance(payout, erc721::BalanceOfCall { owner: sender }.encode()).await?;
    ensure_covers(owned, required, descriptor.decimals)?;

    let per_recipient = u256_to_u64(payout.raw_amount)
        .ok_or_else(|| AppError::InvalidAmount("too many tokens per recipient".to_string()))?
        as usize;
    let needed = u256_to_u64(required)
        .ok_or_else(|| AppError::InvalidAmount("too many tokens requested".to_string()))?;

    // Ids are collected up front; indices shift once transfers start.
    let mut token_ids = Vec::with_capacity(needed as usize);
    for index in 0..needed {
        let calldata = erc721::TokenOfOwnerByIndexCall {
            owner: sender,
            index: U256::from(index),
        }
        .encode();
        let id = read_balance(payout, calldata).await.map_err(|err| match err {
            AppError::InvalidContract(_) => AppError::DistributionFailure(format!(
                "{:#x} does not support token enumeration",
                payout.contract
            )),
            other => other,
        })?;
        token_ids.push(id);
    }

    let one = Decimal::ONE;
    for ((recipient, to), ids) in payout
        .recipients
        .iter()
        .zip(token_ids.chunks(per_recipient.max(1)))
    {
        for id in ids {
            let calldata = erc721::SafeTransferFromCall {
                from: sender,
                to: *to,
                token_id: *id,
            }
            .encode();
            let tx_hash = payout
                .invoker
                .submit(payout.contract, Bytes::from(calldata))
                .await?;
            tracing::info!("ERC721 #{} -> {} in {}", id, recipient, tx_hash);
            transfers.push(TransferRecord {
                recipient: recipient.clone(),
                tx_hash,
                amount: one,
                token_ids: vec![id.to_string()],
            });
        }
    }
    Ok(())
}
