use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{
        AddressFormat, ApiResponse, CampaignState, ContractDescriptor, RewardConfig, RewardInput,
        RewardTier, RewardType, UnifiedRewardConfig,
    },
    services::{address_validator, introspector::IntrospectionRequest},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateAddressRequest {
    pub chain_id: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateAddressResponse {
    pub chain_id: String,
    pub address_format: AddressFormat,
    pub valid: bool,
    pub normalized: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DescriptorResponse {
    #[serde(flatten)]
    pub descriptor: ContractDescriptor,
    pub total_supply_display: String,
    pub holder_balance_display: String,
}

impl From<ContractDescriptor> for DescriptorResponse {
    fn from(descriptor: ContractDescriptor) -> Self {
        Self {
            total_supply_display: descriptor.total_supply_display(),
            holder_balance_display: descriptor.holder_balance_display(),
            descriptor,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfigureRequest {
    pub tier: RewardTier,
    pub reward_type: RewardType,
    #[serde(flatten)]
    pub input: RewardInput,
    #[serde(default)]
    pub campaign: Option<CampaignState>,
    /// When set, the resulting tier is stored on this campaign.
    #[serde(default)]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub creator_wallet: Option<String>,
}

/// POST /api/v1/rewards/validate-address
pub async fn validate_address(
    State(state): State<AppState>,
    Json(req): Json<ValidateAddressRequest>,
) -> Result<Json<ApiResponse<ValidateAddressResponse>>> {
    let chain = state.registry.get(&req.chain_id)?;
    let address = req.address.trim();

    let (valid, normalized, error) = match address_validator::validate(address, chain.address_format)
    {
        Ok(()) if chain.address_format == AddressFormat::Evm => (
            true,
            Some(address_validator::normalize_evm_address(address)?),
            None,
        ),
        Ok(()) => (true, Some(address.to_string()), None),
        Err(err) => (false, None, Some(err.to_string())),
    };

    Ok(Json(ApiResponse::success(ValidateAddressResponse {
        chain_id: chain.id.clone(),
        address_format: chain.address_format,
        valid,
        normalized,
        error,
    })))
}

/// POST /api/v1/rewards/introspect
pub async fn introspect(
    State(state): State<AppState>,
    Json(req): Json<IntrospectionRequest>,
) -> Result<Json<ApiResponse<DescriptorResponse>>> {
    let descriptor = state.introspector.introspect(&req).await?;
    Ok(Json(ApiResponse::success(descriptor.into())))
}

/// POST /api/v1/rewards/configure
///
/// Validation failures come back as an `Invalid` config with its errors;
/// only an unreachable chain is returned as an error.
pub async fn configure(
    State(state): State<AppState>,
    Json(req): Json<ConfigureRequest>,
) -> Result<Json<ApiResponse<RewardConfig>>> {
    let campaign_id = req
        .campaign_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let stored = match campaign_id {
        Some(id) => state.configs.load(id).await?,
        None => None,
    };
    let campaign = req
        .campaign
        .or_else(|| stored_campaign(stored.as_ref(), req.tier))
        .unwrap_or_default();

    let mut config = stored
        .as_ref()
        .and_then(|unified| unified.tier(req.tier))
        .filter(|existing| existing.reward_type == req.reward_type)
        .cloned()
        .unwrap_or_else(|| RewardConfig::new(req.tier, req.reward_type));

    if let Err(err) = state
        .configurator
        .configure(&mut config, &req.input, campaign)
        .await
    {
        if err.is_retryable() {
            return Err(err);
        }
    }

    if let Some(id) = campaign_id {
        let mut unified = match stored {
            Some(unified) => unified,
            None => {
                let creator = req.creator_wallet.as_deref().map(str::trim).unwrap_or_default();
                UnifiedRewardConfig::new(id, creator)
            }
        };
        unified.max_completions = campaign.max_completions;
        unified.set_tier(config.clone());
        state.configs.save(&unified).await?;
        tracing::info!(
            "campaign {} {} tier stored as {:?}",
            id,
            req.tier.as_str(),
            config.status
        );
    }

    Ok(Json(ApiResponse::success(config)))
}

fn stored_campaign(stored: Option<&UnifiedRewardConfig>, tier: RewardTier) -> Option<CampaignState> {
    let unified = stored?;
    Some(
        unified
            .tier(tier)
            .map(|config| config.campaign)
            .unwrap_or(CampaignState {
                max_completions: unified.max_completions,
                completed_count: 0,
            }),
    )
}

pub(crate) fn require_campaign_id(raw: &str) -> Result<&str> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest("campaign id is required".to_string()));
    }
    Ok(id)
}
