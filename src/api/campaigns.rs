use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    models::{
        ApiResponse, CampaignState, DistributionResult, RewardTier, UnifiedRewardConfig,
    },
    services::reward_config::apply_campaign_state,
};

use super::{require_admin_key, rewards::require_campaign_id, AppState};

#[derive(Debug, Serialize)]
pub struct CampaignRewardsResponse {
    #[serde(flatten)]
    pub config: UnifiedRewardConfig,
    pub is_launchable: bool,
}

impl From<UnifiedRewardConfig> for CampaignRewardsResponse {
    fn from(config: UnifiedRewardConfig) -> Self {
        Self {
            is_launchable: config.is_launchable(),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AmountUpdate {
    pub tier: RewardTier,
    pub amount_per_recipient: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCampaignRequest {
    #[serde(default)]
    pub creator_wallet: Option<String>,
    #[serde(default)]
    pub campaign: Option<CampaignState>,
    #[serde(default)]
    pub amounts: Vec<AmountUpdate>,
}

#[derive(Debug, Deserialize)]
pub struct DistributeRequest {
    pub tier: RewardTier,
    pub recipients: Vec<String>,
}

async fn load_campaign(state: &AppState, campaign_id: &str) -> Result<UnifiedRewardConfig> {
    state
        .configs
        .load(campaign_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("campaign {} has no reward config", campaign_id)))
}

/// GET /api/v1/campaigns/{campaign_id}/rewards
pub async fn get_rewards(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<CampaignRewardsResponse>>> {
    let campaign_id = require_campaign_id(&campaign_id)?;
    let unified = load_campaign(&state, campaign_id).await?;
    Ok(Json(ApiResponse::success(unified.into())))
}

/// PUT /api/v1/campaigns/{campaign_id}/rewards
///
/// Campaign limits and amounts are applied without touching the chain.
pub async fn update_rewards(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<Json<ApiResponse<CampaignRewardsResponse>>> {
    let campaign_id = require_campaign_id(&campaign_id)?;
    let mut unified = match state.configs.load(campaign_id).await? {
        Some(unified) => unified,
        None => UnifiedRewardConfig::new(
            campaign_id,
            req.creator_wallet.as_deref().map(str::trim).unwrap_or_default(),
        ),
    };

    if let Some(wallet) = req.creator_wallet.as_deref().map(str::trim) {
        if !wallet.is_empty() {
            unified.creator_wallet = wallet.to_string();
        }
    }
    if let Some(campaign) = req.campaign {
        apply_campaign_state(&mut unified, campaign)?;
    }

    for update in &req.amounts {
        let mut config = unified.tier(update.tier).cloned().ok_or_else(|| {
            AppError::BadRequest(format!("{} tier is not configured", update.tier.as_str()))
        })?;
        state
            .configurator
            .update_amount(&mut config, update.amount_per_recipient)?;
        unified.set_tier(config);
    }

    state.configs.save(&unified).await?;
    Ok(Json(ApiResponse::success(unified.into())))
}

/// POST /api/v1/campaigns/{campaign_id}/distribute
pub async fn distribute(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(campaign_id): Path<String>,
    Json(req): Json<DistributeRequest>,
) -> Result<Json<ApiResponse<DistributionResult>>> {
    require_admin_key(&headers, &state)?;
    let campaign_id = require_campaign_id(&campaign_id)?;
    let unified = load_campaign(&state, campaign_id).await?;
    let config = unified.tier(req.tier).ok_or_else(|| {
        AppError::NotFound(format!(
            "campaign {} has no {} reward",
            campaign_id,
            req.tier.as_str()
        ))
    })?;
    let chain_id = config
        .chain_id
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("reward has no chain".to_string()))?;
    let chain = state.registry.get(chain_id)?;
    if !config.is_ready_for_distribution() {
        tracing::warn!(
            "campaign {} {} reward was not ready when configured; the live balance decides",
            campaign_id,
            req.tier.as_str()
        );
    }

    tracing::info!(
        "campaign {} {} distribution requested for {} recipients",
        campaign_id,
        req.tier.as_str(),
        req.recipients.len()
    );
    let result = match state.credentials.acquire(chain).await {
        Ok(credential) => {
            state
                .executor
                .distribute(config, req.recipients, credential)
                .await
        }
        Err(err) => {
            tracing::error!("campaign {} distribution aborted: {}", campaign_id, err);
            DistributionResult::failed(config, req.recipients, Vec::new(), err.to_string())
        }
    };

    state.audit.append(campaign_id, &result).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/v1/campaigns/{campaign_id}/distributions
pub async fn list_distributions(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<DistributionResult>>>> {
    let campaign_id = require_campaign_id(&campaign_id)?;
    let results = state.audit.list(campaign_id).await?;
    Ok(Json(ApiResponse::success(results)))
}
