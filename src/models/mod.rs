// src/models/mod.rs
pub mod chain;
pub mod reward;

pub use chain::{AddressFormat, BalanceQuery, ChainProfile, TokenStandard, TransferShape};
pub use reward::{
    CampaignState, ConfigStatus, ContractDescriptor, DescriptorField, DistributionResult,
    total_required, RewardConfig, RewardInput, RewardTier, RewardType, TransferRecord,
    UnifiedRewardConfig,
};

use serde::Serialize;

// ==================== API RESPONSE ====================
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success_sets_flag() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, "ok");
    }
}
