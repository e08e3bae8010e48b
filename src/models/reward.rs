use chrono::{DateTime, Utc};
use ethers::types::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::chain::TokenStandard;
use crate::{
    constants::PREMIUM_RECIPIENT_COUNT,
    error::{AppError, Result},
    utils::{format_decimal, format_units, to_minimal_units},
};

// ==================== CONTRACT DESCRIPTOR ====================
/// Field of a [`ContractDescriptor`] that may fall back to its default.
///
/// Defaults: `Name` -> "Unknown Token", `Symbol` -> "UNKNOWN",
/// `Decimals` -> the standard's default, `TotalSupply` / `HolderBalance` -> 0.
/// A defaulted field means the endpoint answered but the contract did not
/// support the read; an unreachable endpoint never produces a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorField {
    Name,
    Symbol,
    Decimals,
    TotalSupply,
    HolderBalance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub chain_id: String,
    pub contract_address: String,
    pub standard: TokenStandard,
    pub token_id: Option<String>,
    /// Set when the semi-fungible default id was queried instead of a caller id.
    #[serde(default)]
    pub token_id_defaulted: bool,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub total_supply: U256,
    pub holder_address: String,
    pub holder_balance: U256,
    #[serde(default)]
    pub defaulted_fields: Vec<DescriptorField>,
}

impl ContractDescriptor {
    pub fn holder_balance_display(&self) -> String {
        format_units(self.holder_balance, self.decimals)
    }

    pub fn total_supply_display(&self) -> String {
        format_units(self.total_supply, self.decimals)
    }

    pub fn is_defaulted(&self, field: DescriptorField) -> bool {
        self.defaulted_fields.contains(&field)
    }
}

// ==================== REWARD CONFIG ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTier {
    Standard,
    Premium,
}

impl RewardTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    Fungible,
    SemiFungible,
    NonFungible,
    AccessNft,
}

impl RewardType {
    pub fn accepts(self, standard: TokenStandard) -> bool {
        match self {
            Self::Fungible => matches!(
                standard,
                TokenStandard::Erc20 | TokenStandard::Spl | TokenStandard::Brc20
            ),
            Self::SemiFungible => standard == TokenStandard::Erc1155,
            Self::NonFungible => standard == TokenStandard::Erc721,
            Self::AccessNft => matches!(standard, TokenStandard::Erc721 | TokenStandard::Erc1155),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigStatus {
    Unconfigured,
    Pending,
    Valid,
    Invalid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignState {
    pub max_completions: u64,
    pub completed_count: u64,
}

impl CampaignState {
    /// Recipients the tier pays out to (and must be funded for).
    pub fn recipient_count(&self, tier: RewardTier) -> u64 {
        match tier {
            RewardTier::Premium => PREMIUM_RECIPIENT_COUNT,
            RewardTier::Standard if self.max_completions > 0 => self.max_completions,
            RewardTier::Standard => self.completed_count,
        }
    }
}

/// `amount * recipients`, rejected when it leaves `Decimal`'s range.
pub fn total_required(amount: Decimal, recipients: u64) -> Result<Decimal> {
    amount
        .checked_mul(Decimal::from(recipients))
        .ok_or_else(|| {
            AppError::InvalidAmount(format!(
                "{} for each of {} recipients is out of range",
                amount.normalize(),
                recipients
            ))
        })
}

/// Raw user input for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardInput {
    pub chain_id: String,
    pub contract_address: String,
    pub standard: TokenStandard,
    pub holder_address: String,
    pub amount_per_recipient: Decimal,
    #[serde(default)]
    pub token_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardConfig {
    pub tier: RewardTier,
    pub reward_type: RewardType,
    pub status: ConfigStatus,
    pub chain_id: Option<String>,
    pub contract_address: Option<String>,
    pub standard: Option<TokenStandard>,
    pub holder_address: Option<String>,
    pub token_id: Option<String>,
    pub amount_per_recipient: Option<Decimal>,
    pub campaign: CampaignState,
    pub recipient_count: u64,
    pub total_amount_required: Decimal,
    pub total_amount_display: String,
    pub resolved_contract: Option<ContractDescriptor>,
    pub has_sufficient_balance: bool,
    pub is_valid: bool,
    #[serde(default)]
    pub validation_errors: Vec<String>,
    /// The entry of `validation_errors` caused by the amount alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_error: Option<String>,
}

impl RewardConfig {
    pub fn new(tier: RewardTier, reward_type: RewardType) -> Self {
        Self {
            tier,
            reward_type,
            status: ConfigStatus::Unconfigured,
            chain_id: None,
            contract_address: None,
            standard: None,
            holder_address: None,
            token_id: None,
            amount_per_recipient: None,
            campaign: CampaignState::default(),
            recipient_count: 0,
            total_amount_required: Decimal::ZERO,
            total_amount_display: "0".to_string(),
            resolved_contract: None,
            has_sufficient_balance: false,
            is_valid: false,
            validation_errors: Vec::new(),
            amount_error: None,
        }
    }

    /// Switching reward type discards everything resolved for the old one.
    pub fn select_reward_type(&mut self, reward_type: RewardType) {
        let campaign = self.campaign;
        *self = Self::new(self.tier, reward_type);
        self.campaign = campaign;
        self.recompute_totals();
    }

    pub fn begin_validation(&mut self, input: &RewardInput, campaign: CampaignState) {
        self.status = ConfigStatus::Pending;
        self.is_valid = false;
        self.chain_id = Some(input.chain_id.trim().to_string());
        self.contract_address = Some(input.contract_address.trim().to_string());
        self.standard = Some(input.standard);
        self.holder_address = Some(input.holder_address.trim().to_string());
        self.token_id = input.token_id.clone();
        self.amount_per_recipient = Some(input.amount_per_recipient);
        self.campaign = campaign;
        self.resolved_contract = None;
        self.has_sufficient_balance = false;
        self.validation_errors.clear();
        self.amount_error = None;
        self.recompute_totals();
    }

    /// Stores the outcome of a validation round and settles the status.
    pub fn commit(&mut self, resolved: Option<ContractDescriptor>, errors: Vec<String>) {
        if let Some(descriptor) = &resolved {
            if self.token_id.is_none() {
                self.token_id = descriptor.token_id.clone();
            }
        }
        self.resolved_contract = resolved;
        self.validation_errors = errors;
        self.amount_error = None;
        self.recompute_totals();
        if let Err(err) = self.checked_total(self.campaign, self.amount_per_recipient) {
            let error = err.to_string();
            if !self.validation_errors.contains(&error) {
                self.validation_errors.push(error);
            }
        }
        self.settle();
    }

    /// Rejects the committed tier because of its amount; the contract stays resolved.
    pub fn reject_amount(&mut self, error: String) {
        self.validation_errors.push(error.clone());
        self.amount_error = Some(error);
        self.settle();
    }

    /// Replaces an amount that already passed validation.
    ///
    /// A tier that was invalid only because of its amount becomes valid again.
    pub fn set_amount(&mut self, amount: Decimal) -> Result<()> {
        self.checked_total(self.campaign, Some(amount))?;
        self.amount_per_recipient = Some(amount);
        self.recompute_totals();
        if let Some(stale) = self.amount_error.take() {
            self.validation_errors.retain(|error| *error != stale);
            self.settle();
        }
        Ok(())
    }

    /// Leaves the config untouched when the new recipient count overflows the total.
    pub fn set_campaign_state(&mut self, campaign: CampaignState) -> Result<()> {
        self.checked_total(campaign, self.amount_per_recipient)?;
        self.campaign = campaign;
        self.recompute_totals();
        Ok(())
    }

    pub fn checked_total(
        &self,
        campaign: CampaignState,
        amount: Option<Decimal>,
    ) -> Result<Decimal> {
        total_required(
            amount.unwrap_or(Decimal::ZERO),
            campaign.recipient_count(self.tier),
        )
    }

    fn settle(&mut self) {
        self.is_valid = self.resolved_contract.is_some() && self.validation_errors.is_empty();
        self.status = if self.is_valid {
            ConfigStatus::Valid
        } else {
            ConfigStatus::Invalid
        };
    }

    pub fn decimals(&self) -> u8 {
        self.resolved_contract
            .as_ref()
            .map(|c| c.decimals)
            .or_else(|| self.standard.map(TokenStandard::default_decimals))
            .unwrap_or(0)
    }

    /// Recomputes count, total, display and sufficiency from current inputs.
    pub fn recompute_totals(&mut self) {
        self.recipient_count = self.campaign.recipient_count(self.tier);
        let amount = self.amount_per_recipient.unwrap_or(Decimal::ZERO);
        // An out-of-range total is reported by `commit` and refused by the setters.
        let in_range = total_required(amount, self.recipient_count).ok();
        self.total_amount_required = in_range.unwrap_or(Decimal::ZERO);

        let display_decimals = match self.standard {
            Some(standard) if !standard.is_divisible() => 0,
            _ => self.decimals(),
        };
        self.total_amount_display = format_decimal(self.total_amount_required, display_decimals);

        self.has_sufficient_balance = match (&self.resolved_contract, in_range) {
            (Some(contract), Some(_)) if self.amount_per_recipient.is_some() => {
                match to_minimal_units(self.total_amount_required, contract.decimals) {
                    Ok(required) => contract.holder_balance >= required,
                    Err(_) => false,
                }
            }
            _ => false,
        };
    }

    pub fn is_ready_for_distribution(&self) -> bool {
        self.status == ConfigStatus::Valid && self.is_valid && self.has_sufficient_balance
    }
}

// ==================== UNIFIED CONFIG ====================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedRewardConfig {
    pub campaign_id: String,
    pub standard: Option<RewardConfig>,
    pub premium: Option<RewardConfig>,
    pub creator_wallet: String,
    pub max_completions: u64,
    pub updated_at: DateTime<Utc>,
}

impl UnifiedRewardConfig {
    pub fn new(campaign_id: impl Into<String>, creator_wallet: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            standard: None,
            premium: None,
            creator_wallet: creator_wallet.into(),
            max_completions: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn tier(&self, tier: RewardTier) -> Option<&RewardConfig> {
        match tier {
            RewardTier::Standard => self.standard.as_ref(),
            RewardTier::Premium => self.premium.as_ref(),
        }
    }

    pub fn set_tier(&mut self, config: RewardConfig) {
        match config.tier {
            RewardTier::Standard => self.standard = Some(config),
            RewardTier::Premium => self.premium = Some(config),
        }
        self.updated_at = Utc::now();
    }

    /// Each configured tier must be valid on its own; an empty tier is allowed.
    pub fn is_launchable(&self) -> bool {
        let configured: Vec<&RewardConfig> =
            self.standard.iter().chain(self.premium.iter()).collect();
        !configured.is_empty() && configured.iter().all(|c| c.is_valid)
    }
}

// ==================== DISTRIBUTION ====================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub recipient: String,
    pub tx_hash: String,
    pub amount: Decimal,
    #[serde(default)]
    pub token_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionResult {
    pub success: bool,
    pub transaction_reference: Option<String>,
    pub chain_id: String,
    pub tier: RewardTier,
    pub standard: Option<TokenStandard>,
    pub recipients: Vec<String>,
    pub transfers: Vec<TransferRecord>,
    pub amount_distributed: Decimal,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DistributionResult {
    pub fn completed(
        config: &RewardConfig,
        recipients: Vec<String>,
        transfers: Vec<TransferRecord>,
    ) -> Self {
        Self::build(config, recipients, transfers, None)
    }

    pub fn failed(
        config: &RewardConfig,
        recipients: Vec<String>,
        transfers: Vec<TransferRecord>,
        reason: impl Into<String>,
    ) -> Self {
        Self::build(config, recipients, transfers, Some(reason.into()))
    }

    fn build(
        config: &RewardConfig,
        recipients: Vec<String>,
        transfers: Vec<TransferRecord>,
        failure_reason: Option<String>,
    ) -> Self {
        let amount_distributed = transfers.iter().map(|t| t.amount).sum();
        Self {
            success: failure_reason.is_none(),
            transaction_reference: transfers.last().map(|t| t.tx_hash.clone()),
            chain_id: config.chain_id.clone().unwrap_or_default(),
            tier: config.tier,
            standard: config.standard,
            recipients,
            transfers,
            amount_distributed,
            failure_reason,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn descriptor(decimals: u8, balance: U256) -> ContractDescriptor {
        ContractDescriptor {
            chain_id: "Ethereum".to_string(),
            contract_address: "0x6B175474E89094C44Da98b954EedeAC495271d0F".to_string(),
            standard: TokenStandard::Erc20,
            token_id: None,
            token_id_defaulted: false,
            name: "Dai Stablecoin".to_string(),
            symbol: "DAI".to_string(),
            decimals,
            total_supply: U256::exp10(30),
            holder_address: "0x00000000000000000000000000000000000000aa".to_string(),
            holder_balance: balance,
            defaulted_fields: Vec::new(),
        }
    }

    fn input(amount: &str) -> RewardInput {
        RewardInput {
            chain_id: "Ethereum".to_string(),
            contract_address: "0x6B175474E89094C44Da98b954EedeAC495271d0F".to_string(),
            standard: TokenStandard::Erc20,
            holder_address: "0x00000000000000000000000000000000000000aa".to_string(),
            amount_per_recipient: Decimal::from_str(amount).unwrap(),
            token_id: None,
        }
    }

    #[test]
    fn premium_tier_is_fixed_at_three_recipients() {
        let campaign = CampaignState {
            max_completions: 500,
            completed_count: 500,
        };
        let mut config = RewardConfig::new(RewardTier::Premium, RewardType::Fungible);
        config.begin_validation(&input("10"), campaign);
        assert_eq!(config.recipient_count, 3);
        assert_eq!(config.total_amount_required, Decimal::from(30));
    }

    #[test]
    fn standard_tier_uses_max_then_completed_count() {
        let capped = CampaignState {
            max_completions: 1000,
            completed_count: 12,
        };
        assert_eq!(capped.recipient_count(RewardTier::Standard), 1000);
        let open = CampaignState {
            max_completions: 0,
            completed_count: 12,
        };
        assert_eq!(open.recipient_count(RewardTier::Standard), 12);
    }

    #[test]
    fn small_amount_total_is_exact() {
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        config.begin_validation(
            &input("0.0001"),
            CampaignState {
                max_completions: 1000,
                completed_count: 0,
            },
        );
        config.commit(Some(descriptor(18, U256::exp10(18))), Vec::new());
        assert_eq!(config.total_amount_required, Decimal::from_str("0.1").unwrap());
        assert_eq!(config.total_amount_display, "0.100000000000000000");
        assert!(config.has_sufficient_balance);
    }

    #[test]
    fn recompute_is_idempotent_and_tracks_campaign_changes() {
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        config.begin_validation(
            &input("2"),
            CampaignState {
                max_completions: 10,
                completed_count: 0,
            },
        );
        config.recompute_totals();
        let first = config.clone();
        config.recompute_totals();
        assert_eq!(first, config);

        config
            .set_campaign_state(CampaignState {
                max_completions: 25,
                completed_count: 3,
            })
            .unwrap();
        assert_eq!(config.total_amount_required, Decimal::from(50));
    }

    #[test]
    fn sufficiency_boundary_is_inclusive() {
        let mut config = RewardConfig::new(RewardTier::Premium, RewardType::Fungible);
        config.begin_validation(&input("1.5"), CampaignState::default());
        // 1.5 * 3 = 4.5 tokens at 6 decimals
        config.commit(Some(descriptor(6, U256::from(4_500_000u64))), Vec::new());
        assert!(config.has_sufficient_balance);

        config.commit(Some(descriptor(6, U256::from(4_499_999u64))), Vec::new());
        assert!(!config.has_sufficient_balance);
        assert!(config.is_valid);
        assert!(!config.is_ready_for_distribution());
    }

    #[test]
    fn switching_reward_type_clears_downstream_fields() {
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        config.begin_validation(&input("1"), CampaignState::default());
        config.commit(Some(descriptor(18, U256::exp10(20))), Vec::new());
        assert_eq!(config.status, ConfigStatus::Valid);

        config.select_reward_type(RewardType::NonFungible);
        assert_eq!(config.status, ConfigStatus::Unconfigured);
        assert!(config.resolved_contract.is_none());
        assert!(config.contract_address.is_none());
        assert!(!config.is_valid);
    }

    #[test]
    fn pending_config_is_never_valid() {
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        config.begin_validation(&input("1"), CampaignState::default());
        assert_eq!(config.status, ConfigStatus::Pending);
        assert!(!config.is_valid);
        assert!(!config.is_ready_for_distribution());
    }

    #[test]
    fn commit_without_descriptor_is_invalid() {
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        config.begin_validation(&input("1"), CampaignState::default());
        config.commit(None, vec!["Network error: timeout".to_string()]);
        assert_eq!(config.status, ConfigStatus::Invalid);
        assert!(!config.is_valid);
    }

    #[test]
    fn out_of_range_total_marks_config_invalid() {
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        config.begin_validation(
            &input("100000000000000000000"),
            CampaignState {
                max_completions: 1_000_000_000,
                completed_count: 0,
            },
        );
        assert_eq!(config.total_amount_required, Decimal::ZERO);

        config.commit(Some(descriptor(18, U256::MAX)), Vec::new());
        assert_eq!(config.status, ConfigStatus::Invalid);
        assert_eq!(config.validation_errors.len(), 1);
        assert!(!config.has_sufficient_balance);
        assert!(total_required(Decimal::MAX, 2).is_err());
    }

    #[test]
    fn unified_config_round_trips_through_json() {
        let mut unified = UnifiedRewardConfig::new("campaign-42", "0x00000000000000000000000000000000000000aa");
        unified.max_completions = 1000;
        let mut standard = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        standard.begin_validation(
            &input("0.0001"),
            CampaignState {
                max_completions: 1000,
                completed_count: 7,
            },
        );
        standard.commit(Some(descriptor(18, U256::exp10(18))), Vec::new());
        unified.set_tier(standard);
        let mut premium = RewardConfig::new(RewardTier::Premium, RewardType::NonFungible);
        premium.begin_validation(
            &RewardInput {
                standard: TokenStandard::Erc721,
                ..input("1")
            },
            CampaignState::default(),
        );
        unified.set_tier(premium);

        let json = serde_json::to_string(&unified).unwrap();
        let back: UnifiedRewardConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, unified);
        assert_eq!(
            back.standard.as_ref().unwrap().amount_per_recipient.unwrap().to_string(),
            "0.0001"
        );
    }

    #[test]
    fn reward_type_accepts_matching_standards() {
        assert!(RewardType::Fungible.accepts(TokenStandard::Spl));
        assert!(!RewardType::Fungible.accepts(TokenStandard::Erc721));
        assert!(RewardType::AccessNft.accepts(TokenStandard::Erc1155));
        assert!(!RewardType::SemiFungible.accepts(TokenStandard::Erc20));
    }

    #[test]
    fn distribution_result_sums_confirmed_transfers() {
        let mut config = RewardConfig::new(RewardTier::Premium, RewardType::Fungible);
        config.begin_validation(&input("10"), CampaignState::default());
        let transfers = vec![
            TransferRecord {
                recipient: "0x01".to_string(),
                tx_hash: "0xaa".to_string(),
                amount: Decimal::from(10),
                token_ids: Vec::new(),
            },
            TransferRecord {
                recipient: "0x02".to_string(),
                tx_hash: "0xbb".to_string(),
                amount: Decimal::from(10),
                token_ids: Vec::new(),
            },
        ];
        let result = DistributionResult::failed(
            &config,
            vec!["0x01".into(), "0x02".into(), "0x03".into()],
            transfers,
            "reverted",
        );
        assert!(!result.success);
        assert_eq!(result.amount_distributed, Decimal::from(20));
        assert_eq!(result.transaction_reference.as_deref(), Some("0xbb"));
        assert_eq!(result.chain_id, "Ethereum");
    }
}
