use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    constants::{DIVISIBLE_MIN_AMOUNT, NON_DIVISIBLE_MIN_AMOUNT},
    error::{AppError, Result},
    models::{
        total_required, CampaignState, ContractDescriptor, RewardConfig, RewardInput, RewardTier,
        RewardType, TokenStandard, UnifiedRewardConfig,
    },
};

use super::{
    address_validator,
    chain_registry::ChainRegistry,
    introspector::{Introspect, IntrospectionRequest},
};

pub fn minimum_amount(standard: TokenStandard) -> Decimal {
    if standard.is_divisible() {
        let (mantissa, scale) = DIVISIBLE_MIN_AMOUNT;
        Decimal::new(mantissa, scale)
    } else {
        Decimal::from(NON_DIVISIBLE_MIN_AMOUNT)
    }
}

/// Minimum and whole-unit rules; needs no contract data.
pub fn check_granularity(amount: Decimal, standard: TokenStandard) -> Result<()> {
    let minimum = minimum_amount(standard);
    if amount < minimum {
        return Err(AppError::BelowMinimumAmount {
            amount: amount.normalize().to_string(),
            minimum: minimum.to_string(),
        });
    }
    if !standard.is_divisible() && !amount.fract().is_zero() {
        return Err(AppError::InvalidAmount(format!(
            "{} rewards are whole units, got {}",
            standard,
            amount.normalize()
        )));
    }
    Ok(())
}

/// Granularity plus precision against the token's decimals.
pub fn validate_amount(amount: Decimal, standard: TokenStandard, decimals: u8) -> Result<()> {
    check_granularity(amount, standard)?;
    if amount.normalize().scale() > u32::from(decimals) {
        return Err(AppError::InvalidAmount(format!(
            "{} has more fractional digits than the token's {} decimals",
            amount.normalize(),
            decimals
        )));
    }
    Ok(())
}

fn check_reward_type(reward_type: RewardType, standard: TokenStandard) -> Result<()> {
    if reward_type.accepts(standard) {
        return Ok(());
    }
    Err(AppError::UnsupportedStandard(format!(
        "{} cannot back a {:?} reward",
        standard, reward_type
    )))
}

/// Builds a tier config from inputs and an already resolved contract.
pub fn compute_config(
    tier: RewardTier,
    reward_type: RewardType,
    input: &RewardInput,
    resolved: Option<ContractDescriptor>,
    campaign: CampaignState,
) -> Result<RewardConfig> {
    check_reward_type(reward_type, input.standard)?;
    let decimals = resolved
        .as_ref()
        .map(|c| c.decimals)
        .unwrap_or_else(|| input.standard.default_decimals());
    validate_amount(input.amount_per_recipient, input.standard, decimals)?;
    total_required(input.amount_per_recipient, campaign.recipient_count(tier))?;

    let mut config = RewardConfig::new(tier, reward_type);
    config.begin_validation(input, campaign);
    config.commit(resolved, Vec::new());
    Ok(config)
}

/// Recounts both tiers after campaign limits or progress change.
///
/// Nothing changes when either tier's total would leave the decimal range.
pub fn apply_campaign_state(unified: &mut UnifiedRewardConfig, campaign: CampaignState) -> Result<()> {
    for config in unified.standard.iter().chain(unified.premium.iter()) {
        config.checked_total(campaign, config.amount_per_recipient)?;
    }
    unified.max_completions = campaign.max_completions;
    for config in [unified.standard.as_mut(), unified.premium.as_mut()]
        .into_iter()
        .flatten()
    {
        config.set_campaign_state(campaign)?;
    }
    unified.updated_at = chrono::Utc::now();
    Ok(())
}

/// Drives a tier config through validation against a live chain.
pub struct RewardConfigurator {
    registry: Arc<ChainRegistry>,
    introspector: Arc<dyn Introspect>,
}

impl RewardConfigurator {
    pub fn new(registry: Arc<ChainRegistry>, introspector: Arc<dyn Introspect>) -> Self {
        Self {
            registry,
            introspector,
        }
    }

    /// Leaves `config` `Valid` or `Invalid`; dropping the future mid-flight
    /// leaves it `Pending`.
    pub async fn configure(
        &self,
        config: &mut RewardConfig,
        input: &RewardInput,
        campaign: CampaignState,
    ) -> Result<()> {
        config.begin_validation(input, campaign);

        let resolved = self.resolve(config, input).await;
        let descriptor = match resolved {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::warn!(
                    "{} reward on {} rejected: {}",
                    config.tier.as_str(),
                    input.chain_id,
                    err
                );
                config.commit(None, vec![err.to_string()]);
                return Err(err);
            }
        };

        if let Err(err) =
            validate_amount(input.amount_per_recipient, input.standard, descriptor.decimals)
        {
            config.commit(Some(descriptor), Vec::new());
            config.reject_amount(err.to_string());
            return Err(err);
        }

        config.commit(Some(descriptor), Vec::new());
        tracing::info!(
            "{} reward configured on {}: {} x {} = {} (sufficient: {})",
            config.tier.as_str(),
            input.chain_id,
            config.recipient_count,
            input.amount_per_recipient,
            config.total_amount_display,
            config.has_sufficient_balance
        );
        Ok(())
    }

    async fn resolve(&self, config: &RewardConfig, input: &RewardInput) -> Result<ContractDescriptor> {
        check_reward_type(config.reward_type, input.standard)?;
        let chain = self.registry.get(&input.chain_id)?;
        chain.ensure_supports(input.standard)?;
        address_validator::validate_contract_reference(
            &input.contract_address,
            chain,
            input.standard,
        )?;
        address_validator::validate(&input.holder_address, chain.address_format)?;
        check_granularity(input.amount_per_recipient, input.standard)?;
        config.checked_total(config.campaign, Some(input.amount_per_recipient))?;

        self.introspector
            .introspect(&IntrospectionRequest {
                chain_id: chain.id.clone(),
                contract_address: input.contract_address.trim().to_string(),
                standard: input.standard,
                holder_address: input.holder_address.trim().to_string(),
                token_id: input.token_id.clone(),
            })
            .await
    }

    /// Changes the per-recipient amount without re-reading the chain.
    pub fn update_amount(&self, config: &mut RewardConfig, amount: Decimal) -> Result<()> {
        let standard = config
            .standard
            .ok_or_else(|| AppError::BadRequest("reward is not configured".to_string()))?;
        validate_amount(amount, standard, config.decimals())?;
        config.set_amount(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ConfigStatus;
    use async_trait::async_trait;
    use ethers::types::U256;
    use std::str::FromStr;
    use std::time::Duration;

    struct FixedIntrospector {
        descriptor: Option<ContractDescriptor>,
        delay: Duration,
    }

    #[async_trait]
    impl Introspect for FixedIntrospector {
        async fn introspect(&self, request: &IntrospectionRequest) -> Result<ContractDescriptor> {
            tokio::time::sleep(self.delay).await;
            let mut descriptor = self
                .descriptor
                .clone()
                .ok_or_else(|| AppError::NetworkError("endpoint reset".to_string()))?;
            descriptor.standard = request.standard;
            Ok(descriptor)
        }
    }

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
            total_supply: U256::exp10(27),
            holder_address: "0x00000000000000000000000000000000000000aa".to_string(),
            holder_balance: balance,
            defaulted_fields: Vec::new(),
        }
    }

    fn input(standard: TokenStandard, amount: &str) -> RewardInput {
        RewardInput {
            chain_id: "Ethereum".to_string(),
            contract_address: "0x6B175474E89094C44Da98b954EedeAC495271d0F".to_string(),
            standard,
            holder_address: "0x00000000000000000000000000000000000000aa".to_string(),
            amount_per_recipient: Decimal::from_str(amount).unwrap(),
            token_id: None,
        }
    }

    fn configurator(descriptor: Option<ContractDescriptor>, delay: Duration) -> RewardConfigurator {
        RewardConfigurator::new(
            Arc::new(ChainRegistry::with_defaults()),
            Arc::new(FixedIntrospector { descriptor, delay }),
        )
    }

    #[test]
    fn non_divisible_standards_reject_half_units() {
        for standard in [TokenStandard::Erc1155, TokenStandard::Erc721] {
            let err = validate_amount(Decimal::from_str("0.5").unwrap(), standard, 0).unwrap_err();
            assert!(matches!(err, AppError::BelowMinimumAmount { .. }), "{standard}");
        }
        let err = validate_amount(Decimal::from_str("1.5").unwrap(), TokenStandard::Erc721, 0)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
        assert!(validate_amount(Decimal::from(2), TokenStandard::Erc1155, 0).is_ok());
    }

    #[test]
    fn divisible_minimum_is_one_ten_thousandth() {
        assert!(validate_amount(Decimal::from_str("0.0001").unwrap(), TokenStandard::Erc20, 18).is_ok());
        assert!(matches!(
            validate_amount(Decimal::from_str("0.00009").unwrap(), TokenStandard::Erc20, 18),
            Err(AppError::BelowMinimumAmount { .. })
        ));
        assert!(matches!(
            validate_amount(Decimal::ZERO, TokenStandard::Spl, 9),
            Err(AppError::BelowMinimumAmount { .. })
        ));
    }

    #[test]
    fn amounts_finer_than_decimals_are_invalid() {
        assert!(matches!(
            validate_amount(Decimal::from_str("1.0005").unwrap(), TokenStandard::Erc20, 2),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(validate_amount(Decimal::from_str("1.50").unwrap(), TokenStandard::Erc20, 1).is_ok());
    }

    #[test]
    fn compute_config_premium_scenario() {
        let config = compute_config(
            RewardTier::Premium,
            RewardType::Fungible,
            &input(TokenStandard::Erc20, "10"),
            Some(descriptor(18, U256::from(30) * U256::exp10(18))),
            CampaignState {
                max_completions: 500,
                completed_count: 500,
            },
        )
        .unwrap();
        assert_eq!(config.recipient_count, 3);
        assert_eq!(config.total_amount_required, Decimal::from(30));
        assert!(config.has_sufficient_balance);
        assert_eq!(config.status, ConfigStatus::Valid);
    }

    #[test]
    fn compute_config_rejects_mismatched_reward_type() {
        let err = compute_config(
            RewardTier::Standard,
            RewardType::NonFungible,
            &input(TokenStandard::Erc20, "1"),
            None,
            CampaignState::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedStandard(_)));
    }

    #[tokio::test]
    async fn configure_reaches_valid_with_resolved_contract() {
        let configurator = configurator(Some(descriptor(18, U256::exp10(18))), Duration::ZERO);
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        configurator
            .configure(
                &mut config,
                &input(TokenStandard::Erc20, "0.0001"),
                CampaignState {
                    max_completions: 1000,
                    completed_count: 0,
                },
            )
            .await
            .unwrap();
        assert_eq!(config.status, ConfigStatus::Valid);
        assert_eq!(config.total_amount_display, "0.100000000000000000");
        assert!(config.is_ready_for_distribution());
    }

    #[tokio::test]
    async fn network_failure_leaves_config_invalid() {
        let configurator = configurator(None, Duration::ZERO);
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        let err = configurator
            .configure(&mut config, &input(TokenStandard::Erc20, "1"), CampaignState::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(config.status, ConfigStatus::Invalid);
        assert_eq!(config.validation_errors.len(), 1);
    }

    #[tokio::test]
    async fn malformed_holder_is_rejected_before_introspection() {
        let configurator = configurator(Some(descriptor(18, U256::zero())), Duration::from_secs(30));
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        let mut bad = input(TokenStandard::Erc20, "1");
        bad.holder_address = "0xnothex".to_string();
        let err = tokio::time::timeout(
            Duration::from_secs(1),
            configurator.configure(&mut config, &bad, CampaignState::default()),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, AppError::MalformedAddress { .. }));
        assert_eq!(config.status, ConfigStatus::Invalid);
    }

    #[tokio::test]
    async fn cancelled_validation_stays_pending() {
        let configurator = configurator(Some(descriptor(18, U256::exp10(30))), Duration::from_secs(30));
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            configurator.configure(&mut config, &input(TokenStandard::Erc20, "1"), CampaignState::default()),
        )
        .await;
        assert!(outcome.is_err());
        assert_eq!(config.status, ConfigStatus::Pending);
        assert!(!config.is_valid);
        assert!(config.resolved_contract.is_none());
    }

    #[tokio::test]
    async fn excess_precision_after_resolution_is_invalid() {
        let configurator = configurator(Some(descriptor(2, U256::exp10(30))), Duration::ZERO);
        let mut config = RewardConfig::new(RewardTier::Premium, RewardType::Fungible);
        let err = configurator
            .configure(&mut config, &input(TokenStandard::Erc20, "0.001"), CampaignState::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
        assert_eq!(config.status, ConfigStatus::Invalid);
        assert!(config.resolved_contract.is_some());
    }

    #[test]
    fn update_amount_recomputes_without_revalidation() {
        let configurator = configurator(None, Duration::ZERO);
        let mut config = compute_config(
            RewardTier::Premium,
            RewardType::Fungible,
            &input(TokenStandard::Erc20, "1"),
            Some(descriptor(18, U256::from(6) * U256::exp10(18))),
            CampaignState::default(),
        )
        .unwrap();
        configurator
            .update_amount(&mut config, Decimal::from(3))
            .unwrap();
        assert_eq!(config.total_amount_required, Decimal::from(9));
        assert!(!config.has_sufficient_balance);
        assert_eq!(config.status, ConfigStatus::Valid);

        assert!(configurator
            .update_amount(&mut config, Decimal::from_str("0.00001").unwrap())
            .is_err());
        assert_eq!(config.amount_per_recipient, Some(Decimal::from(3)));
    }

    #[tokio::test]
    async fn fixing_the_amount_revalidates_without_chain_reads() {
        let configurator = configurator(Some(descriptor(2, U256::exp10(30))), Duration::ZERO);
        let mut config = RewardConfig::new(RewardTier::Premium, RewardType::Fungible);
        configurator
            .configure(&mut config, &input(TokenStandard::Erc20, "0.001"), CampaignState::default())
            .await
            .unwrap_err();
        assert_eq!(config.status, ConfigStatus::Invalid);
        assert!(config.amount_error.is_some());

        configurator
            .update_amount(&mut config, Decimal::from_str("0.5").unwrap())
            .unwrap();
        assert_eq!(config.status, ConfigStatus::Valid);
        assert!(config.validation_errors.is_empty());
        assert!(config.amount_error.is_none());
        assert_eq!(config.total_amount_required, Decimal::from_str("1.5").unwrap());
        assert!(config.is_ready_for_distribution());
    }

    #[tokio::test]
    async fn oversized_total_is_rejected_before_introspection() {
        let configurator = configurator(Some(descriptor(18, U256::MAX)), Duration::from_secs(30));
        let mut config = RewardConfig::new(RewardTier::Standard, RewardType::Fungible);
        let campaign = CampaignState {
            max_completions: 1_000_000_000,
            completed_count: 0,
        };
        let err = tokio::time::timeout(
            Duration::from_secs(1),
            configurator.configure(
                &mut config,
                &input(TokenStandard::Erc20, "100000000000000000000"),
                campaign,
            ),
        )
        .await
        .unwrap()
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
        assert_eq!(config.status, ConfigStatus::Invalid);
        assert_eq!(config.validation_errors.len(), 1);
        assert_eq!(config.total_amount_required, Decimal::ZERO);

        assert!(matches!(
            compute_config(
                RewardTier::Standard,
                RewardType::Fungible,
                &input(TokenStandard::Erc20, "100000000000000000000"),
                Some(descriptor(18, U256::MAX)),
                campaign,
            ),
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[test]
    fn overflowing_recount_or_amount_leaves_tiers_unchanged() {
        let configurator = configurator(None, Duration::ZERO);
        let mut unified = UnifiedRewardConfig::new("c-2", "0x00000000000000000000000000000000000000aa");
        let standard = compute_config(
            RewardTier::Standard,
            RewardType::Fungible,
            &input(TokenStandard::Erc20, "100000000000000000000"),
            Some(descriptor(18, U256::MAX)),
            CampaignState {
                max_completions: 10,
                completed_count: 0,
            },
        )
        .unwrap();
        unified.set_tier(standard);

        let err = apply_campaign_state(
            &mut unified,
            CampaignState {
                max_completions: 1_000_000_000,
                completed_count: 0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidAmount(_)));
        assert_eq!(unified.max_completions, 0);
        let standard = unified.standard.as_mut().unwrap();
        assert_eq!(standard.recipient_count, 10);

        let huge = Decimal::from_str("10000000000000000000000000000").unwrap();
        assert!(configurator.update_amount(standard, huge).is_err());
        assert_eq!(
            standard.total_amount_required,
            Decimal::from_str("1000000000000000000000").unwrap()
        );
        assert_eq!(standard.status, ConfigStatus::Valid);
    }

    #[test]
    fn campaign_changes_reach_both_tiers() {
        let mut unified = UnifiedRewardConfig::new("c-1", "0x00000000000000000000000000000000000000aa");
        let standard = compute_config(
            RewardTier::Standard,
            RewardType::Fungible,
            &input(TokenStandard::Erc20, "2"),
            Some(descriptor(18, U256::exp10(30))),
            CampaignState {
                max_completions: 10,
                completed_count: 0,
            },
        )
        .unwrap();
        unified.set_tier(standard);
        apply_campaign_state(
            &mut unified,
            CampaignState {
                max_completions: 50,
                completed_count: 4,
            },
        )
        .unwrap();
        let standard = unified.tier(RewardTier::Standard).unwrap();
        assert_eq!(standard.recipient_count, 50);
        assert_eq!(standard.total_amount_required, Decimal::from(100));
        assert_eq!(unified.max_completions, 50);
    }
}
