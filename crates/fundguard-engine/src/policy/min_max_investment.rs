//! Min/max investment: bounds the denomination-asset amount of a single
//! share purchase. A `max` of 0 means no upper bound.

use bytes::Bytes;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use fundguard_core::error::{FundError, Result};
use fundguard_core::{Address, AssetFlowDescriptor, PolicyHook};

use super::rule::{decode_settings, ensure_policy_manager, Policy, PolicyCtx};

pub const MIN_MAX_INVESTMENT: &str = "min-max-investment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvestmentLimits {
    #[serde(default)]
    pub min: u128,
    #[serde(default)]
    pub max: u128,
}

impl InvestmentLimits {
    fn validate(&self) -> Result<()> {
        if self.max != 0 && self.min > self.max {
            return Err(FundError::Configuration(format!(
                "{MIN_MAX_INVESTMENT}: min {} exceeds max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    fn allows(&self, amount: u128) -> bool {
        amount >= self.min && (self.max == 0 || amount <= self.max)
    }
}

#[derive(Debug, Clone, Copy)]
struct FundLimits {
    denomination: Address,
    limits: InvestmentLimits,
}

pub struct MinMaxInvestment {
    policy_manager: Address,
    limits: DashMap<Address, FundLimits>,
}

impl MinMaxInvestment {
    pub fn new(policy_manager: Address) -> Self {
        Self {
            policy_manager,
            limits: DashMap::new(),
        }
    }

    fn store(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()> {
        let limits: InvestmentLimits = decode_settings(MIN_MAX_INVESTMENT, settings)?;
        limits.validate()?;
        let denomination = ctx.assets.denomination_asset(ctx.fund)?;
        self.limits.insert(ctx.fund, FundLimits { denomination, limits });
        Ok(())
    }
}

impl Policy for MinMaxInvestment {
    fn identifier(&self) -> &'static str {
        MIN_MAX_INVESTMENT
    }

    fn implemented_hooks(&self) -> &'static [PolicyHook] {
        &[PolicyHook::PreBuyShares]
    }

    fn policy_manager(&self) -> Address {
        self.policy_manager
    }

    fn update_fund_settings_allowed(&self) -> bool {
        true
    }

    fn add_fund_settings(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        self.store(ctx, settings)
    }

    fn update_fund_settings(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        self.store(ctx, settings)
    }

    fn remove_fund_settings(&self, ctx: &PolicyCtx<'_>) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        self.limits.remove(&ctx.fund);
        Ok(())
    }

    fn activate_for_fund(&self, ctx: &PolicyCtx<'_>) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)
    }

    fn validate_rule(
        &self,
        fund: Address,
        _hook: PolicyHook,
        descriptor: &AssetFlowDescriptor,
    ) -> Result<bool> {
        let Some(entry) = self.limits.get(&fund) else {
            return Err(FundError::Internal(format!(
                "{MIN_MAX_INVESTMENT}: no settings for {fund}"
            )));
        };
        let amount = descriptor.incoming_amount(entry.denomination);
        Ok(entry.limits.allows(amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_is_unbounded() {
        let l = InvestmentLimits { min: 10, max: 0 };
        assert!(l.validate().is_ok());
        assert!(!l.allows(9));
        assert!(l.allows(u128::MAX));
    }

    #[test]
    fn bounds_are_inclusive() {
        let l = InvestmentLimits { min: 10, max: 20 };
        assert!(l.allows(10));
        assert!(l.allows(20));
        assert!(!l.allows(21));
        assert!(InvestmentLimits { min: 30, max: 20 }.validate().is_err());
    }
}
