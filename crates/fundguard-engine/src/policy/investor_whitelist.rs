//! Investor whitelist: only listed buyers may purchase shares.
//!
//! Unlike the asset lists this rule is mutable after creation: the fund owner
//! can add and remove investors at any time.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use fundguard_core::error::{FundError, Result};
use fundguard_core::{Address, AssetFlowDescriptor, PolicyHook};

use super::address_list::AddressListStore;
use super::rule::{decode_settings, ensure_policy_manager, Policy, PolicyCtx};

pub const INVESTOR_WHITELIST: &str = "investor-whitelist";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InvestorListSettings {
    #[serde(default)]
    pub add: Vec<Address>,
    #[serde(default)]
    pub remove: Vec<Address>,
}

pub struct InvestorWhitelist {
    policy_manager: Address,
    list: AddressListStore,
}

impl InvestorWhitelist {
    pub fn new(policy_manager: Address) -> Self {
        Self {
            policy_manager,
            list: AddressListStore::new(),
        }
    }

    fn apply(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()> {
        let settings: InvestorListSettings = decode_settings(INVESTOR_WHITELIST, settings)?;
        if let Some(both) = settings.add.iter().find(|a| settings.remove.contains(a)) {
            return Err(FundError::Configuration(format!(
                "{INVESTOR_WHITELIST}: {both} is both added and removed"
            )));
        }

        self.list.remove_items(ctx.fund, &settings.remove, ctx.audit);
        self.list.add_items(ctx.fund, &settings.add, ctx.audit);
        Ok(())
    }
}

impl Policy for InvestorWhitelist {
    fn identifier(&self) -> &'static str {
        INVESTOR_WHITELIST
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
        self.apply(ctx, settings)
    }

    fn update_fund_settings(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        self.apply(ctx, settings)
    }

    fn remove_fund_settings(&self, ctx: &PolicyCtx<'_>) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        self.list.clear(ctx.fund);
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
        Ok(self.list.contains(fund, descriptor.actor))
    }
}
