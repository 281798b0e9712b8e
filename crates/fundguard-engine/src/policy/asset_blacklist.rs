//! Asset blacklist: a fund may never receive or hold listed assets.

use bytes::Bytes;

use fundguard_core::error::{FundError, Result};
use fundguard_core::{Address, AssetFlowDescriptor, PolicyHook};

use super::address_list::AddressListStore;
use super::asset_whitelist::AssetListSettings;
use super::rule::{decode_settings, ensure_policy_manager, Policy, PolicyCtx};

pub const ASSET_BLACKLIST: &str = "asset-blacklist";

pub struct AssetBlacklist {
    policy_manager: Address,
    list: AddressListStore,
}

impl AssetBlacklist {
    pub fn new(policy_manager: Address) -> Self {
        Self {
            policy_manager,
            list: AddressListStore::new(),
        }
    }
}

impl Policy for AssetBlacklist {
    fn identifier(&self) -> &'static str {
        ASSET_BLACKLIST
    }

    fn implemented_hooks(&self) -> &'static [PolicyHook] {
        &[PolicyHook::PostCallOnIntegration]
    }

    fn policy_manager(&self) -> Address {
        self.policy_manager
    }

    fn add_fund_settings(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        let settings: AssetListSettings = decode_settings(ASSET_BLACKLIST, settings)?;

        let denomination = ctx.assets.denomination_asset(ctx.fund)?;
        if settings.assets.contains(&denomination) {
            return Err(FundError::Configuration(
                "denomination asset blacklisted".into(),
            ));
        }

        self.list.add_items(ctx.fund, &settings.assets, ctx.audit);
        Ok(())
    }

    fn remove_fund_settings(&self, ctx: &PolicyCtx<'_>) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        self.list.clear(ctx.fund);
        Ok(())
    }

    fn activate_for_fund(&self, ctx: &PolicyCtx<'_>) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        let tracked = ctx.assets.tracked_assets(ctx.fund)?;
        if self.list.find(ctx.fund, &tracked, true).is_some() {
            return Err(FundError::Activation("blacklisted asset detected".into()));
        }
        Ok(())
    }

    fn validate_rule(
        &self,
        fund: Address,
        _hook: PolicyHook,
        descriptor: &AssetFlowDescriptor,
    ) -> Result<bool> {
        Ok(!descriptor
            .incoming_assets()
            .any(|asset| self.list.contains(fund, asset)))
    }
}
