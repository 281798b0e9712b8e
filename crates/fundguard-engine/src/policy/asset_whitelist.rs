//! Asset whitelist: a fund may only receive assets from a fixed list.
//!
//! Only incoming assets are checked. Anything the fund already holds was
//! checked when it entered (or at activation), so outgoing assets and all
//! amounts are ignored. The list is fixed at creation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use fundguard_core::error::{FundError, Result};
use fundguard_core::{Address, AssetFlowDescriptor, PolicyHook};

use super::address_list::AddressListStore;
use super::rule::{decode_settings, ensure_policy_manager, Policy, PolicyCtx};

pub const ASSET_WHITELIST: &str = "asset-whitelist";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetListSettings {
    pub assets: Vec<Address>,
}

pub struct AssetWhitelist {
    policy_manager: Address,
    list: AddressListStore,
}

impl AssetWhitelist {
    pub fn new(policy_manager: Address) -> Self {
        Self {
            policy_manager,
            list: AddressListStore::new(),
        }
    }
}

impl Policy for AssetWhitelist {
    fn identifier(&self) -> &'static str {
        ASSET_WHITELIST
    }

    fn implemented_hooks(&self) -> &'static [PolicyHook] {
        &[PolicyHook::PostCallOnIntegration]
    }

    fn policy_manager(&self) -> Address {
        self.policy_manager
    }

    fn add_fund_settings(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        let settings: AssetListSettings = decode_settings(ASSET_WHITELIST, settings)?;

        let denomination = ctx.assets.denomination_asset(ctx.fund)?;
        if !settings.assets.contains(&denomination) {
            return Err(FundError::Configuration(
                "denomination asset not whitelisted".into(),
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
        if let Some(asset) = self.list.find(ctx.fund, &tracked, false) {
            tracing::debug!(fund = %ctx.fund, %asset, "tracked asset outside whitelist");
            return Err(FundError::Activation(
                "non-whitelisted asset detected".into(),
            ));
        }
        Ok(())
    }

    fn validate_rule(
        &self,
        fund: Address,
        _hook: PolicyHook,
        descriptor: &AssetFlowDescriptor,
    ) -> Result<bool> {
        Ok(descriptor
            .incoming_assets()
            .all(|asset| self.list.contains(fund, asset)))
    }
}
