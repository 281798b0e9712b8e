//! Adapter whitelist / blacklist: restrict which adapters a fund may route
//! integration calls through.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use fundguard_core::error::Result;
use fundguard_core::{Address, AssetFlowDescriptor, PolicyHook};

use super::address_list::AddressListStore;
use super::rule::{decode_settings, ensure_policy_manager, Policy, PolicyCtx};

pub const ADAPTER_WHITELIST: &str = "adapter-whitelist";
pub const ADAPTER_BLACKLIST: &str = "adapter-blacklist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMode {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterListSettings {
    pub adapters: Vec<Address>,
}

pub struct AdapterList {
    mode: ListMode,
    policy_manager: Address,
    list: AddressListStore,
}

impl AdapterList {
    pub fn whitelist(policy_manager: Address) -> Self {
        Self::new(ListMode::Allow, policy_manager)
    }

    pub fn blacklist(policy_manager: Address) -> Self {
        Self::new(ListMode::Deny, policy_manager)
    }

    fn new(mode: ListMode, policy_manager: Address) -> Self {
        Self {
            mode,
            policy_manager,
            list: AddressListStore::new(),
        }
    }
}

impl Policy for AdapterList {
    fn identifier(&self) -> &'static str {
        match self.mode {
            ListMode::Allow => ADAPTER_WHITELIST,
            ListMode::Deny => ADAPTER_BLACKLIST,
        }
    }

    fn implemented_hooks(&self) -> &'static [PolicyHook] {
        &[PolicyHook::PreCallOnIntegration]
    }

    fn policy_manager(&self) -> Address {
        self.policy_manager
    }

    fn add_fund_settings(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        let settings: AdapterListSettings = decode_settings(self.identifier(), settings)?;
        self.list.add_items(ctx.fund, &settings.adapters, ctx.audit);
        Ok(())
    }

    fn remove_fund_settings(&self, ctx: &PolicyCtx<'_>) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)?;
        self.list.clear(ctx.fund);
        Ok(())
    }

    // Adapters are only seen per call; there is no standing state to check.
    fn activate_for_fund(&self, ctx: &PolicyCtx<'_>) -> Result<()> {
        ensure_policy_manager(self.policy_manager, ctx.caller)
    }

    fn validate_rule(
        &self,
        fund: Address,
        _hook: PolicyHook,
        descriptor: &AssetFlowDescriptor,
    ) -> Result<bool> {
        let listed = descriptor
            .adapter
            .map(|a| self.list.contains(fund, a))
            .unwrap_or(false);
        Ok(match self.mode {
            ListMode::Allow => listed,
            ListMode::Deny => !listed,
        })
    }
}
