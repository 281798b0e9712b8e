use bytes::Bytes;
use serde::de::DeserializeOwned;

use fundguard_core::error::{FundError, Result};
use fundguard_core::{Address, AssetFlowDescriptor, AssetRegistry, AuditLog, PolicyHook};

/// Per-call context handed to rules (borrow tools instead of owning).
///
/// `audit` may be a staging buffer: the policy manager only forwards the
/// events to the real sink once the whole operation has committed.
pub struct PolicyCtx<'a> {
    pub caller: Address,
    pub fund: Address,
    pub assets: &'a dyn AssetRegistry,
    pub audit: &'a dyn AuditLog,
}

/// A rule gating fund actions at one or more hooks.
///
/// Implementations keep their own per-fund settings. Every settings-mutating
/// entry point and `activate_for_fund` must reject callers other than the
/// policy manager the rule was built for (see [`ensure_policy_manager`]).
pub trait Policy: Send + Sync {
    /// Stable identifier used to select the rule in configs.
    fn identifier(&self) -> &'static str;

    fn implemented_hooks(&self) -> &'static [PolicyHook];

    /// Address of the only manager allowed to configure this rule.
    fn policy_manager(&self) -> Address;

    /// Whether `update_fund_settings` is supported at all.
    fn update_fund_settings_allowed(&self) -> bool {
        false
    }

    fn add_fund_settings(&self, ctx: &PolicyCtx<'_>, settings: &Bytes) -> Result<()>;

    fn update_fund_settings(&self, _ctx: &PolicyCtx<'_>, _settings: &Bytes) -> Result<()> {
        Err(FundError::UnsupportedOperation(
            "updates not allowed for this policy".into(),
        ))
    }

    /// Drop all settings for the fund. Only used to undo a failed enable.
    fn remove_fund_settings(&self, ctx: &PolicyCtx<'_>) -> Result<()>;

    /// Check that the fund's existing state already satisfies the rule.
    fn activate_for_fund(&self, ctx: &PolicyCtx<'_>) -> Result<()>;

    /// Pure predicate. `false` is a normal rejection, not an error.
    fn validate_rule(
        &self,
        fund: Address,
        hook: PolicyHook,
        descriptor: &AssetFlowDescriptor,
    ) -> Result<bool>;
}

pub fn ensure_policy_manager(expected: Address, caller: Address) -> Result<()> {
    if caller != expected {
        return Err(FundError::Authorization(format!(
            "only the policy manager may call this (caller {caller})"
        )));
    }
    Ok(())
}

/// Decode a JSON settings blob into the rule's settings type.
pub fn decode_settings<T: DeserializeOwned>(policy: &str, settings: &Bytes) -> Result<T> {
    serde_json::from_slice(settings)
        .map_err(|e| FundError::Configuration(format!("{policy}: invalid settings: {e}")))
}

/// Encode settings into a blob (for callers building configs in code).
pub fn encode_settings<T: serde::Serialize + ?Sized>(settings: &T) -> Result<Bytes> {
    serde_json::to_vec(settings)
        .map(Bytes::from)
        .map_err(|e| FundError::Internal(format!("settings encode failed: {e}")))
}
