use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use dashmap::DashMap;

use fundguard_core::error::{FundError, Result};
use fundguard_core::{
    Address, AssetFlowDescriptor, AssetRegistry, AuditEvent, AuditLog, MemoryAuditLog, PolicyHook,
};

use crate::obs::EngineMetrics;

use super::rule::{Policy, PolicyCtx};
use super::{AdapterList, AssetBlacklist, AssetWhitelist, InvestorWhitelist, MinMaxInvestment};

/// Settings blob for one rule on one fund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    pub id: String,
    pub settings: Bytes,
}

impl PolicyConfig {
    pub fn new(id: impl Into<String>, settings: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            settings: settings.into(),
        }
    }
}

/// Rules enabled for one fund, in enabling order. Identifiers are unique.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    entries: Vec<PolicyConfig>,
}

impl RuleSet {
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&PolicyConfig> {
        self.entries.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Owns fund -> enabled rules -> settings, and evaluates rules at hooks.
///
/// The manager does not lock funds itself; callers (the lifecycle manager)
/// serialize all calls for one fund.
pub struct PolicyManager {
    address: Address,
    registry: DashMap<&'static str, Arc<dyn Policy>>,
    rule_sets: DashMap<Address, RuleSet>,
    audit: Arc<dyn AuditLog>,
    metrics: Arc<EngineMetrics>,
}

impl PolicyManager {
    pub fn new(address: Address, audit: Arc<dyn AuditLog>, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            address,
            registry: DashMap::new(),
            rule_sets: DashMap::new(),
            audit,
            metrics,
        }
    }

    /// Manager with every built-in rule registered.
    pub fn with_builtin_policies(
        address: Address,
        audit: Arc<dyn AuditLog>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        let pm = Self::new(address, audit, metrics);
        pm.register_policy(Arc::new(AssetWhitelist::new(address)));
        pm.register_policy(Arc::new(AssetBlacklist::new(address)));
        pm.register_policy(Arc::new(AdapterList::whitelist(address)));
        pm.register_policy(Arc::new(AdapterList::blacklist(address)));
        pm.register_policy(Arc::new(InvestorWhitelist::new(address)));
        pm.register_policy(Arc::new(MinMaxInvestment::new(address)));
        pm
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn register_policy(&self, policy: Arc<dyn Policy>) {
        if policy.policy_manager() != self.address {
            tracing::warn!(
                policy = policy.identifier(),
                expected = %self.address,
                actual = %policy.policy_manager(),
                "registered policy is bound to a different policy manager"
            );
        }
        self.registry.insert(policy.identifier(), policy);
    }

    pub fn registered_policies(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.registry.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn policy(&self, id: &str) -> Option<Arc<dyn Policy>> {
        self.registry.get(id).map(|e| e.value().clone())
    }

    pub fn policies_for_fund(&self, fund: Address) -> Vec<String> {
        self.rule_sets
            .get(&fund)
            .map(|rs| rs.ids())
            .unwrap_or_default()
    }

    pub fn policy_config(&self, fund: Address, id: &str) -> Option<PolicyConfig> {
        self.rule_sets.get(&fund).and_then(|rs| rs.get(id).cloned())
    }

    fn resolve(&self, id: &str) -> Result<Arc<dyn Policy>> {
        self.policy(id)
            .ok_or_else(|| FundError::UnknownPolicy(id.to_string()))
    }

    fn ctx<'a>(
        &self,
        fund: Address,
        assets: &'a dyn AssetRegistry,
        audit: &'a dyn AuditLog,
    ) -> PolicyCtx<'a> {
        PolicyCtx {
            caller: self.address,
            fund,
            assets,
            audit,
        }
    }

    fn flush(&self, staged: &MemoryAuditLog) {
        for ev in staged.events() {
            self.audit.record(ev);
        }
    }

    /// Enable the initial rule set of a fund.
    ///
    /// All-or-nothing: if any rule rejects its settings, settings already
    /// added by this call are removed again and no rule set is stored.
    pub fn enable_policies_for_fund(
        &self,
        fund: Address,
        configs: &[PolicyConfig],
        assets: &dyn AssetRegistry,
    ) -> Result<()> {
        if self.rule_sets.contains_key(&fund) {
            return Err(FundError::InvalidState(format!(
                "policies already enabled for {fund}"
            )));
        }

        let mut seen = HashSet::with_capacity(configs.len());
        let mut resolved = Vec::with_capacity(configs.len());
        for cfg in configs {
            if !seen.insert(cfg.id.as_str()) {
                return Err(FundError::Configuration(format!(
                    "policy listed twice: {}",
                    cfg.id
                )));
            }
            resolved.push((self.resolve(&cfg.id)?, cfg));
        }

        let staged = MemoryAuditLog::new();
        let ctx = self.ctx(fund, assets, &staged);
        for (i, (policy, cfg)) in resolved.iter().enumerate() {
            if let Err(e) = policy.add_fund_settings(&ctx, &cfg.settings) {
                tracing::info!(%fund, policy = %cfg.id, error = %e, "policy rejected fund settings");
                self.roll_back(&ctx, resolved[..i].iter().map(|(p, _)| p));
                return Err(e);
            }
        }

        self.rule_sets.insert(
            fund,
            RuleSet {
                entries: configs.to_vec(),
            },
        );
        self.flush(&staged);
        for cfg in configs {
            self.audit.record(AuditEvent::PolicyEnabled {
                fund,
                policy: cfg.id.clone(),
            });
        }
        tracing::info!(%fund, policies = configs.len(), "policies enabled");
        Ok(())
    }

    fn roll_back<'p>(&self, ctx: &PolicyCtx<'_>, added: impl Iterator<Item = &'p Arc<dyn Policy>>) {
        for policy in added {
            if let Err(e) = policy.remove_fund_settings(ctx) {
                tracing::error!(fund = %ctx.fund, policy = policy.identifier(), error = %e, "policy rollback failed");
            }
        }
    }

    /// Attach one more rule to an operating fund. The rule must accept both
    /// the settings and the fund's current state.
    pub fn enable_policy_for_fund(
        &self,
        fund: Address,
        config: PolicyConfig,
        assets: &dyn AssetRegistry,
    ) -> Result<()> {
        if self
            .rule_sets
            .get(&fund)
            .map(|rs| rs.contains(&config.id))
            .unwrap_or(false)
        {
            return Err(FundError::Configuration(format!(
                "policy already enabled: {}",
                config.id
            )));
        }
        let policy = self.resolve(&config.id)?;

        let staged = MemoryAuditLog::new();
        let ctx = self.ctx(fund, assets, &staged);
        policy.add_fund_settings(&ctx, &config.settings)?;
        if let Err(e) = policy.activate_for_fund(&ctx) {
            tracing::info!(%fund, policy = %config.id, error = %e, "policy activation failed");
            self.roll_back(&ctx, std::iter::once(&policy));
            return Err(e);
        }

        let id = config.id.clone();
        self.rule_sets.entry(fund).or_default().entries.push(config);
        self.flush(&staged);
        self.audit.record(AuditEvent::PolicyEnabled {
            fund,
            policy: id.clone(),
        });
        tracing::info!(%fund, policy = %id, "policy attached");
        Ok(())
    }

    /// Replace a rule's settings, if the rule supports updates.
    pub fn update_policy_settings_for_fund(
        &self,
        fund: Address,
        config: PolicyConfig,
        assets: &dyn AssetRegistry,
    ) -> Result<()> {
        if !self
            .rule_sets
            .get(&fund)
            .map(|rs| rs.contains(&config.id))
            .unwrap_or(false)
        {
            return Err(FundError::Configuration(format!(
                "policy not enabled for {fund}: {}",
                config.id
            )));
        }
        let policy = self.resolve(&config.id)?;
        if !policy.update_fund_settings_allowed() {
            return Err(FundError::UnsupportedOperation(
                "updates not allowed for this policy".into(),
            ));
        }

        let staged = MemoryAuditLog::new();
        let ctx = self.ctx(fund, assets, &staged);
        policy.update_fund_settings(&ctx, &config.settings)?;

        if let Some(mut rs) = self.rule_sets.get_mut(&fund) {
            if let Some(entry) = rs.entries.iter_mut().find(|c| c.id == config.id) {
                entry.settings = config.settings.clone();
            }
        }
        self.flush(&staged);
        self.audit.record(AuditEvent::PolicySettingsUpdated {
            fund,
            policy: config.id.clone(),
        });
        tracing::info!(%fund, policy = %config.id, "policy settings updated");
        Ok(())
    }

    /// Evaluate every enabled rule implementing `hook`.
    ///
    /// Rejects with `RuleViolation` naming the first failing rule.
    pub fn validate_action(
        &self,
        fund: Address,
        hook: PolicyHook,
        descriptor: &AssetFlowDescriptor,
    ) -> Result<()> {
        let started = Instant::now();
        let res = self.validate_inner(fund, hook, descriptor);
        self.metrics
            .validation_duration
            .observe(&[("hook", hook.as_str())], started.elapsed());
        res
    }

    fn validate_inner(
        &self,
        fund: Address,
        hook: PolicyHook,
        descriptor: &AssetFlowDescriptor,
    ) -> Result<()> {
        for id in self.policies_for_fund(fund) {
            let policy = self.resolve(&id)?;
            if !policy.implemented_hooks().contains(&hook) {
                continue;
            }

            match policy.validate_rule(fund, hook, descriptor) {
                Ok(true) => {
                    self.metrics.policy_evaluations.inc(&[
                        ("policy", id.as_str()),
                        ("hook", hook.as_str()),
                        ("outcome", "pass"),
                    ]);
                }
                Ok(false) => {
                    self.metrics.policy_evaluations.inc(&[
                        ("policy", id.as_str()),
                        ("hook", hook.as_str()),
                        ("outcome", "fail"),
                    ]);
                    tracing::info!(%fund, policy = %id, %hook, selector = %descriptor.selector, "rule violation");
                    return Err(FundError::RuleViolation { rule: id });
                }
                Err(e) => {
                    self.metrics.policy_evaluations.inc(&[
                        ("policy", id.as_str()),
                        ("hook", hook.as_str()),
                        ("outcome", "error"),
                    ]);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Run every enabled rule's activation check against the fund's state.
    pub fn activate_policies_for_fund(&self, fund: Address, assets: &dyn AssetRegistry) -> Result<()> {
        let ctx = self.ctx(fund, assets, self.audit.as_ref());
        for id in self.policies_for_fund(fund) {
            let policy = self.resolve(&id)?;
            policy.activate_for_fund(&ctx).map_err(|e| {
                tracing::info!(%fund, policy = %id, error = %e, "policy activation check failed");
                e
            })?;
        }
        Ok(())
    }

    /// Re-check every enabled rule against the fund's post-migration state.
    pub fn migrate_policies(&self, fund: Address, assets: &dyn AssetRegistry) -> Result<()> {
        tracing::debug!(%fund, "re-activating policies after migration");
        self.activate_policies_for_fund(fund, assets)
    }
}
