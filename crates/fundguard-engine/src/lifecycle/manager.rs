use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use fundguard_core::error::{FundError, Result};
use fundguard_core::{
    Address, AssetFlowDescriptor, AssetRegistry, AuditEvent, AuditLog, PolicyHook,
};

use crate::clock::Clock;
use crate::fees::FeeSettler;
use crate::integration::AdapterRegistry;
use crate::obs::EngineMetrics;
use crate::policy::{PolicyConfig, PolicyManager};

use super::fund::{CreateFundParams, FundRecord, FundStatus, MigrationRequest, Release};
use super::migration::MigrationCoordinator;

/// First byte of engine-derived fund addresses.
const FUND_ADDRESS_TAG: u8 = 0xf0;

/// Shared collaborators of the lifecycle manager.
#[derive(Clone)]
pub struct Collaborators {
    pub policies: Arc<PolicyManager>,
    pub adapters: Arc<AdapterRegistry>,
    pub fees: Arc<dyn FeeSettler>,
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<dyn AuditLog>,
    pub metrics: Arc<EngineMetrics>,
}

/// Creates, activates, operates and migrates funds.
///
/// Every operation holds the fund's mutex for its whole duration, so actions
/// on one fund are strictly serialized while different funds proceed
/// independently.
pub struct FundLifecycleManager {
    release: Release,
    funds: DashMap<Address, Arc<Mutex<FundRecord>>>,
    nonce: AtomicU64,
    migrations: MigrationCoordinator,
    deps: Collaborators,
}

impl FundLifecycleManager {
    pub fn new(
        dispatcher_owner: Address,
        release: Release,
        migration_timelock_secs: u64,
        deps: Collaborators,
    ) -> Self {
        let migrations = MigrationCoordinator::new(
            dispatcher_owner,
            migration_timelock_secs,
            Arc::clone(&deps.policies),
            Arc::clone(&deps.fees),
            Arc::clone(&deps.audit),
            Arc::clone(&deps.metrics),
        );
        Self {
            release,
            funds: DashMap::new(),
            nonce: AtomicU64::new(0),
            migrations,
            deps,
        }
    }

    pub fn release(&self) -> Release {
        self.release
    }

    pub fn migrations(&self) -> &MigrationCoordinator {
        &self.migrations
    }

    pub fn policies(&self) -> &PolicyManager {
        &self.deps.policies
    }

    pub fn funds(&self) -> Vec<Address> {
        let mut ids: Vec<_> = self.funds.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of a fund record.
    pub fn fund(&self, fund: Address) -> Result<FundRecord> {
        self.with_fund(fund, |rec| Ok(rec.clone()))
    }

    pub fn status(&self, fund: Address) -> Result<FundStatus> {
        self.with_fund(fund, |rec| Ok(rec.status))
    }

    pub fn pending_migration(&self, fund: Address) -> Result<Option<MigrationRequest>> {
        self.with_fund(fund, |rec| Ok(rec.pending_migration.clone()))
    }

    fn with_fund<T>(&self, fund: Address, f: impl FnOnce(&mut FundRecord) -> Result<T>) -> Result<T> {
        // Clone the Arc so the map shard is released before the fund lock is taken.
        let slot = self
            .funds
            .get(&fund)
            .map(|e| Arc::clone(e.value()))
            .ok_or(FundError::UnknownFund(fund))?;
        let mut rec = slot
            .lock()
            .map_err(|_| FundError::Internal(format!("fund lock poisoned: {fund}")))?;
        f(&mut *rec)
    }

    fn observe<T>(&self, action: &str, res: Result<T>) -> Result<T> {
        let result = match &res {
            Ok(_) => "ok",
            Err(FundError::RuleViolation { .. }) => "rejected",
            Err(_) => "error",
        };
        self.deps
            .metrics
            .fund_actions
            .inc(&[("action", action), ("result", result)]);
        res
    }

    // ---- creation / activation ----

    /// Create a fund in `Created` state with its initial rule set.
    ///
    /// If any rule rejects its settings the fund is not created.
    pub fn create_fund(&self, params: CreateFundParams) -> Result<Address> {
        let res = self.create_inner(params);
        self.observe("create_fund", res)
    }

    fn create_inner(&self, params: CreateFundParams) -> Result<Address> {
        if params.owner.is_zero() {
            return Err(FundError::Configuration("fund owner must be set".into()));
        }
        if params.denomination_asset.is_zero() {
            return Err(FundError::Configuration(
                "denomination asset must be set".into(),
            ));
        }

        let n = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        let id = Address::derived(FUND_ADDRESS_TAG, n);
        let record = FundRecord::new(id, &params, self.release, self.deps.clock.now());

        self.deps
            .policies
            .enable_policies_for_fund(id, &params.policies, &record)?;

        self.deps.audit.record(AuditEvent::FundCreated {
            fund: id,
            owner: record.owner,
            denomination_asset: record.denomination_asset,
            accessor: record.accessor,
        });
        tracing::info!(fund = %id, owner = %record.owner, name = %record.name, "fund created");
        self.funds.insert(id, Arc::new(Mutex::new(record)));
        Ok(id)
    }

    /// `Created -> Active` once every enabled rule accepts the fund's state.
    pub fn activate_fund(&self, caller: Address, fund: Address) -> Result<()> {
        let res = self.with_fund(fund, |rec| {
            rec.ensure_owner(caller)?;
            if rec.status != FundStatus::Created {
                return Err(FundError::InvalidState(format!(
                    "fund {fund} is already {}",
                    rec.status
                )));
            }
            self.deps.policies.activate_policies_for_fund(fund, &*rec)?;
            rec.transition(FundStatus::Active)?;
            self.deps.audit.record(AuditEvent::FundActivated { fund });
            tracing::info!(%fund, "fund activated");
            Ok(())
        });
        self.observe("activate_fund", res)
    }

    /// Create and activate in one step.
    pub fn create_new_fund(&self, params: CreateFundParams) -> Result<Address> {
        let owner = params.owner;
        let fund = self.create_fund(params)?;
        self.activate_fund(owner, fund)?;
        Ok(fund)
    }

    // ---- fund actions ----

    /// Run an adapter call through the fund: both integration hooks must pass,
    /// then newly incoming assets become tracked.
    ///
    /// The adapter runs before the fund lock is taken, so it may read fund
    /// state through this manager.
    pub fn call_on_integration(
        &self,
        caller: Address,
        fund: Address,
        adapter: Address,
        selector: &str,
        params: &[u8],
    ) -> Result<AssetFlowDescriptor> {
        let res = self
            .describe_integration(caller, adapter, selector, params)
            .and_then(|descriptor| {
                self.with_fund(fund, |rec| {
                    rec.ensure_owner(caller)?;
                    rec.ensure_operational()?;

                    let policies = &self.deps.policies;
                    policies.validate_action(fund, PolicyHook::PreCallOnIntegration, &descriptor)?;
                    policies.validate_action(fund, PolicyHook::PostCallOnIntegration, &descriptor)?;

                    let added = rec.track_assets(descriptor.incoming_assets());
                    tracing::info!(%fund, %adapter, selector, newly_tracked = added.len(), "integration call validated");
                    Ok(descriptor)
                })
            });
        self.observe("call_on_integration", res)
    }

    fn describe_integration(
        &self,
        caller: Address,
        adapter: Address,
        selector: &str,
        params: &[u8],
    ) -> Result<AssetFlowDescriptor> {
        let flows = self
            .deps
            .adapters
            .get(adapter)?
            .parse_asset_flows(selector, params)?;
        AssetFlowDescriptor::from_adapter_flows(caller, adapter, selector, flows)
    }

    /// Track assets the fund received outside an adapter call. Validated as
    /// zero-amount incoming flows at the post-integration hook.
    pub fn add_tracked_assets(&self, caller: Address, fund: Address, assets: &[Address]) -> Result<()> {
        let res = self.with_fund(fund, |rec| {
            rec.ensure_owner(caller)?;
            rec.ensure_operational()?;

            let descriptor = assets
                .iter()
                .fold(AssetFlowDescriptor::new(caller, "addTrackedAssets"), |d, a| {
                    d.with_incoming(*a, 0)
                });
            self.deps
                .policies
                .validate_action(fund, PolicyHook::PostCallOnIntegration, &descriptor)?;

            let added = rec.track_assets(assets.iter().copied());
            tracing::info!(%fund, added = added.len(), "assets tracked");
            Ok(())
        });
        self.observe("add_tracked_assets", res)
    }

    pub fn remove_tracked_assets(&self, caller: Address, fund: Address, assets: &[Address]) -> Result<()> {
        let res = self.with_fund(fund, |rec| {
            rec.ensure_owner(caller)?;
            rec.ensure_operational()?;
            let removed = rec.untrack_assets(assets)?;
            tracing::info!(%fund, removed = removed.len(), "assets untracked");
            Ok(())
        });
        self.observe("remove_tracked_assets", res)
    }

    /// Buy shares with `amount` of the denomination asset (1 share per unit).
    pub fn buy_shares(&self, buyer: Address, fund: Address, amount: u128) -> Result<u128> {
        let res = self.with_fund(fund, |rec| {
            rec.ensure_operational()?;
            if amount == 0 {
                return Err(FundError::Configuration(
                    "investment amount must be non-zero".into(),
                ));
            }

            let descriptor = AssetFlowDescriptor::new(buyer, "buyShares")
                .with_incoming(rec.denomination_asset, amount);
            self.deps
                .policies
                .validate_action(fund, PolicyHook::PreBuyShares, &descriptor)?;

            rec.issue_shares(buyer, amount)?;
            tracing::info!(%fund, %buyer, shares = amount, "shares issued");
            Ok(amount)
        });
        self.observe("buy_shares", res)
    }

    /// Settle accrued fees under the current accessor. Returns fee shares minted.
    pub fn settle_fees(&self, caller: Address, fund: Address) -> Result<u128> {
        let res = self.with_fund(fund, |rec| {
            rec.ensure_owner(caller)?;
            rec.ensure_operational()?;
            let now = self.deps.clock.now();
            let due = self.deps.fees.settle_fees(rec, rec.accessor, now)?;
            rec.apply_fee_settlement(due, now)?;
            tracing::info!(%fund, fee_shares = due, "fees settled");
            Ok(due)
        });
        self.observe("settle_fees", res)
    }

    /// Attach a rule to an operating fund (owner only).
    pub fn enable_policy_for_fund(&self, caller: Address, fund: Address, config: PolicyConfig) -> Result<()> {
        let res = self.with_fund(fund, |rec| {
            rec.ensure_owner(caller)?;
            rec.ensure_operational()?;
            self.deps.policies.enable_policy_for_fund(fund, config, &*rec)
        });
        self.observe("enable_policy", res)
    }

    /// Update a mutable rule's settings (owner only).
    pub fn update_policy_settings_for_fund(
        &self,
        caller: Address,
        fund: Address,
        config: PolicyConfig,
    ) -> Result<()> {
        let res = self.with_fund(fund, |rec| {
            rec.ensure_owner(caller)?;
            rec.ensure_operational()?;
            self.deps
                .policies
                .update_policy_settings_for_fund(fund, config, &*rec)
        });
        self.observe("update_policy_settings", res)
    }

    /// Reassign a fund's accessor outside the migration flow (dispatcher
    /// owner only). A pending migration signal becomes stale.
    pub fn set_accessor(&self, caller: Address, fund: Address, accessor: Address) -> Result<()> {
        self.with_fund(fund, |rec| {
            if caller != self.migrations.dispatcher_owner() {
                return Err(FundError::Authorization(
                    "only the dispatcher owner may set a fund accessor".into(),
                ));
            }
            if accessor.is_zero() || accessor == rec.accessor {
                return Err(FundError::Configuration(format!(
                    "invalid accessor for {fund}: {accessor}"
                )));
            }

            let prev = rec.accessor;
            rec.accessor = accessor;
            self.deps.audit.record(AuditEvent::AccessorSet {
                fund,
                prev_accessor: prev,
                next_accessor: accessor,
            });
            tracing::warn!(%fund, %prev, next = %accessor, "fund accessor reassigned");
            Ok(())
        })
    }

    // ---- migration ----

    pub fn signal_migration(&self, caller: Address, fund: Address, target: Release) -> Result<MigrationRequest> {
        let now = self.deps.clock.now();
        self.with_fund(fund, |rec| self.migrations.signal(caller, rec, target, now))
    }

    pub fn cancel_migration(&self, caller: Address, fund: Address) -> Result<MigrationRequest> {
        self.with_fund(fund, |rec| self.migrations.cancel(caller, rec))
    }

    pub fn execute_migration(&self, caller: Address, fund: Address) -> Result<MigrationRequest> {
        let now = self.deps.clock.now();
        self.with_fund(fund, |rec| self.migrations.execute(caller, rec, now))
    }

    pub fn set_migration_timelock(&self, caller: Address, secs: u64) -> Result<()> {
        self.migrations.set_timelock(caller, secs)
    }
}

/// External read-only view; locks the fund briefly per call.
impl AssetRegistry for FundLifecycleManager {
    fn tracked_assets(&self, fund: Address) -> Result<Vec<Address>> {
        self.with_fund(fund, |rec| Ok(rec.tracked_assets.clone()))
    }

    fn denomination_asset(&self, fund: Address) -> Result<Address> {
        self.with_fund(fund, |rec| Ok(rec.denomination_asset))
    }
}
