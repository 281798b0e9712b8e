//! Migration coordinator: signal, cancel and execute a fund's move to a new
//! release.
//!
//! The coordinator never locks funds. The lifecycle manager hands it the
//! already-locked record, so each step runs to completion before any other
//! operation on the same fund is observed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fundguard_core::error::{FundError, Result};
use fundguard_core::{Address, AuditEvent, AuditLog};

use crate::fees::FeeSettler;
use crate::obs::EngineMetrics;
use crate::policy::PolicyManager;

use super::fund::{FundRecord, FundStatus, MigrationRequest, Release};

pub const MAX_MIGRATION_TIMELOCK_SECS: u64 = 365 * 24 * 60 * 60;

pub struct MigrationCoordinator {
    dispatcher_owner: Address,
    timelock_secs: AtomicU64,
    policies: Arc<PolicyManager>,
    fees: Arc<dyn FeeSettler>,
    audit: Arc<dyn AuditLog>,
    metrics: Arc<EngineMetrics>,
}

impl MigrationCoordinator {
    pub fn new(
        dispatcher_owner: Address,
        timelock_secs: u64,
        policies: Arc<PolicyManager>,
        fees: Arc<dyn FeeSettler>,
        audit: Arc<dyn AuditLog>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            dispatcher_owner,
            timelock_secs: AtomicU64::new(timelock_secs),
            policies,
            fees,
            audit,
            metrics,
        }
    }

    pub fn dispatcher_owner(&self) -> Address {
        self.dispatcher_owner
    }

    pub fn timelock_secs(&self) -> u64 {
        self.timelock_secs.load(Ordering::SeqCst)
    }

    /// Change the timelock. Applies to pending requests too: execution always
    /// reads the current value.
    pub fn set_timelock(&self, caller: Address, secs: u64) -> Result<()> {
        if caller != self.dispatcher_owner {
            return Err(FundError::Authorization(
                "only the dispatcher owner may set the migration timelock".into(),
            ));
        }
        validate_timelock(secs)?;

        let prev = self.timelock_secs.swap(secs, Ordering::SeqCst);
        self.audit.record(AuditEvent::MigrationTimelockSet {
            prev_secs: prev,
            next_secs: secs,
        });
        tracing::info!(prev, next = secs, "migration timelock set");
        Ok(())
    }

    fn authorize(&self, caller: Address, fund: &FundRecord) -> Result<()> {
        if caller != fund.owner && caller != self.dispatcher_owner {
            return Err(FundError::Authorization(format!(
                "caller {caller} may not migrate fund {}",
                fund.id
            )));
        }
        Ok(())
    }

    pub fn signal(
        &self,
        caller: Address,
        fund: &mut FundRecord,
        target: Release,
        now: u64,
    ) -> Result<MigrationRequest> {
        self.authorize(caller, fund)?;
        if fund.pending_migration.is_some() {
            return Err(FundError::AlreadySignaled(fund.id));
        }
        if target.controller.is_zero() || target.vault_lib.is_zero() {
            return Err(FundError::Configuration(
                "migration target must name a controller and a vault implementation".into(),
            ));
        }
        if target.controller == fund.accessor {
            return Err(FundError::Configuration(format!(
                "fund {} already runs under controller {}",
                fund.id, target.controller
            )));
        }

        fund.transition(FundStatus::MigrationSignaled)?;
        let request = MigrationRequest {
            fund: fund.id,
            signaled_accessor: fund.accessor,
            target,
            signal_timestamp: now,
        };
        fund.pending_migration = Some(request.clone());

        self.audit.record(AuditEvent::MigrationSignaled {
            fund: fund.id,
            target: target.controller,
            timestamp: now,
        });
        self.metrics.migrations.inc(&[("stage", "signaled")]);
        tracing::info!(fund = %fund.id, target = %target.controller, signal_timestamp = now, "migration signaled");
        Ok(request)
    }

    pub fn cancel(&self, caller: Address, fund: &mut FundRecord) -> Result<MigrationRequest> {
        self.authorize(caller, fund)?;
        let request = fund
            .pending_migration
            .clone()
            .ok_or(FundError::NoPendingMigration(fund.id))?;

        fund.transition(FundStatus::Active)?;
        fund.pending_migration = None;

        self.audit.record(AuditEvent::MigrationCancelled {
            fund: fund.id,
            target: request.target.controller,
            signal_timestamp: request.signal_timestamp,
        });
        self.metrics.migrations.inc(&[("stage", "cancelled")]);
        tracing::info!(fund = %fund.id, "migration cancelled");
        Ok(request)
    }

    /// Execute the pending migration.
    ///
    /// Fee settlement, accessor reassignment and policy re-activation run on
    /// a copy of the record that only replaces the original once all three
    /// succeeded.
    pub fn execute(&self, caller: Address, fund: &mut FundRecord, now: u64) -> Result<MigrationRequest> {
        self.authorize(caller, fund)?;
        let request = fund
            .pending_migration
            .clone()
            .ok_or(FundError::NoPendingMigration(fund.id))?;

        let executable_at = request
            .signal_timestamp
            .saturating_add(self.timelock_secs());
        if now < executable_at {
            return Err(FundError::TimelockNotElapsed {
                fund: fund.id,
                executable_at,
                now,
            });
        }
        if fund.accessor != request.signaled_accessor {
            return Err(FundError::StaleSignal {
                fund: fund.id,
                signaled: request.signaled_accessor,
                current: fund.accessor,
            });
        }

        let next = match self.migrated_copy(fund, &request, now) {
            Ok(next) => next,
            Err(e) => {
                self.metrics.migrations.inc(&[("stage", "failed")]);
                tracing::warn!(fund = %fund.id, error = %e, "migration aborted");
                return Err(e);
            }
        };
        let prev_controller = fund.accessor;
        let prev_vault_impl = fund.vault_lib;
        *fund = next;

        self.audit.record(AuditEvent::MigrationExecuted {
            fund: fund.id,
            prev_controller,
            next_controller: fund.accessor,
            prev_vault_impl,
            next_vault_impl: fund.vault_lib,
            signal_timestamp: request.signal_timestamp,
        });
        self.metrics.migrations.inc(&[("stage", "executed")]);
        tracing::info!(
            fund = %fund.id,
            prev = %prev_controller,
            next = %fund.accessor,
            "migration executed"
        );
        Ok(request)
    }

    fn migrated_copy(&self, fund: &FundRecord, request: &MigrationRequest, now: u64) -> Result<FundRecord> {
        let mut next = fund.clone();

        let due = self.fees.settle_fees(&next, next.accessor, now)?;
        next.apply_fee_settlement(due, now)?;

        next.accessor = request.target.controller;
        next.vault_lib = request.target.vault_lib;
        next.pending_migration = None;

        self.policies.migrate_policies(next.id, &next)?;
        next.transition(FundStatus::Migrated)?;
        Ok(next)
    }
}

pub fn validate_timelock(secs: u64) -> Result<()> {
    if !(1..=MAX_MIGRATION_TIMELOCK_SECS).contains(&secs) {
        return Err(FundError::Configuration(format!(
            "migration timelock must be between 1 and {MAX_MIGRATION_TIMELOCK_SECS} seconds"
        )));
    }
    Ok(())
}
