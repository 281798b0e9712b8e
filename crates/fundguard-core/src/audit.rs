//! Append-only audit log.
//!
//! Events are fire-and-forget: sinks must not fail the operation that emitted
//! them, so `AuditLog::record` has no error path.

use std::sync::Mutex;

use serde::Serialize;

use crate::address::Address;

/// Audit record emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    AddressesAdded {
        fund: Address,
        items: Vec<Address>,
    },
    AddressesRemoved {
        fund: Address,
        items: Vec<Address>,
    },
    FundCreated {
        fund: Address,
        owner: Address,
        denomination_asset: Address,
        accessor: Address,
    },
    FundActivated {
        fund: Address,
    },
    PolicyEnabled {
        fund: Address,
        policy: String,
    },
    PolicySettingsUpdated {
        fund: Address,
        policy: String,
    },
    AccessorSet {
        fund: Address,
        prev_accessor: Address,
        next_accessor: Address,
    },
    MigrationSignaled {
        fund: Address,
        target: Address,
        timestamp: u64,
    },
    MigrationCancelled {
        fund: Address,
        target: Address,
        signal_timestamp: u64,
    },
    MigrationExecuted {
        fund: Address,
        prev_controller: Address,
        next_controller: Address,
        prev_vault_impl: Address,
        next_vault_impl: Address,
        signal_timestamp: u64,
    },
    MigrationTimelockSet {
        prev_secs: u64,
        next_secs: u64,
    },
}

impl AuditEvent {
    /// Stable event name (matches the serialized `event` tag).
    pub fn name(&self) -> &'static str {
        match self {
            AuditEvent::AddressesAdded { .. } => "addresses_added",
            AuditEvent::AddressesRemoved { .. } => "addresses_removed",
            AuditEvent::FundCreated { .. } => "fund_created",
            AuditEvent::FundActivated { .. } => "fund_activated",
            AuditEvent::PolicyEnabled { .. } => "policy_enabled",
            AuditEvent::PolicySettingsUpdated { .. } => "policy_settings_updated",
            AuditEvent::AccessorSet { .. } => "accessor_set",
            AuditEvent::MigrationSignaled { .. } => "migration_signaled",
            AuditEvent::MigrationCancelled { .. } => "migration_cancelled",
            AuditEvent::MigrationExecuted { .. } => "migration_executed",
            AuditEvent::MigrationTimelockSet { .. } => "migration_timelock_set",
        }
    }

    /// The fund the event concerns, if any.
    pub fn fund(&self) -> Option<Address> {
        match self {
            AuditEvent::AddressesAdded { fund, .. }
            | AuditEvent::AddressesRemoved { fund, .. }
            | AuditEvent::FundCreated { fund, .. }
            | AuditEvent::FundActivated { fund }
            | AuditEvent::PolicyEnabled { fund, .. }
            | AuditEvent::PolicySettingsUpdated { fund, .. }
            | AuditEvent::AccessorSet { fund, .. }
            | AuditEvent::MigrationSignaled { fund, .. }
            | AuditEvent::MigrationCancelled { fund, .. }
            | AuditEvent::MigrationExecuted { fund, .. } => Some(*fund),
            AuditEvent::MigrationTimelockSet { .. } => None,
        }
    }
}

/// Audit sink passed into the engine.
pub trait AuditLog: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// In-memory sink (tests, simulations).
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events recorded so far.
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn events_for(&self, fund: Address) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.fund() == Some(fund))
            .collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn record(&self, event: AuditEvent) {
        // A poisoned lock only means another writer panicked mid-push; the
        // vector itself is still valid.
        match self.events.lock() {
            Ok(mut g) => g.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Sink that emits each event as a structured `tracing` record on the
/// `audit` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, event: AuditEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(target: "audit", event = event.name(), %json),
            Err(e) => tracing::warn!(target: "audit", event = event.name(), error = %e, "audit encode failed"),
        }
    }
}
