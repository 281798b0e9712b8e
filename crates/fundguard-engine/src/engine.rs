//! Shared engine state: wires the policy manager, adapter registry, fee
//! settlement and lifecycle manager from a validated config, then creates any
//! genesis funds the config declares.

use std::sync::Arc;

use fundguard_core::error::{FundError, Result};
use fundguard_core::{AuditLog, TracingAuditLog};

use crate::clock::{Clock, SystemClock};
use crate::config::FundguardConfig;
use crate::fees::{FeeSettler, ManagementFee, NoFees};
use crate::integration::AdapterRegistry;
use crate::lifecycle::{Collaborators, FundLifecycleManager};
use crate::obs::EngineMetrics;
use crate::policy::PolicyManager;

/// Runtime hooks the config cannot express.
pub struct EngineDeps {
    pub clock: Arc<dyn Clock>,
    pub audit: Arc<dyn AuditLog>,
}

impl Default for EngineDeps {
    fn default() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            audit: Arc::new(TracingAuditLog),
        }
    }
}

#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    cfg: FundguardConfig,
    lifecycle: FundLifecycleManager,
    policies: Arc<PolicyManager>,
    adapters: Arc<AdapterRegistry>,
    metrics: Arc<EngineMetrics>,
}

impl Engine {
    /// Build with the system clock and the tracing audit sink.
    pub fn from_config(cfg: FundguardConfig) -> Result<Self> {
        Self::new(cfg, EngineDeps::default())
    }

    /// Build engine state. Returns Result so callers can report boot errors.
    pub fn new(cfg: FundguardConfig, deps: EngineDeps) -> Result<Self> {
        cfg.validate()?;

        // 1) Core components
        let metrics = Arc::new(EngineMetrics::new());
        let policies = Arc::new(PolicyManager::with_builtin_policies(
            cfg.engine.policy_manager,
            Arc::clone(&deps.audit),
            Arc::clone(&metrics),
        ));
        let adapters = Arc::new(AdapterRegistry::new());
        let fees: Arc<dyn FeeSettler> = if cfg.fees.management_bps == 0 {
            Arc::new(NoFees)
        } else {
            Arc::new(ManagementFee::new(cfg.fees.management_bps)?)
        };

        let lifecycle = FundLifecycleManager::new(
            cfg.engine.dispatcher_owner,
            cfg.engine.release.to_release(),
            cfg.engine.migration_timelock_secs,
            Collaborators {
                policies: Arc::clone(&policies),
                adapters: Arc::clone(&adapters),
                fees,
                clock: deps.clock,
                audit: deps.audit,
                metrics: Arc::clone(&metrics),
            },
        );

        // 2) Genesis funds, after a sanity check against registered rules
        let registered = policies.registered_policies();
        for f in &cfg.funds {
            if let Some(unknown) = f
                .policies
                .iter()
                .find(|p| !registered.iter().any(|r| *r == p.id))
            {
                tracing::error!(fund = %f.name, policy = %unknown.id, "genesis fund refers to unregistered policy");
                return Err(FundError::UnknownPolicy(format!(
                    "genesis fund {} references unregistered policy {}",
                    f.name, unknown.id
                )));
            }

            let fund = lifecycle.create_new_fund(f.to_params()?).map_err(|e| {
                tracing::error!(fund = %f.name, error = %e, "genesis fund failed");
                e
            })?;
            tracing::info!(%fund, name = %f.name, "genesis fund ready");
        }

        Ok(Self {
            inner: Arc::new(EngineInner {
                cfg,
                lifecycle,
                policies,
                adapters,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &FundguardConfig {
        &self.inner.cfg
    }

    pub fn lifecycle(&self) -> &FundLifecycleManager {
        &self.inner.lifecycle
    }

    pub fn policies(&self) -> Arc<PolicyManager> {
        Arc::clone(&self.inner.policies)
    }

    pub fn adapters(&self) -> Arc<AdapterRegistry> {
        Arc::clone(&self.inner.adapters)
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
