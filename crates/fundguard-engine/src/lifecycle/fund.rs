use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use fundguard_core::error::{FundError, Result};
use fundguard_core::{Address, AssetRegistry};

/// Per-fund lifecycle state.
///
/// ```text
/// Created -> Active -> MigrationSignaled -> Migrated
///              ^               |
///              +--- cancel ----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FundStatus {
    Created,
    Active,
    MigrationSignaled,
    Migrated,
}

impl FundStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FundStatus::Created => "created",
            FundStatus::Active => "active",
            FundStatus::MigrationSignaled => "migration_signaled",
            FundStatus::Migrated => "migrated",
        }
    }

    pub fn can_transition_to(self, next: FundStatus) -> bool {
        use FundStatus::*;
        matches!(
            (self, next),
            (Created, Active)
                | (Active, MigrationSignaled)
                | (MigrationSignaled, Active)
                | (MigrationSignaled, Migrated)
        )
    }

    /// Whether fund actions (trades, share purchases, fee settlement) run.
    /// A fund keeps operating while a migration is pending and after it has
    /// moved to its new controller.
    pub fn is_operational(self) -> bool {
        !matches!(self, FundStatus::Created)
    }
}

impl fmt::Display for FundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol release: the controller logic and vault implementation funds
/// run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Release {
    pub controller: Address,
    pub vault_lib: Address,
}

/// Pending move of a fund to a new release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRequest {
    pub fund: Address,
    /// Accessor at signal time; execution requires it to be unchanged.
    pub signaled_accessor: Address,
    pub target: Release,
    pub signal_timestamp: u64,
}

/// Parameters for a new fund.
#[derive(Debug, Clone)]
pub struct CreateFundParams {
    pub owner: Address,
    pub name: String,
    pub denomination_asset: Address,
    pub policies: Vec<crate::policy::PolicyConfig>,
}

/// Persisted per-fund state.
#[derive(Debug, Clone, Serialize)]
pub struct FundRecord {
    pub id: Address,
    pub owner: Address,
    pub name: String,
    pub denomination_asset: Address,
    pub accessor: Address,
    pub vault_lib: Address,
    pub tracked_assets: Vec<Address>,
    pub status: FundStatus,
    pub pending_migration: Option<MigrationRequest>,
    pub shares_supply: u128,
    pub fee_shares: u128,
    pub fees_last_settled: u64,
    pub investors: BTreeMap<Address, u128>,
    pub created_at: u64,
}

impl FundRecord {
    pub fn new(id: Address, params: &CreateFundParams, release: Release, now: u64) -> Self {
        Self {
            id,
            owner: params.owner,
            name: params.name.clone(),
            denomination_asset: params.denomination_asset,
            accessor: release.controller,
            vault_lib: release.vault_lib,
            tracked_assets: vec![params.denomination_asset],
            status: FundStatus::Created,
            pending_migration: None,
            shares_supply: 0,
            fee_shares: 0,
            fees_last_settled: now,
            investors: BTreeMap::new(),
            created_at: now,
        }
    }

    pub fn transition(&mut self, next: FundStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(FundError::InvalidState(format!(
                "fund {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        tracing::debug!(fund = %self.id, from = %self.status, to = %next, "fund status transition");
        self.status = next;
        Ok(())
    }

    pub fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(FundError::Authorization(format!(
                "only the owner of {} may do this (caller {caller})",
                self.id
            )));
        }
        Ok(())
    }

    pub fn ensure_operational(&self) -> Result<()> {
        if !self.status.is_operational() {
            return Err(FundError::InvalidState(format!(
                "fund {} is {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn is_tracked(&self, asset: Address) -> bool {
        self.tracked_assets.contains(&asset)
    }

    /// Start tracking assets not yet tracked. Returns the newly tracked ones.
    pub fn track_assets(&mut self, assets: impl IntoIterator<Item = Address>) -> Vec<Address> {
        let mut added = Vec::new();
        for a in assets {
            if !self.is_tracked(a) {
                self.tracked_assets.push(a);
                added.push(a);
            }
        }
        added
    }

    /// Stop tracking assets. The denomination asset can never be untracked.
    pub fn untrack_assets(&mut self, assets: &[Address]) -> Result<Vec<Address>> {
        if assets.contains(&self.denomination_asset) {
            return Err(FundError::Configuration(
                "denomination asset cannot be untracked".into(),
            ));
        }
        let mut removed = Vec::new();
        self.tracked_assets.retain(|a| {
            if assets.contains(a) {
                removed.push(*a);
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    /// Issue shares to an investor.
    pub fn issue_shares(&mut self, investor: Address, shares: u128) -> Result<()> {
        self.shares_supply = self
            .shares_supply
            .checked_add(shares)
            .ok_or_else(|| FundError::Internal(format!("share supply overflow for {}", self.id)))?;
        let balance = self.investors.entry(investor).or_insert(0);
        *balance = balance.saturating_add(shares);
        Ok(())
    }

    /// Record a fee settlement: fee shares are minted on top of the supply.
    pub fn apply_fee_settlement(&mut self, shares_due: u128, now: u64) -> Result<()> {
        self.shares_supply = self
            .shares_supply
            .checked_add(shares_due)
            .ok_or_else(|| FundError::Fee(format!("share supply overflow for {}", self.id)))?;
        self.fee_shares = self.fee_shares.saturating_add(shares_due);
        self.fees_last_settled = now;
        Ok(())
    }

    fn ensure_id(&self, fund: Address) -> Result<()> {
        if fund != self.id {
            return Err(FundError::UnknownFund(fund));
        }
        Ok(())
    }
}

/// A locked record is the asset view rules see during an operation.
impl AssetRegistry for FundRecord {
    fn tracked_assets(&self, fund: Address) -> Result<Vec<Address>> {
        self.ensure_id(fund)?;
        Ok(self.tracked_assets.clone())
    }

    fn denomination_asset(&self, fund: Address) -> Result<Address> {
        self.ensure_id(fund)?;
        Ok(self.denomination_asset)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn record() -> FundRecord {
        let params = CreateFundParams {
            owner: Address::derived(0x0e, 1),
            name: "alpha".into(),
            denomination_asset: Address::derived(0x01, 1),
            policies: vec![],
        };
        let release = Release {
            controller: Address::derived(0xc0, 1),
            vault_lib: Address::derived(0xc1, 1),
        };
        FundRecord::new(Address::derived(0xf0, 1), &params, release, 100)
    }

    #[test]
    fn only_documented_transitions_are_allowed() {
        let mut r = record();
        assert!(r.transition(FundStatus::MigrationSignaled).is_err());
        r.transition(FundStatus::Active).unwrap();
        r.transition(FundStatus::MigrationSignaled).unwrap();
        r.transition(FundStatus::Active).unwrap();
        r.transition(FundStatus::MigrationSignaled).unwrap();
        r.transition(FundStatus::Migrated).unwrap();
        assert!(r.transition(FundStatus::Active).is_err());
    }

    #[test]
    fn denomination_asset_stays_tracked() {
        let mut r = record();
        let other = Address::derived(0x01, 2);
        assert_eq!(r.track_assets([other, other]), vec![other]);

        let denom = r.denomination_asset;
        assert!(r.untrack_assets(&[denom]).is_err());
        assert_eq!(r.untrack_assets(&[other]).unwrap(), vec![other]);
        assert_eq!(r.tracked_assets, vec![denom]);
    }

    #[test]
    fn asset_view_rejects_other_funds() {
        let r = record();
        assert!(r.tracked_assets(Address::derived(0xf0, 2)).is_err());
        assert_eq!(r.denomination_asset(r.id).unwrap(), r.denomination_asset);
    }
}
