//! Fee settlement.
//!
//! Settlers are pure: they compute the fee shares due from a fund snapshot and
//! the caller applies the result to the record. That keeps a settlement that
//! is part of a larger transition (migration) discardable.

use fundguard_core::error::{FundError, Result};
use fundguard_core::Address;

use crate::lifecycle::FundRecord;

pub const SECONDS_PER_YEAR: u64 = 31_557_600;
pub const MAX_BPS: u32 = 10_000;

pub trait FeeSettler: Send + Sync {
    /// Fee shares due to the fee recipient at `now`, settled under `accessor`.
    fn settle_fees(&self, fund: &FundRecord, accessor: Address, now: u64) -> Result<u128>;
}

/// No fees are ever due.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFees;

impl FeeSettler for NoFees {
    fn settle_fees(&self, _fund: &FundRecord, _accessor: Address, _now: u64) -> Result<u128> {
        Ok(0)
    }
}

/// Flat annual management fee on the share supply, accrued linearly since
/// the last settlement.
#[derive(Debug, Clone, Copy)]
pub struct ManagementFee {
    bps: u32,
}

impl ManagementFee {
    pub fn new(bps: u32) -> Result<Self> {
        if bps > MAX_BPS {
            return Err(FundError::Configuration(format!(
                "management fee {bps} bps exceeds {MAX_BPS}"
            )));
        }
        Ok(Self { bps })
    }
}

impl FeeSettler for ManagementFee {
    fn settle_fees(&self, fund: &FundRecord, accessor: Address, now: u64) -> Result<u128> {
        let elapsed = now.saturating_sub(fund.fees_last_settled);
        if elapsed == 0 || self.bps == 0 || fund.shares_supply == 0 {
            return Ok(0);
        }

        let due = fund
            .shares_supply
            .checked_mul(u128::from(self.bps))
            .and_then(|v| v.checked_mul(u128::from(elapsed)))
            .map(|v| v / (u128::from(MAX_BPS) * u128::from(SECONDS_PER_YEAR)))
            .ok_or_else(|| FundError::Fee(format!("fee overflow for {}", fund.id)))?;

        tracing::debug!(fund = %fund.id, %accessor, elapsed, due, "management fee settled");
        Ok(due)
    }
}
