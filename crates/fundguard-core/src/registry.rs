//! Asset registry collaborator contract.
//!
//! Rules never read fund state directly; they are handed an `AssetRegistry`
//! view. The engine passes a view over the fund record it already holds locked,
//! so rule code never re-enters the fund lock.

use std::collections::HashMap;

use crate::address::Address;
use crate::error::{FundError, Result};

/// Read-only view of which assets a fund holds.
pub trait AssetRegistry {
    /// Tracked assets in tracking order.
    fn tracked_assets(&self, fund: Address) -> Result<Vec<Address>>;
    /// The fund's denomination asset.
    fn denomination_asset(&self, fund: Address) -> Result<Address>;
}

/// Fixed in-memory registry. Useful for driving rules in isolation.
#[derive(Debug, Default, Clone)]
pub struct StaticAssetRegistry {
    funds: HashMap<Address, (Address, Vec<Address>)>,
}

impl StaticAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a fund. The denomination asset is tracked first
    /// when the given list does not already contain it.
    pub fn insert(&mut self, fund: Address, denomination: Address, tracked: Vec<Address>) {
        let mut assets = Vec::with_capacity(tracked.len() + 1);
        if !tracked.contains(&denomination) {
            assets.push(denomination);
        }
        assets.extend(tracked);
        self.funds.insert(fund, (denomination, assets));
    }
}

impl AssetRegistry for StaticAssetRegistry {
    fn tracked_assets(&self, fund: Address) -> Result<Vec<Address>> {
        self.funds
            .get(&fund)
            .map(|(_, assets)| assets.clone())
            .ok_or(FundError::UnknownFund(fund))
    }

    fn denomination_asset(&self, fund: Address) -> Result<Address> {
        self.funds
            .get(&fund)
            .map(|(denom, _)| *denom)
            .ok_or(FundError::UnknownFund(fund))
    }
}
