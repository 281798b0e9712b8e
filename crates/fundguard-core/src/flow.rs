//! Asset-flow descriptions and policy hook points.
//!
//! An `AssetFlowDescriptor` is built per call from an adapter's four parallel
//! sequences (or directly by the engine for share purchases and manual asset
//! tracking) and is never persisted.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::{FundError, Result};

/// Named point in the action lifecycle at which rules are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyHook {
    /// Before shares are issued to an investor.
    PreBuyShares,
    /// Before an adapter call is executed.
    PreCallOnIntegration,
    /// After an adapter call (or manual asset tracking) with its asset flows.
    PostCallOnIntegration,
}

impl PolicyHook {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyHook::PreBuyShares => "pre_buy_shares",
            PolicyHook::PreCallOnIntegration => "pre_call_on_integration",
            PolicyHook::PostCallOnIntegration => "post_call_on_integration",
        }
    }
}

impl fmt::Display for PolicyHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (asset, amount) entry of a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAmount {
    pub asset: Address,
    pub amount: u128,
}

/// Raw adapter output: four parallel sequences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetFlows {
    pub spend_assets: Vec<Address>,
    pub spend_amounts: Vec<u128>,
    pub incoming_assets: Vec<Address>,
    pub min_incoming_amounts: Vec<u128>,
}

/// Proposed action as seen by rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetFlowDescriptor {
    /// Who initiated the action (fund owner for trades, buyer for share purchases).
    pub actor: Address,
    /// Adapter routing the action, if any.
    pub adapter: Option<Address>,
    /// Operation identifier within the adapter (or an engine action name).
    pub selector: String,
    pub incoming: Vec<AssetAmount>,
    pub outgoing: Vec<AssetAmount>,
}

impl AssetFlowDescriptor {
    /// Descriptor with no asset movement.
    pub fn new(actor: Address, selector: impl Into<String>) -> Self {
        Self {
            actor,
            adapter: None,
            selector: selector.into(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    pub fn with_adapter(mut self, adapter: Address) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn with_incoming(mut self, asset: Address, amount: u128) -> Self {
        self.incoming.push(AssetAmount { asset, amount });
        self
    }

    pub fn with_outgoing(mut self, asset: Address, amount: u128) -> Self {
        self.outgoing.push(AssetAmount { asset, amount });
        self
    }

    /// Build a descriptor from adapter output.
    ///
    /// Parallel sequences must have equal lengths and neither side may list
    /// the same asset twice.
    pub fn from_adapter_flows(
        actor: Address,
        adapter: Address,
        selector: impl Into<String>,
        flows: AssetFlows,
    ) -> Result<Self> {
        if flows.spend_assets.len() != flows.spend_amounts.len() {
            return Err(FundError::Adapter(format!(
                "spend assets/amounts length mismatch: {} vs {}",
                flows.spend_assets.len(),
                flows.spend_amounts.len()
            )));
        }
        if flows.incoming_assets.len() != flows.min_incoming_amounts.len() {
            return Err(FundError::Adapter(format!(
                "incoming assets/amounts length mismatch: {} vs {}",
                flows.incoming_assets.len(),
                flows.min_incoming_amounts.len()
            )));
        }
        ensure_unique(&flows.spend_assets, "spend")?;
        ensure_unique(&flows.incoming_assets, "incoming")?;

        let outgoing = flows
            .spend_assets
            .into_iter()
            .zip(flows.spend_amounts)
            .map(|(asset, amount)| AssetAmount { asset, amount })
            .collect();
        let incoming = flows
            .incoming_assets
            .into_iter()
            .zip(flows.min_incoming_amounts)
            .map(|(asset, amount)| AssetAmount { asset, amount })
            .collect();

        Ok(Self {
            actor,
            adapter: Some(adapter),
            selector: selector.into(),
            incoming,
            outgoing,
        })
    }

    pub fn incoming_assets(&self) -> impl Iterator<Item = Address> + '_ {
        self.incoming.iter().map(|a| a.asset)
    }

    pub fn outgoing_assets(&self) -> impl Iterator<Item = Address> + '_ {
        self.outgoing.iter().map(|a| a.asset)
    }

    /// Amount entering the fund for `asset` (0 when absent).
    pub fn incoming_amount(&self, asset: Address) -> u128 {
        self.incoming
            .iter()
            .filter(|a| a.asset == asset)
            .fold(0u128, |acc, a| acc.saturating_add(a.amount))
    }
}

fn ensure_unique(assets: &[Address], side: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(assets.len());
    for a in assets {
        if !seen.insert(a) {
            return Err(FundError::Adapter(format!("duplicate {side} asset: {a}")));
        }
    }
    Ok(())
}
