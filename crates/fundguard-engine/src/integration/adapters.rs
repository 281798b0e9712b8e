use std::sync::Arc;

use dashmap::DashMap;

use fundguard_core::error::{FundError, Result};
use fundguard_core::{Address, AssetFlows};

/// External venue adapter.
pub trait IntegrationAdapter: Send + Sync {
    fn identifier(&self) -> Address;

    /// Decode `params` for the operation `selector` into asset flows, or fail
    /// with a typed error.
    fn parse_asset_flows(&self, selector: &str, params: &[u8]) -> Result<AssetFlows>;
}

/// Registry of adapters, keyed by adapter address.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: DashMap<Address, Arc<dyn IntegrationAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: DashMap::new(),
        }
    }

    pub fn register(&self, adapter: Arc<dyn IntegrationAdapter>) {
        tracing::info!(adapter = %adapter.identifier(), "adapter registered");
        self.adapters.insert(adapter.identifier(), adapter);
    }

    pub fn deregister(&self, adapter: Address) -> bool {
        self.adapters.remove(&adapter).is_some()
    }

    pub fn registered(&self) -> Vec<Address> {
        self.adapters.iter().map(|e| *e.key()).collect()
    }

    pub fn get(&self, adapter: Address) -> Result<Arc<dyn IntegrationAdapter>> {
        self.adapters
            .get(&adapter)
            .map(|e| e.value().clone())
            .ok_or_else(|| FundError::Adapter(format!("unknown adapter: {adapter}")))
    }
}
