//! Per-fund address lists shared by the list-based rules.
//!
//! Lists keep insertion order and never hold duplicates. Additions and
//! removals are reported to the audit sink with only the items that actually
//! changed.

use dashmap::DashMap;

use fundguard_core::{Address, AuditEvent, AuditLog};

#[derive(Default)]
pub struct AddressListStore {
    lists: DashMap<Address, Vec<Address>>,
}

impl AddressListStore {
    pub fn new() -> Self {
        Self {
            lists: DashMap::new(),
        }
    }

    /// Add items to the fund's list, creating it if needed.
    pub fn add_items(&self, fund: Address, items: &[Address], audit: &dyn AuditLog) {
        let mut list = self.lists.entry(fund).or_default();
        let mut added = Vec::new();
        for item in items {
            if !list.contains(item) {
                list.push(*item);
                added.push(*item);
            }
        }
        drop(list);

        if !added.is_empty() {
            audit.record(AuditEvent::AddressesAdded { fund, items: added });
        }
    }

    pub fn remove_items(&self, fund: Address, items: &[Address], audit: &dyn AuditLog) {
        let Some(mut list) = self.lists.get_mut(&fund) else { return; };
        let mut removed = Vec::new();
        list.retain(|a| {
            if items.contains(a) {
                removed.push(*a);
                false
            } else {
                true
            }
        });
        drop(list);

        if !removed.is_empty() {
            audit.record(AuditEvent::AddressesRemoved { fund, items: removed });
        }
    }

    /// Forget the fund entirely (no audit record: used for rollback).
    pub fn clear(&self, fund: Address) {
        self.lists.remove(&fund);
    }

    pub fn is_configured(&self, fund: Address) -> bool {
        self.lists.contains_key(&fund)
    }

    pub fn contains(&self, fund: Address, item: Address) -> bool {
        self.lists
            .get(&fund)
            .map(|l| l.contains(&item))
            .unwrap_or(false)
    }

    pub fn list(&self, fund: Address) -> Vec<Address> {
        self.lists.get(&fund).map(|l| l.clone()).unwrap_or_default()
    }

    /// First item of `candidates` that is (or is not, when `want == false`)
    /// in the fund's list.
    pub fn find(&self, fund: Address, candidates: &[Address], want: bool) -> Option<Address> {
        let list = self.lists.get(&fund);
        candidates.iter().copied().find(|c| {
            let present = list.as_ref().map(|l| l.contains(c)).unwrap_or(false);
            present == want
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundguard_core::MemoryAuditLog;

    #[test]
    fn add_dedupes_and_reports_only_new_items() {
        let store = AddressListStore::new();
        let log = MemoryAuditLog::new();
        let fund = Address::derived(0xf0, 1);
        let a = Address::derived(0x01, 1);
        let b = Address::derived(0x01, 2);

        store.add_items(fund, &[a, a, b], &log);
        store.add_items(fund, &[b], &log);

        assert_eq!(store.list(fund), vec![a, b]);
        assert_eq!(
            log.events(),
            vec![AuditEvent::AddressesAdded { fund, items: vec![a, b] }]
        );
    }

    #[test]
    fn find_reports_first_missing_or_present() {
        let store = AddressListStore::new();
        let log = MemoryAuditLog::new();
        let fund = Address::derived(0xf0, 1);
        let a = Address::derived(0x01, 1);
        let c = Address::derived(0x01, 3);

        store.add_items(fund, &[a], &log);
        assert_eq!(store.find(fund, &[a, c], false), Some(c));
        assert_eq!(store.find(fund, &[c, a], true), Some(a));
        store.remove_items(fund, &[a], &log);
        assert!(!store.contains(fund, a));
        assert!(store.is_configured(fund));
    }
}
