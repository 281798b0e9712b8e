#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use fundguard_core::{Address, AuditEvent, AuditLog, MemoryAuditLog};

#[test]
fn memory_log_keeps_order_and_filters_by_fund() {
    let log = MemoryAuditLog::new();
    let f1 = Address::derived(0xf0, 1);
    let f2 = Address::derived(0xf0, 2);

    log.record(AuditEvent::FundActivated { fund: f1 });
    log.record(AuditEvent::MigrationTimelockSet { prev_secs: 1, next_secs: 2 });
    log.record(AuditEvent::FundActivated { fund: f2 });
    log.record(AuditEvent::AddressesAdded { fund: f1, items: vec![f2] });

    let all = log.events();
    assert_eq!(all.len(), 4);
    assert_eq!(all[1].name(), "migration_timelock_set");

    let only_f1 = log.events_for(f1);
    assert_eq!(only_f1.len(), 2);
    assert_eq!(only_f1[1].name(), "addresses_added");
}

#[test]
fn events_serialize_with_tag_and_hex_addresses() {
    let fund = Address::derived(0xf0, 9);
    let ev = AuditEvent::MigrationSignaled { fund, target: Address::ZERO, timestamp: 42 };
    let v: serde_json::Value = serde_json::to_value(&ev).unwrap();

    assert_eq!(v["event"], "migration_signaled");
    assert_eq!(v["fund"], fund.to_string());
    assert_eq!(v["timestamp"], 42);
}
