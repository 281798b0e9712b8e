#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use fundguard_core::{AuditLog, MemoryAuditLog};
use fundguard_engine::clock::ManualClock;
use fundguard_engine::config;
use fundguard_engine::engine::{Engine, EngineDeps};
use fundguard_engine::lifecycle::FundStatus;

const MINIMAL: &str = r#"
version: 1
engine:
  dispatcher_owner: "0x00000000000000000000000000000000000000d0"
  release:
    controller: "0x00000000000000000000000000000000000000c0"
    vault_lib: "0x00000000000000000000000000000000000000c1"
"#;

fn deps() -> (EngineDeps, Arc<MemoryAuditLog>) {
    let audit = Arc::new(MemoryAuditLog::new());
    let audit_dyn: Arc<dyn AuditLog> = audit.clone();
    (
        EngineDeps {
            clock: Arc::new(ManualClock::new(1_000)),
            audit: audit_dyn,
        },
        audit,
    )
}

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
engine:
  dispatcher_owner: "0x00000000000000000000000000000000000000d0"
  release:
    controller: "0x00000000000000000000000000000000000000c0"
    vault_lib: "0x00000000000000000000000000000000000000c1"
    valut_lib: "0x00000000000000000000000000000000000000c2" # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "CONFIGURATION");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str(MINIMAL).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.engine.migration_timelock_secs, 86_400);
    assert_eq!(cfg.fees.management_bps, 0);
    assert!(cfg.funds.is_empty());
    assert!(!cfg.engine.policy_manager.is_zero());
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str(&MINIMAL.replace("version: 1", "version: 2")).unwrap_err();
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn invalid_values_are_rejected() {
    let zero_timelock = MINIMAL.replace(
        "  release:",
        "  migration_timelock_secs: 0\n  release:",
    );
    assert_eq!(
        config::load_from_str(&zero_timelock).unwrap_err().code().as_str(),
        "CONFIGURATION"
    );

    let bad_address = MINIMAL.replace("00d0\"", "00d\"");
    assert!(config::load_from_str(&bad_address).is_err());

    let high_fee = format!("{MINIMAL}fees:\n  management_bps: 10001\n");
    assert_eq!(
        config::load_from_str(&high_fee).unwrap_err().code().as_str(),
        "CONFIGURATION"
    );
}

#[test]
fn genesis_funds_are_created_and_active() {
    let yaml = format!(
        r#"{MINIMAL}
funds:
  - owner: "0x00000000000000000000000000000000000000e1"
    name: "alpha"
    denomination_asset: "0x00000000000000000000000000000000000000a1"
    policies:
      - id: "asset-whitelist"
        settings:
          assets:
            - "0x00000000000000000000000000000000000000a1"
            - "0x00000000000000000000000000000000000000a2"
      - id: "min-max-investment"
        settings: {{ min: 1, max: 0 }}
"#
    );
    let cfg = config::load_from_str(&yaml).unwrap();
    let (deps, audit) = deps();
    let engine = Engine::new(cfg, deps).unwrap();

    let funds = engine.lifecycle().funds();
    assert_eq!(funds.len(), 1);
    assert_eq!(engine.lifecycle().status(funds[0]).unwrap(), FundStatus::Active);
    assert_eq!(
        engine.policies().policies_for_fund(funds[0]),
        vec!["asset-whitelist".to_string(), "min-max-investment".to_string()]
    );
    assert_eq!(engine.lifecycle().fund(funds[0]).unwrap().created_at, 1_000);
    assert!(audit.events().iter().any(|e| e.name() == "fund_activated"));
}

#[test]
fn genesis_fund_with_unknown_policy_fails_boot() {
    let yaml = format!(
        r#"{MINIMAL}
funds:
  - owner: "0x00000000000000000000000000000000000000e1"
    name: "alpha"
    denomination_asset: "0x00000000000000000000000000000000000000a1"
    policies:
      - id: "performance-fee"
"#
    );
    let cfg = config::load_from_str(&yaml).unwrap();
    let (deps, _) = deps();
    let err = Engine::new(cfg, deps).err().expect("must fail");
    assert_eq!(err.code().as_str(), "UNKNOWN_POLICY");
}

#[test]
fn example_config_boots() {
    let cfg = config::load_from_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../fundguard.example.yaml"
    ))
    .unwrap();
    let (deps, _) = deps();
    let engine = Engine::new(cfg, deps).unwrap();
    assert!(!engine.lifecycle().funds().is_empty());
    assert!(engine.metrics().render().contains("fundguard_fund_actions_total"));
}
