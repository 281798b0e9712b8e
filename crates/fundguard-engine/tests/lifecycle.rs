#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::{Arc, Weak};
use std::thread;

use serde_json::json;

use fundguard_core::{Address, AssetFlows, AssetRegistry, AuditEvent, FundError};
use fundguard_engine::fees::{ManagementFee, SECONDS_PER_YEAR};
use fundguard_engine::integration::IntegrationAdapter;
use fundguard_engine::lifecycle::FundStatus;
use fundguard_engine::policy::{PolicyConfig, ADAPTER_BLACKLIST, MIN_MAX_INVESTMENT};

use harness::{asset, asset_whitelist, owner, params, settings, stranger, Harness, SwapAdapter, START};

#[test]
fn create_then_activate() {
    let h = Harness::new();
    let fund = h.lifecycle.create_fund(params(vec![])).unwrap();
    assert_eq!(h.lifecycle.status(fund).unwrap(), FundStatus::Created);

    // Not operational before activation.
    let err = h.lifecycle.buy_shares(owner(), fund, 1).unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_STATE");

    let err = h.lifecycle.activate_fund(stranger(), fund).unwrap_err();
    assert_eq!(err.code().as_str(), "AUTHORIZATION");

    h.lifecycle.activate_fund(owner(), fund).unwrap();
    assert_eq!(h.lifecycle.status(fund).unwrap(), FundStatus::Active);
    assert_eq!(
        h.lifecycle.activate_fund(owner(), fund).unwrap_err().code().as_str(),
        "INVALID_STATE"
    );

    let names: Vec<_> = h.audit.events_for(fund).iter().map(|e| e.name()).collect();
    assert_eq!(names, ["fund_created", "fund_activated"]);
}

#[test]
fn creation_rejects_missing_owner_or_denomination() {
    let h = Harness::new();
    let mut p = params(vec![]);
    p.owner = Address::ZERO;
    assert_eq!(h.lifecycle.create_fund(p).unwrap_err().code().as_str(), "CONFIGURATION");

    let mut p = params(vec![]);
    p.denomination_asset = Address::ZERO;
    assert_eq!(h.lifecycle.create_fund(p).unwrap_err().code().as_str(), "CONFIGURATION");
    assert!(h.lifecycle.funds().is_empty());
}

#[test]
fn funds_get_distinct_addresses() {
    let h = Harness::new();
    let a = h.active_fund(vec![]);
    let b = h.active_fund(vec![]);
    assert_ne!(a, b);
    assert_eq!(h.lifecycle.funds().len(), 2);
    assert_eq!(h.lifecycle.denomination_asset(a).unwrap(), asset(1));
    assert!(h.lifecycle.tracked_assets(Address::derived(0xf0, 77)).is_err());
}

#[test]
fn integration_call_tracks_whitelisted_incoming_asset() {
    let h = Harness::new();
    h.adapters.register(Arc::new(SwapAdapter));
    let fund = h.active_fund(vec![asset_whitelist(&[asset(1), asset(2)])]);

    let descriptor = h
        .lifecycle
        .call_on_integration(owner(), fund, SwapAdapter::address(), "takeOrder", &[2])
        .unwrap();
    assert_eq!(descriptor.adapter, Some(SwapAdapter::address()));
    assert_eq!(h.lifecycle.tracked_assets(fund).unwrap(), vec![asset(1), asset(2)]);

    let err = h
        .lifecycle
        .call_on_integration(owner(), fund, SwapAdapter::address(), "takeOrder", &[3])
        .unwrap_err();
    assert_eq!(err.code().as_str(), "RULE_VIOLATION");
    assert!(!h.lifecycle.fund(fund).unwrap().is_tracked(asset(3)));
}

#[test]
fn integration_call_errors() {
    let h = Harness::new();
    h.adapters.register(Arc::new(SwapAdapter));
    let fund = h.active_fund(vec![]);

    let unknown = Address::derived(0xad, 9);
    let err = h
        .lifecycle
        .call_on_integration(owner(), fund, unknown, "takeOrder", &[2])
        .unwrap_err();
    assert_eq!(err.code().as_str(), "ADAPTER");

    let err = h
        .lifecycle
        .call_on_integration(owner(), fund, SwapAdapter::address(), "lend", &[2])
        .unwrap_err();
    assert_eq!(err.code().as_str(), "ADAPTER");

    let err = h
        .lifecycle
        .call_on_integration(stranger(), fund, SwapAdapter::address(), "takeOrder", &[2])
        .unwrap_err();
    assert_eq!(err.code().as_str(), "AUTHORIZATION");

    assert_eq!(h.adapters.registered(), vec![SwapAdapter::address()]);
    assert!(h.adapters.deregister(SwapAdapter::address()));
    let err = h
        .lifecycle
        .call_on_integration(owner(), fund, SwapAdapter::address(), "takeOrder", &[2])
        .unwrap_err();
    assert_eq!(err.code().as_str(), "ADAPTER");
}

#[test]
fn adapter_blacklist_blocks_before_execution() {
    let h = Harness::new();
    h.adapters.register(Arc::new(SwapAdapter));
    let fund = h.active_fund(vec![PolicyConfig::new(
        ADAPTER_BLACKLIST,
        settings(json!({ "adapters": [SwapAdapter::address()] })),
    )]);

    let err = h
        .lifecycle
        .call_on_integration(owner(), fund, SwapAdapter::address(), "takeOrder", &[2])
        .unwrap_err();
    assert_eq!(
        err,
        fundguard_core::FundError::RuleViolation {
            rule: ADAPTER_BLACKLIST.into()
        }
    );
    assert_eq!(
        h.metrics
            .fund_actions
            .get(&[("action", "call_on_integration"), ("result", "rejected")]),
        1
    );
}

#[test]
fn share_purchases_respect_investment_limits() {
    let h = Harness::new();
    let fund = h.active_fund(vec![PolicyConfig::new(
        MIN_MAX_INVESTMENT,
        settings(json!({ "min": 10, "max": 100 })),
    )]);
    let investor = Address::derived(0x1e, 1);

    assert!(h.lifecycle.buy_shares(investor, fund, 9).is_err());
    assert!(h.lifecycle.buy_shares(investor, fund, 101).is_err());
    assert_eq!(h.lifecycle.buy_shares(investor, fund, 10).unwrap(), 10);
    assert_eq!(h.lifecycle.buy_shares(investor, fund, 100).unwrap(), 100);
    assert_eq!(
        h.lifecycle.buy_shares(investor, fund, 0).unwrap_err().code().as_str(),
        "CONFIGURATION"
    );

    let rec = h.lifecycle.fund(fund).unwrap();
    assert_eq!(rec.shares_supply, 110);
    assert_eq!(rec.investors.get(&investor), Some(&110));

    h.lifecycle
        .update_policy_settings_for_fund(
            owner(),
            fund,
            PolicyConfig::new(MIN_MAX_INVESTMENT, settings(json!({ "min": 1, "max": 0 }))),
        )
        .unwrap();
    h.lifecycle.buy_shares(investor, fund, 1_000_000).unwrap();
}

#[test]
fn tracked_assets_are_validated_and_denomination_is_pinned() {
    let h = Harness::new();
    let fund = h.active_fund(vec![asset_whitelist(&[asset(1), asset(2)])]);

    assert!(h.lifecycle.add_tracked_assets(owner(), fund, &[asset(3)]).is_err());
    h.lifecycle.add_tracked_assets(owner(), fund, &[asset(2)]).unwrap();

    let err = h
        .lifecycle
        .remove_tracked_assets(owner(), fund, &[asset(1)])
        .unwrap_err();
    assert_eq!(err.code().as_str(), "CONFIGURATION");

    h.lifecycle.remove_tracked_assets(owner(), fund, &[asset(2)]).unwrap();
    assert_eq!(h.lifecycle.tracked_assets(fund).unwrap(), vec![asset(1)]);
}

#[test]
fn enabling_a_rule_later_checks_current_holdings() {
    let h = Harness::new();
    let fund = h.active_fund(vec![]);
    h.lifecycle.add_tracked_assets(owner(), fund, &[asset(3)]).unwrap();

    let err = h
        .lifecycle
        .enable_policy_for_fund(owner(), fund, asset_whitelist(&[asset(1), asset(2)]))
        .unwrap_err();
    assert_eq!(err.code().as_str(), "ACTIVATION");
    assert!(h.policies.policies_for_fund(fund).is_empty());

    h.lifecycle.remove_tracked_assets(owner(), fund, &[asset(3)]).unwrap();
    h.lifecycle
        .enable_policy_for_fund(owner(), fund, asset_whitelist(&[asset(1), asset(2)]))
        .unwrap();
    assert!(h
        .audit
        .events_for(fund)
        .contains(&AuditEvent::PolicyEnabled {
            fund,
            policy: "asset-whitelist".into()
        }));
}

#[test]
fn management_fee_accrues_with_time() {
    let h = Harness::with_fees(Arc::new(ManagementFee::new(200).unwrap()));
    let fund = h.active_fund(vec![]);
    h.lifecycle.buy_shares(owner(), fund, 1_000_000).unwrap();

    h.clock.set(START + SECONDS_PER_YEAR);
    assert_eq!(h.lifecycle.settle_fees(owner(), fund).unwrap(), 20_000);

    // Nothing further is due at the same instant.
    assert_eq!(h.lifecycle.settle_fees(owner(), fund).unwrap(), 0);

    let rec = h.lifecycle.fund(fund).unwrap();
    assert_eq!(rec.fee_shares, 20_000);
    assert_eq!(rec.shares_supply, 1_020_000);
    assert_eq!(rec.fees_last_settled, START + SECONDS_PER_YEAR);
}

/// Adapter that looks up the fund's holdings while describing the trade.
struct HoldingsAwareAdapter {
    harness: Weak<Harness>,
    fund: Address,
}

impl HoldingsAwareAdapter {
    fn address() -> Address {
        Address::derived(0xad, 2)
    }
}

impl IntegrationAdapter for HoldingsAwareAdapter {
    fn identifier(&self) -> Address {
        Self::address()
    }

    fn parse_asset_flows(&self, _selector: &str, _params: &[u8]) -> fundguard_core::Result<AssetFlows> {
        let h = self
            .harness
            .upgrade()
            .ok_or_else(|| FundError::Adapter("engine gone".into()))?;
        let held = h.lifecycle.tracked_assets(self.fund)?;
        Ok(AssetFlows {
            spend_assets: vec![held[0]],
            spend_amounts: vec![1],
            incoming_assets: vec![asset(2)],
            min_incoming_amounts: vec![1],
        })
    }
}

#[test]
fn adapter_may_read_fund_state_during_call() {
    let h = Arc::new(Harness::new());
    let fund = h.active_fund(vec![]);
    h.adapters.register(Arc::new(HoldingsAwareAdapter {
        harness: Arc::downgrade(&h),
        fund,
    }));

    let descriptor = h
        .lifecycle
        .call_on_integration(owner(), fund, HoldingsAwareAdapter::address(), "takeOrder", &[])
        .unwrap();
    assert_eq!(descriptor.outgoing_assets().collect::<Vec<_>>(), vec![asset(1)]);
    assert_eq!(h.lifecycle.tracked_assets(fund).unwrap(), vec![asset(1), asset(2)]);
}

#[test]
fn concurrent_purchases_on_one_fund_are_serialized() {
    let h = Arc::new(Harness::new());
    let fund = h.active_fund(vec![]);

    let workers: Vec<_> = (0..8u64)
        .map(|i| {
            let h = Arc::clone(&h);
            thread::spawn(move || {
                let buyer = Address::derived(0x1e, i);
                for _ in 0..500 {
                    h.lifecycle.buy_shares(buyer, fund, 1).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    let rec = h.lifecycle.fund(fund).unwrap();
    assert_eq!(rec.shares_supply, 4_000);
    assert_eq!(rec.investors.len(), 8);
    assert!(rec.investors.values().all(|&shares| shares == 500));
}

#[test]
fn concurrent_purchases_across_funds_stay_separate() {
    let h = Arc::new(Harness::new());
    let funds = [h.active_fund(vec![]), h.active_fund(vec![])];

    let workers: Vec<_> = (0..8usize)
        .map(|i| {
            let h = Arc::clone(&h);
            let fund = funds[i % 2];
            thread::spawn(move || {
                for _ in 0..250 {
                    h.lifecycle.buy_shares(owner(), fund, 2).unwrap();
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }

    for fund in funds {
        let rec = h.lifecycle.fund(fund).unwrap();
        assert_eq!(rec.shares_supply, 2_000);
        assert_eq!(rec.investors.get(&owner()), Some(&2_000));
    }
    assert_eq!(
        h.metrics
            .fund_actions
            .get(&[("action", "buy_shares"), ("result", "ok")]),
        2_000
    );
}
