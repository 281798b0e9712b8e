//! Adapter asset-flow vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use fundguard_core::{Address, AssetFlowDescriptor};

use vector_loader::load;

fn actor() -> Address {
    Address::derived(0xaa, 1)
}

fn adapter() -> Address {
    Address::derived(0xad, 1)
}

#[test]
fn adapter_flow_vectors() {
    let files = [
        "swap_ok.json",
        "multi_incoming_ok.json",
        "no_flows_ok.json",
        "spend_length_mismatch.json",
        "incoming_length_mismatch.json",
        "duplicate_incoming.json",
    ];

    for f in files {
        let v = load(f);
        let res = AssetFlowDescriptor::from_adapter_flows(actor(), adapter(), "takeOrder", v.flows);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let d = res.expect("expected descriptor");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(d.actor, actor(), "vector={}", v.description);
        assert_eq!(d.adapter, Some(adapter()), "vector={}", v.description);
        assert_eq!(d.selector, "takeOrder", "vector={}", v.description);
        assert_eq!(d.incoming_assets().collect::<Vec<_>>(), ex.incoming, "vector={}", v.description);
        assert_eq!(d.outgoing_assets().collect::<Vec<_>>(), ex.outgoing, "vector={}", v.description);

        let first = ex.incoming.first().copied().unwrap_or(Address::ZERO);
        assert_eq!(d.incoming_amount(first), ex.incoming_amount, "vector={}", v.description);
    }
}

#[test]
fn builder_descriptor_keeps_both_sides() {
    let a = Address::derived(0x01, 1);
    let b = Address::derived(0x01, 2);
    let d = AssetFlowDescriptor::new(actor(), "addTrackedAssets")
        .with_incoming(a, 0)
        .with_outgoing(b, 5);

    assert!(d.adapter.is_none());
    assert_eq!(d.incoming_assets().collect::<Vec<_>>(), vec![a]);
    assert_eq!(d.outgoing_assets().collect::<Vec<_>>(), vec![b]);
    assert_eq!(d.incoming_amount(b), 0);
}
