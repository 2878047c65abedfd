#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{customer, product, stub, Customer, Line, MapResolver, Order, Product};
use docgraph_core::errors::DgErrorKind;
use docgraph_core::{preload, preload_all};

fn stub_order() -> Order {
    Order {
        id: "o1".to_string(),
        number: "A-100".to_string(),
        customer: stub("c1"),
        reviewer: None,
        gifts: vec![stub("p1"), stub("p2")],
        lines: vec![
            Line {
                product: stub("p3"),
                quantity: 2,
            },
            Line {
                product: stub("p1"),
                quantity: 1,
            },
        ],
    }
}

fn seeded() -> MapResolver {
    MapResolver::default()
        .with_customer(&customer("c1", "Ada"))
        .with_customer(&customer("c2", "Grace"))
        .with_product(&product("p1", "Mug", 5))
        .with_product(&product("p2", "Pen", 2))
        .with_product(&product("p3", "Desk", 300))
}

#[test]
fn test_preload_hydrates_embedded_and_referenced_targets() {
    // Given an order holding only identities
    let mut order = stub_order();
    let mut resolver = seeded();

    // When preloaded
    preload(&mut resolver, &mut order).unwrap();

    // Then relations carry their stored content
    assert_eq!(order.customer, customer("c1", "Ada"));
    assert_eq!(
        order.gifts,
        vec![product("p1", "Mug", 5), product("p2", "Pen", 2)]
    );
}

#[test]
fn test_preload_descends_into_nested_records() {
    let mut order = stub_order();
    let mut resolver = seeded();

    preload(&mut resolver, &mut order).unwrap();

    assert_eq!(order.lines[0].product, product("p3", "Desk", 300));
    assert_eq!(order.lines[0].quantity, 2);
    assert_eq!(order.lines[1].product, product("p1", "Mug", 5));
}

#[test]
fn test_preload_resolves_in_declaration_and_sequence_order() {
    let mut order = stub_order();
    order.reviewer = Some(stub("c2"));
    let mut resolver = seeded();

    preload(&mut resolver, &mut order).unwrap();

    let calls: Vec<(&str, &str)> = resolver
        .calls
        .iter()
        .map(|(c, id)| (c.as_str(), id.as_str()))
        .collect();
    assert_eq!(
        calls,
        vec![
            ("customers", "c1"),
            ("customers", "c2"),
            ("products", "p1"),
            ("products", "p2"),
            ("products", "p3"),
            ("products", "p1"),
        ]
    );
}

#[test]
fn test_preload_skips_empty_identity_and_absent_optional() {
    // Given a customer with no identity and no reviewer
    let mut order = stub_order();
    order.customer = Customer {
        name: "walk-in".to_string(),
        ..Customer::default()
    };
    let mut resolver = seeded();

    // When preloaded
    preload(&mut resolver, &mut order).unwrap();

    // Then neither is fetched and the customer keeps its content
    assert!(resolver.calls.iter().all(|(c, _)| c != "customers"));
    assert_eq!(order.customer.name, "walk-in");
    assert_eq!(order.reviewer, None);
}

#[test]
fn test_preload_dangling_reference_is_not_found() {
    // Given a gift pointing at a product that does not exist
    let mut order = stub_order();
    order.gifts = vec![stub("p1"), stub("gone"), stub("p2")];
    let mut resolver = seeded();

    // When preloaded
    let err = preload(&mut resolver, &mut order).unwrap_err();

    // Then the walk stops at the dangling target
    assert!(err.is_not_found());
    assert_eq!(err.collection(), Some("products"));
    assert_eq!(err.entity_id(), Some("gone"));
    assert_eq!(order.gifts[0], product("p1", "Mug", 5));
    assert_eq!(order.gifts[2], stub::<Product>("p2"));
    assert!(resolver.calls.iter().all(|(_, id)| id != "p3"));
}

#[test]
fn test_preload_aborts_on_first_resolver_error() {
    let mut order = stub_order();
    let mut resolver = seeded().failing_on("c1");

    let err = preload(&mut resolver, &mut order).unwrap_err();

    assert_eq!(err.kind(), DgErrorKind::Connection);
    assert_eq!(resolver.calls.len(), 1);
    assert_eq!(order.gifts[0], stub::<Product>("p1"));
}

#[test]
fn test_preload_all_walks_every_item() {
    let mut orders = vec![stub_order(), stub_order()];
    orders[1].customer = stub("c2");
    let mut resolver = seeded();

    preload_all(&mut resolver, &mut orders).unwrap();

    assert_eq!(orders[0].customer.name, "Ada");
    assert_eq!(orders[1].customer.name, "Grace");
}

#[test]
fn test_preload_all_empty_is_noop() {
    let mut orders: Vec<Order> = Vec::new();
    let mut resolver = MapResolver::default();

    preload_all(&mut resolver, &mut orders).unwrap();

    assert!(resolver.calls.is_empty());
}
