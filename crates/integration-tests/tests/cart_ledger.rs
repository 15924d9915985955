//! Stock reservation through the cart, against the in-memory store.

#![allow(clippy::unwrap_used)]

use bazaar_core::ProductId;
use bazaar_integration_tests::{buyer, list_product, qty, stock_of};
use bazaar_server::db::MemoryStore;
use bazaar_server::services::{CartService, MarketError};

/// `stock + reserved in open carts` for one product.
async fn accounted(store: &MemoryStore, product: ProductId, buyers: &[&str]) -> i32 {
    let carts = CartService::new(store);
    let mut total = stock_of(store, product).await;
    for id in buyers {
        total += carts
            .list_items(&buyer(id))
            .await
            .unwrap()
            .quantity_of(product);
    }
    total
}

#[tokio::test]
async fn test_reservation_scenario() {
    let store = MemoryStore::new();
    let p1 = list_product(&store, "s1", 500, 10).await;
    let carts = CartService::new(&store);
    let b1 = buyer("b1");

    carts.add_item(&b1, p1, qty(3)).await.unwrap();
    assert_eq!(stock_of(&store, p1).await, 7);
    assert_eq!(carts.list_items(&b1).await.unwrap().quantity_of(p1), 3);

    carts.update_item(&b1, p1, 5).await.unwrap();
    assert_eq!(stock_of(&store, p1).await, 5);
    assert_eq!(carts.list_items(&b1).await.unwrap().quantity_of(p1), 5);

    let change = carts.remove_item(&b1, p1).await.unwrap();
    assert!(change.cart_deleted);
    assert_eq!(stock_of(&store, p1).await, 10);

    let cart = carts.list_items(&b1).await.unwrap();
    assert!(cart.is_empty());
    assert!(cart.order_id.is_none());
}

#[tokio::test]
async fn test_stock_is_conserved_across_buyers() {
    let store = MemoryStore::new();
    let p1 = list_product(&store, "s1", 250, 12).await;
    let p2 = list_product(&store, "s2", 900, 4).await;
    let carts = CartService::new(&store);
    let buyers = ["b1", "b2", "b3"];

    carts.add_item(&buyer("b1"), p1, qty(4)).await.unwrap();
    carts.add_item(&buyer("b2"), p1, qty(5)).await.unwrap();
    carts.add_item(&buyer("b2"), p2, qty(4)).await.unwrap();
    assert_eq!(accounted(&store, p1, &buyers).await, 12);
    assert_eq!(accounted(&store, p2, &buyers).await, 4);

    // Rejected: only 3 of p1 left.
    let err = carts.add_item(&buyer("b3"), p1, qty(4)).await.unwrap_err();
    assert!(matches!(err, MarketError::InsufficientStock { available: 3, .. }));

    carts.update_item(&buyer("b1"), p1, 1).await.unwrap();
    carts.add_item(&buyer("b3"), p1, qty(6)).await.unwrap();
    carts.remove_item(&buyer("b2"), p2).await.unwrap();
    carts.update_item(&buyer("b2"), p1, 0).await.unwrap();

    assert_eq!(accounted(&store, p1, &buyers).await, 12);
    assert_eq!(accounted(&store, p2, &buyers).await, 4);
    assert_eq!(stock_of(&store, p1).await, 5);
    assert_eq!(stock_of(&store, p2).await, 4);
}

#[tokio::test]
async fn test_rejected_update_changes_nothing() {
    let store = MemoryStore::new();
    let p1 = list_product(&store, "s1", 100, 5).await;
    let carts = CartService::new(&store);
    let b1 = buyer("b1");

    carts.add_item(&b1, p1, qty(2)).await.unwrap();
    let err = carts.update_item(&b1, p1, 8).await.unwrap_err();
    assert!(matches!(
        err,
        MarketError::InsufficientStock {
            requested: 6,
            available: 3,
            ..
        }
    ));

    assert_eq!(stock_of(&store, p1).await, 3);
    assert_eq!(carts.list_items(&b1).await.unwrap().quantity_of(p1), 2);
}

#[tokio::test]
async fn test_zero_update_matches_removal() {
    let store = MemoryStore::new();
    let p1 = list_product(&store, "s1", 100, 5).await;
    let p2 = list_product(&store, "s1", 100, 5).await;
    let carts = CartService::new(&store);

    carts.add_item(&buyer("zeroed"), p1, qty(2)).await.unwrap();
    carts.add_item(&buyer("removed"), p2, qty(2)).await.unwrap();

    let zeroed = carts.update_item(&buyer("zeroed"), p1, 0).await.unwrap();
    let removed = carts.remove_item(&buyer("removed"), p2).await.unwrap();

    assert_eq!(zeroed.item, removed.item);
    assert_eq!(zeroed.stock, removed.stock);
    assert_eq!(zeroed.cart_deleted, removed.cart_deleted);
    assert!(carts.list_items(&buyer("zeroed")).await.unwrap().is_empty());
    assert!(carts.list_items(&buyer("removed")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_removing_one_of_two_lines_keeps_cart() {
    let store = MemoryStore::new();
    let p1 = list_product(&store, "s1", 100, 5).await;
    let p2 = list_product(&store, "s2", 100, 5).await;
    let carts = CartService::new(&store);
    let b1 = buyer("b1");

    carts.add_item(&b1, p1, qty(1)).await.unwrap();
    carts.add_item(&b1, p2, qty(1)).await.unwrap();
    let change = carts.remove_item(&b1, p1).await.unwrap();

    assert!(!change.cart_deleted);
    let cart = carts.list_items(&b1).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.quantity_of(p2), 1);
}

#[tokio::test]
async fn test_concurrent_buyers_cannot_oversell() {
    let store = MemoryStore::new();
    let p1 = list_product(&store, "s1", 100, 1).await;

    let tasks: Vec<_> = ["b1", "b2"]
        .into_iter()
        .map(|id| {
            let store = store.clone();
            tokio::spawn(async move {
                CartService::new(&store)
                    .add_item(&buyer(id), p1, qty(1))
                    .await
            })
        })
        .collect();

    let mut won = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => won += 1,
            Err(MarketError::InsufficientStock { available: 0, .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!((won, rejected), (1, 1));
    assert_eq!(stock_of(&store, p1).await, 0);
    assert_eq!(accounted(&store, p1, &["b1", "b2"]).await, 1);
}

#[tokio::test]
async fn test_many_concurrent_reservations_balance() {
    let store = MemoryStore::new();
    let p1 = list_product(&store, "s1", 100, 25).await;
    let ids: Vec<String> = (0..40).map(|n| format!("buyer-{n}")).collect();

    let tasks: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let store = store.clone();
            tokio::spawn(async move {
                CartService::new(&store)
                    .add_item(&buyer(&id), p1, qty(1))
                    .await
            })
        })
        .collect();

    let mut won = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            won += 1;
        }
    }

    let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    assert_eq!(won, 25);
    assert_eq!(stock_of(&store, p1).await, 0);
    assert_eq!(accounted(&store, p1, &refs).await, 25);
}
