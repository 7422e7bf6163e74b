//! Reservation Manager behavior: hold exclusivity, lazy expiry, pricing,
//! and the compensating rollback when the gateway fails.

mod common;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use keyvend::errors::AppError;
use keyvend::store::Store;

fn rub(value: i64, scale: u32) -> Decimal {
    Decimal::new(value, scale)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_win_at_most_one_key() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500, 0)).await;
    w.seed_key(location).await;

    let mut handles = Vec::new();
    for requester in 0..8i64 {
        let manager = w.manager.clone();
        handles.push(tokio::spawn(async move {
            manager.reserve(location, requester, 1).await
        }));
    }

    let mut won = 0;
    let mut lost = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::NoAvailableCredential) => lost += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(lost, 7);
}

#[tokio::test]
async fn hold_blocks_other_requesters_until_it_expires() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500, 0)).await;
    w.seed_key(location).await;

    // Requester A takes the only key: 3 months at 5% off a 500 base rate.
    let ticket = w.manager.reserve(location, 1, 3).await.unwrap();
    assert_eq!(ticket.amount, rub(142500, 2));
    assert!(!ticket.payment_url.is_empty());

    // B is locked out while A's hold is live, even though A has not paid.
    let err = w.manager.reserve(location, 2, 1).await.unwrap_err();
    assert!(matches!(err, AppError::NoAvailableCredential));
}

#[tokio::test]
async fn expired_hold_is_reclaimed_by_the_next_reservation() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500, 0)).await;
    w.seed_key(location).await;

    // A hold whose deadline has already passed.
    let held = w
        .store
        .hold_free_credential(location, 1, Utc::now() - Duration::seconds(1))
        .await
        .unwrap();
    assert!(held.is_some());

    // The next reservation treats the key as free again.
    let ticket = w.manager.reserve(location, 2, 1).await;
    assert!(ticket.is_ok());
}

#[tokio::test]
async fn gateway_failure_rolls_back_the_hold() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500, 0)).await;
    w.seed_key(location).await;

    w.gateway.fail_next_creates(true);
    let err = w.manager.reserve(location, 1, 1).await.unwrap_err();
    assert!(matches!(err, AppError::GatewayUnavailable(_)));

    // The hold must not dangle until its deadline: the key is free now.
    w.gateway.fail_next_creates(false);
    let ticket = w.manager.reserve(location, 2, 1).await;
    assert!(ticket.is_ok());
}

#[tokio::test]
async fn unknown_location_and_unsupported_term_are_rejected() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500, 0)).await;
    w.seed_key(location).await;

    let err = w.manager.reserve(Uuid::new_v4(), 1, 1).await.unwrap_err();
    assert!(matches!(err, AppError::UnknownLocation));

    let err = w.manager.reserve(location, 1, 2).await.unwrap_err();
    assert!(matches!(err, AppError::UnsupportedTerm(2)));

    // Neither failure may consume the key.
    let ticket = w.manager.reserve(location, 1, 1).await;
    assert!(ticket.is_ok());
}

#[tokio::test]
async fn reservation_records_a_pending_charge() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500, 0)).await;
    w.seed_key(location).await;

    let ticket = w.manager.reserve(location, 7, 6).await.unwrap();

    let charge = w
        .store
        .get_charge(&ticket.gateway_ref)
        .await
        .unwrap()
        .expect("charge row recorded");
    assert_eq!(charge.requester_id, 7);
    assert_eq!(charge.amount, rub(270000, 2));
    assert!(!charge.is_terminal());
}
