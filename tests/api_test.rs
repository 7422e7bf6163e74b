//! Router-level tests: the gateway webhook contract and the purchase API.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::json;
use tower::util::ServiceExt;
use uuid::Uuid;

use keyvend::models::ChargeStatus;
use keyvend::store::Store;

fn rub(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn healthz_responds() {
    let w = common::World::default_windows();
    let app = keyvend::api::app(w.app_state());

    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn webhook_settles_a_paid_charge() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500)).await;
    w.seed_key(location).await;
    let ticket = w.manager.reserve(location, 1, 1).await.unwrap();

    let app = keyvend::api::app(w.app_state());
    let push = json!({ "object": { "id": ticket.gateway_ref, "status": "succeeded" } });
    let resp = app.oneshot(post_json("/webhooks/yookassa", push)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(w.store.list_assigned_credentials().await.unwrap().len(), 1);
    assert_eq!(w.notifier.count(), 1);
}

#[tokio::test]
async fn webhook_acknowledges_duplicate_pushes() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500)).await;
    w.seed_key(location).await;
    let ticket = w.manager.reserve(location, 1, 1).await.unwrap();

    let app = keyvend::api::app(w.app_state());
    let push = json!({ "object": { "id": ticket.gateway_ref, "status": "succeeded" } });

    let first = app
        .clone()
        .oneshot(post_json("/webhooks/yookassa", push.clone()))
        .await
        .unwrap();
    let second = app
        .oneshot(post_json("/webhooks/yookassa", push))
        .await
        .unwrap();

    // Both acknowledged so the gateway stops retrying, but the side
    // effects happened once.
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(w.store.list_assigned_credentials().await.unwrap().len(), 1);
    assert_eq!(w.notifier.count(), 1);
}

#[tokio::test]
async fn webhook_rejects_unknown_charges() {
    let w = common::World::default_windows();
    let app = keyvend::api::app(w.app_state());

    let push = json!({ "object": { "id": "yk-unknown", "status": "succeeded" } });
    let resp = app.oneshot(post_json("/webhooks/yookassa", push)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_rejects_malformed_payloads() {
    let w = common::World::default_windows();
    let app = keyvend::api::app(w.app_state());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/yookassa")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status().is_client_error());

    // Well-formed JSON with empty fields is rejected too.
    let resp = app
        .clone()
        .oneshot(post_json(
            "/webhooks/yookassa",
            json!({ "object": { "id": "", "status": "" } }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Unrecognized status strings are not processed.
    let resp = app
        .oneshot(post_json(
            "/webhooks/yookassa",
            json!({ "object": { "id": "yk-1", "status": "definitely_not_a_status" } }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn webhook_cancellation_frees_the_key() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500)).await;
    w.seed_key(location).await;
    let ticket = w.manager.reserve(location, 1, 1).await.unwrap();

    let app = keyvend::api::app(w.app_state());
    let push = json!({ "object": { "id": ticket.gateway_ref, "status": "canceled" } });
    let resp = app.oneshot(post_json("/webhooks/yookassa", push)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let charge = w
        .store
        .get_charge(&ticket.gateway_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(charge.status, ChargeStatus::Canceled);

    let next = w.manager.reserve(location, 2, 1).await;
    assert!(next.is_ok());
}

#[tokio::test]
async fn purchase_endpoint_places_a_reservation() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500)).await;
    w.seed_key(location).await;

    let app = keyvend::api::app(w.app_state());
    let resp = app
        .oneshot(post_json(
            "/api/v1/purchases",
            json!({ "location_id": location, "requester_id": 9, "months": 3 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // One pending charge for the right amount exists.
    let pending = w
        .store
        .list_stale_pending_charges(chrono::Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].requester_id, 9);
    assert_eq!(pending[0].amount, Decimal::new(142500, 2));
}

#[tokio::test]
async fn purchase_endpoint_maps_domain_failures_to_statuses() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500)).await;

    let app = keyvend::api::app(w.app_state());

    // Empty pool.
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/v1/purchases",
            json!({ "location_id": location, "requester_id": 1, "months": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    // Unknown location.
    let resp = app
        .clone()
        .oneshot(post_json(
            "/api/v1/purchases",
            json!({ "location_id": Uuid::new_v4(), "requester_id": 1, "months": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Gateway down.
    w.seed_key(location).await;
    w.gateway.fail_next_creates(true);
    let resp = app
        .oneshot(post_json(
            "/api/v1/purchases",
            json!({ "location_id": location, "requester_id": 1, "months": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn locations_endpoint_reports_inventory() {
    let w = common::World::default_windows();
    let location = w.seed_location(rub(500)).await;
    w.seed_key(location).await;
    w.seed_key(location).await;

    let app = keyvend::api::app(w.app_state());
    let resp = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/locations")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let inventory = w.store.list_location_inventory().await.unwrap();
    assert_eq!(inventory.len(), 1);
    assert_eq!(inventory[0].free_keys, 2);
    assert_eq!(inventory[0].total_keys, 2);
}
