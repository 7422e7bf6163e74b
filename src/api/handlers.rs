use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::location::LocationInventory;
use crate::reservation::PurchaseTicket;
use crate::AppState;

#[derive(Deserialize)]
pub struct PurchaseRequest {
    pub location_id: Uuid,
    pub requester_id: i64,
    pub months: u32,
}

/// POST /api/v1/purchases — hold a key and open a charge.
///
/// Returns the payment link the requester must follow; the outcome arrives
/// asynchronously through the webhook or the sweep.
pub async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PurchaseRequest>,
) -> Result<Json<PurchaseTicket>, AppError> {
    let ticket = state
        .reservations
        .reserve(req.location_id, req.requester_id, req.months)
        .await?;
    Ok(Json(ticket))
}

/// GET /api/v1/locations — locations with free/total key counts.
pub async fn list_locations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LocationInventory>>, AppError> {
    let rows = state.store.list_location_inventory().await?;
    Ok(Json(rows))
}
