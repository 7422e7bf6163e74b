use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A serving location with its own key pool and base monthly rate.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub endpoint: String,
    pub base_rate: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

pub struct NewLocation {
    pub name: String,
    pub endpoint: String,
    pub base_rate: Decimal,
}

/// Inventory line for the operator view: a location plus key-pool counts.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LocationInventory {
    pub id: Uuid,
    pub name: String,
    pub endpoint: String,
    pub base_rate: Decimal,
    pub is_active: bool,
    pub free_keys: i64,
    pub total_keys: i64,
}
