pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::location::LocationInventory;
use crate::models::{Charge, ChargeStatus, Credential, Location, NewCharge, NewLocation};

/// Storage capability for the key pool and the charge ledger.
///
/// The store exclusively owns persistence; callers never cache row state
/// between calls. Every mutation is a single conditional, predicate-scoped
/// update, so two racing callers cannot both win the same row:
/// `hold_free_credential` atomically tests the free predicate and writes
/// the hold, and `finalize_charge` is a compare-and-swap on
/// `status = pending`. Lazy hold expiry is timestamp-driven, which assumes
/// reasonably synchronized clocks between the process and the store.
///
/// Implementations: `postgres::PgStore` (production),
/// `memory::MemStore` (tests, local development).
#[async_trait]
pub trait Store: Send + Sync {
    // -- Locations --

    async fn insert_location(&self, loc: &NewLocation) -> anyhow::Result<Location>;

    async fn get_active_location(&self, id: Uuid) -> anyhow::Result<Option<Location>>;

    /// All locations joined with free/total key counts, for the operator
    /// inventory view.
    async fn list_location_inventory(&self) -> anyhow::Result<Vec<LocationInventory>>;

    // -- Credentials --

    async fn insert_credential(&self, location_id: Uuid, token: &str) -> anyhow::Result<Uuid>;

    /// Select one free credential at the location and write a hold on it,
    /// atomically. A credential is free when `used = false` and any prior
    /// reservation deadline has passed. Returns `None` when the pool has
    /// nothing free. Exactly one of N concurrent callers can win a given
    /// credential.
    async fn hold_free_credential(
        &self,
        location_id: Uuid,
        holder: i64,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Option<Credential>>;

    /// Clear the hold (deadline and holder) on any unused credential held
    /// by this requester. Returns the number of rows released.
    async fn release_hold(&self, holder: i64) -> anyhow::Result<u64>;

    /// Convert this requester's hold into a permanent assignment:
    /// `used = true`, `assigned_at` stamped, deadline cleared. Returns the
    /// assigned credential, or `None` when the requester no longer holds
    /// one (the hold expired and was reclaimed).
    async fn assign_held_credential(
        &self,
        holder: i64,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Credential>>;

    async fn list_assigned_credentials(&self) -> anyhow::Result<Vec<Credential>>;

    // -- Charges --

    async fn insert_charge(&self, charge: &NewCharge) -> anyhow::Result<Charge>;

    async fn get_charge(&self, gateway_ref: &str) -> anyhow::Result<Option<Charge>>;

    /// Compare-and-swap the charge from `pending` to a terminal status.
    /// Returns `true` iff this call performed the transition; a concurrent
    /// or repeated call observes `false` and must not re-apply side
    /// effects. Terminal rows are never rewritten.
    async fn finalize_charge(
        &self,
        gateway_ref: &str,
        status: ChargeStatus,
    ) -> anyhow::Result<bool>;

    /// Pending charges created before `cutoff`, oldest first.
    async fn list_stale_pending_charges(
        &self,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Charge>>;
}
