//! In-memory store with the same conditional-update semantics as the
//! Postgres implementation. Backs the test suite and local development.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::location::LocationInventory;
use crate::models::{Charge, ChargeStatus, Credential, Location, NewCharge, NewLocation};
use crate::store::Store;

#[derive(Default)]
struct Inner {
    locations: Vec<Location>,
    credentials: Vec<Credential>,
    charges: Vec<Charge>,
}

/// Every trait method takes the single mutex for its whole critical
/// section, which gives the same effective atomicity the Postgres store
/// gets from single-statement conditional updates.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemStore {
    // -- Locations --

    async fn insert_location(&self, loc: &NewLocation) -> anyhow::Result<Location> {
        let mut inner = self.inner.lock().unwrap();
        if inner.locations.iter().any(|l| l.name == loc.name) {
            anyhow::bail!("location name already exists: {}", loc.name);
        }
        let row = Location {
            id: Uuid::new_v4(),
            name: loc.name.clone(),
            endpoint: loc.endpoint.clone(),
            base_rate: loc.base_rate,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.locations.push(row.clone());
        Ok(row)
    }

    async fn get_active_location(&self, id: Uuid) -> anyhow::Result<Option<Location>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .locations
            .iter()
            .find(|l| l.id == id && l.is_active)
            .cloned())
    }

    async fn list_location_inventory(&self) -> anyhow::Result<Vec<LocationInventory>> {
        let inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let mut rows: Vec<LocationInventory> = inner
            .locations
            .iter()
            .map(|l| LocationInventory {
                id: l.id,
                name: l.name.clone(),
                endpoint: l.endpoint.clone(),
                base_rate: l.base_rate,
                is_active: l.is_active,
                free_keys: inner
                    .credentials
                    .iter()
                    .filter(|c| c.location_id == l.id && c.is_free(now))
                    .count() as i64,
                total_keys: inner
                    .credentials
                    .iter()
                    .filter(|c| c.location_id == l.id)
                    .count() as i64,
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    // -- Credentials --

    async fn insert_credential(&self, location_id: Uuid, token: &str) -> anyhow::Result<Uuid> {
        let mut inner = self.inner.lock().unwrap();
        if inner.credentials.iter().any(|c| c.token == token) {
            anyhow::bail!("credential token already exists");
        }
        let id = Uuid::new_v4();
        inner.credentials.push(Credential {
            id,
            location_id,
            token: token.to_string(),
            used: false,
            reserved_until: None,
            holder_id: None,
            assigned_at: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn hold_free_credential(
        &self,
        location_id: Uuid,
        holder: i64,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Option<Credential>> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let slot = inner
            .credentials
            .iter_mut()
            .find(|c| c.location_id == location_id && c.is_free(now));
        Ok(slot.map(|c| {
            c.reserved_until = Some(until);
            c.holder_id = Some(holder);
            c.clone()
        }))
    }

    async fn release_hold(&self, holder: i64) -> anyhow::Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut released = 0;
        for c in inner
            .credentials
            .iter_mut()
            .filter(|c| c.holder_id == Some(holder) && !c.used)
        {
            c.reserved_until = None;
            c.holder_id = None;
            released += 1;
        }
        Ok(released)
    }

    async fn assign_held_credential(
        &self,
        holder: i64,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Credential>> {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .credentials
            .iter_mut()
            .find(|c| c.holder_id == Some(holder) && !c.used);
        Ok(slot.map(|c| {
            c.used = true;
            c.assigned_at = Some(at);
            c.reserved_until = None;
            c.clone()
        }))
    }

    async fn list_assigned_credentials(&self) -> anyhow::Result<Vec<Credential>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .credentials
            .iter()
            .filter(|c| c.used && c.assigned_at.is_some())
            .cloned()
            .collect())
    }

    // -- Charges --

    async fn insert_charge(&self, charge: &NewCharge) -> anyhow::Result<Charge> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .charges
            .iter()
            .any(|c| c.gateway_ref == charge.gateway_ref)
        {
            anyhow::bail!("gateway reference already exists: {}", charge.gateway_ref);
        }
        let now = Utc::now();
        let row = Charge {
            id: charge.id,
            requester_id: charge.requester_id,
            gateway_ref: charge.gateway_ref.clone(),
            amount: charge.amount,
            status: ChargeStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.charges.push(row.clone());
        Ok(row)
    }

    async fn get_charge(&self, gateway_ref: &str) -> anyhow::Result<Option<Charge>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .charges
            .iter()
            .find(|c| c.gateway_ref == gateway_ref)
            .cloned())
    }

    async fn finalize_charge(
        &self,
        gateway_ref: &str,
        status: ChargeStatus,
    ) -> anyhow::Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner
            .charges
            .iter_mut()
            .find(|c| c.gateway_ref == gateway_ref && c.status == ChargeStatus::Pending)
        {
            Some(c) => {
                c.status = status;
                c.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_stale_pending_charges(
        &self,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Charge>> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Charge> = inner
            .charges
            .iter()
            .filter(|c| c.status == ChargeStatus::Pending && c.created_at < cutoff)
            .cloned()
            .collect();
        rows.sort_by_key(|c| c.created_at);
        Ok(rows)
    }
}
