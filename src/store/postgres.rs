use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::location::LocationInventory;
use crate::models::{Charge, ChargeStatus, Credential, Location, NewCharge, NewLocation};
use crate::store::Store;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    // -- Locations --

    async fn insert_location(&self, loc: &NewLocation) -> anyhow::Result<Location> {
        let row = sqlx::query_as::<_, Location>(
            r#"INSERT INTO locations (name, endpoint, base_rate)
               VALUES ($1, $2, $3)
               RETURNING id, name, endpoint, base_rate, is_active, created_at"#,
        )
        .bind(&loc.name)
        .bind(&loc.endpoint)
        .bind(loc.base_rate)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_active_location(&self, id: Uuid) -> anyhow::Result<Option<Location>> {
        let row = sqlx::query_as::<_, Location>(
            "SELECT id, name, endpoint, base_rate, is_active, created_at
             FROM locations WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_location_inventory(&self) -> anyhow::Result<Vec<LocationInventory>> {
        let rows = sqlx::query_as::<_, LocationInventory>(
            r#"SELECT l.id, l.name, l.endpoint, l.base_rate, l.is_active,
                      COUNT(c.id) FILTER (
                          WHERE c.used = false
                            AND (c.reserved_until IS NULL OR c.reserved_until < NOW())
                      ) AS free_keys,
                      COUNT(c.id) AS total_keys
               FROM locations l
               LEFT JOIN credentials c ON c.location_id = l.id
               GROUP BY l.id
               ORDER BY l.name ASC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -- Credentials --

    async fn insert_credential(&self, location_id: Uuid, token: &str) -> anyhow::Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "INSERT INTO credentials (location_id, token) VALUES ($1, $2) RETURNING id",
        )
        .bind(location_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn hold_free_credential(
        &self,
        location_id: Uuid,
        holder: i64,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Option<Credential>> {
        // Single statement: the free-predicate test and the hold write
        // happen under the same row lock, and SKIP LOCKED keeps two
        // concurrent reservations off the same row.
        let row = sqlx::query_as::<_, Credential>(
            r#"UPDATE credentials
               SET reserved_until = $3, holder_id = $2
               WHERE id = (
                   SELECT id FROM credentials
                   WHERE location_id = $1
                     AND used = false
                     AND (reserved_until IS NULL OR reserved_until < NOW())
                   LIMIT 1
                   FOR UPDATE SKIP LOCKED
               )
               RETURNING id, location_id, token, used, reserved_until,
                         holder_id, assigned_at, created_at"#,
        )
        .bind(location_id)
        .bind(holder)
        .bind(until)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn release_hold(&self, holder: i64) -> anyhow::Result<u64> {
        let result = sqlx::query(
            "UPDATE credentials SET reserved_until = NULL, holder_id = NULL
             WHERE holder_id = $1 AND used = false",
        )
        .bind(holder)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn assign_held_credential(
        &self,
        holder: i64,
        at: DateTime<Utc>,
    ) -> anyhow::Result<Option<Credential>> {
        let row = sqlx::query_as::<_, Credential>(
            r#"UPDATE credentials
               SET used = true, assigned_at = $2, reserved_until = NULL
               WHERE id = (
                   SELECT id FROM credentials
                   WHERE holder_id = $1 AND used = false
                   LIMIT 1
                   FOR UPDATE SKIP LOCKED
               )
               RETURNING id, location_id, token, used, reserved_until,
                         holder_id, assigned_at, created_at"#,
        )
        .bind(holder)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_assigned_credentials(&self) -> anyhow::Result<Vec<Credential>> {
        let rows = sqlx::query_as::<_, Credential>(
            "SELECT id, location_id, token, used, reserved_until,
                    holder_id, assigned_at, created_at
             FROM credentials
             WHERE used = true AND assigned_at IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // -- Charges --

    async fn insert_charge(&self, charge: &NewCharge) -> anyhow::Result<Charge> {
        let row = sqlx::query_as::<_, Charge>(
            r#"INSERT INTO charges (id, requester_id, gateway_ref, amount, status)
               VALUES ($1, $2, $3, $4, 'pending')
               RETURNING id, requester_id, gateway_ref, amount, status,
                         created_at, updated_at"#,
        )
        .bind(charge.id)
        .bind(charge.requester_id)
        .bind(&charge.gateway_ref)
        .bind(charge.amount)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_charge(&self, gateway_ref: &str) -> anyhow::Result<Option<Charge>> {
        let row = sqlx::query_as::<_, Charge>(
            "SELECT id, requester_id, gateway_ref, amount, status, created_at, updated_at
             FROM charges WHERE gateway_ref = $1",
        )
        .bind(gateway_ref)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn finalize_charge(
        &self,
        gateway_ref: &str,
        status: ChargeStatus,
    ) -> anyhow::Result<bool> {
        // CAS on status: only the caller that flips pending -> terminal
        // sees rows_affected = 1, so a push and a concurrent sweep cannot
        // both apply side effects for the same charge.
        let result = sqlx::query(
            "UPDATE charges SET status = $2, updated_at = NOW()
             WHERE gateway_ref = $1 AND status = 'pending'",
        )
        .bind(gateway_ref)
        .bind(status)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_stale_pending_charges(
        &self,
        cutoff: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Charge>> {
        let rows = sqlx::query_as::<_, Charge>(
            "SELECT id, requester_id, gateway_ref, amount, status, created_at, updated_at
             FROM charges
             WHERE status = 'pending' AND created_at < $1
             ORDER BY created_at ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
