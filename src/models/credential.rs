use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique access key tied to one serving location.
///
/// A credential is in exactly one of three states:
/// - free: `used = false` and no live reservation,
/// - held: `used = false`, `reserved_until` in the future, `holder_id` set,
/// - assigned: `used = true` (terminal), `assigned_at` and `holder_id` set.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub location_id: Uuid,
    pub token: String,
    pub used: bool,
    pub reserved_until: Option<DateTime<Utc>>,
    pub holder_id: Option<i64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Credential {
    /// A hold is live only until its deadline; expiry is detected lazily by
    /// the next reservation attempt, never by an explicit cancellation.
    pub fn is_free(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.reserved_until.map_or(true, |until| until < now)
    }
}
