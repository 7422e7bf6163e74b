use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One payment attempt against the gateway.
///
/// `gateway_ref` is the gateway's own identifier for the charge; it is
/// unique and immutable once the row is created. `id` doubles as the
/// idempotency key sent to the gateway when the charge is opened.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Charge {
    pub id: Uuid,
    pub requester_id: i64,
    pub gateway_ref: String,
    pub amount: Decimal,
    pub status: ChargeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Charge {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Charge lifecycle. Transitions are monotone: once a terminal status is
/// written the row never changes again.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum ChargeStatus {
    Pending,
    Succeeded,
    Canceled,
}

impl ChargeStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ChargeStatus::Pending)
    }

    /// Map a raw gateway status string onto the local lifecycle.
    ///
    /// The gateway reports `pending` and `waiting_for_capture` before a
    /// charge settles; both are still in flight here. Unknown strings
    /// return `None` so the caller can reject or skip them.
    pub fn from_gateway(raw: &str) -> Option<Self> {
        match raw {
            "succeeded" => Some(ChargeStatus::Succeeded),
            "canceled" | "cancelled" | "failed" => Some(ChargeStatus::Canceled),
            "pending" | "waiting_for_capture" => Some(ChargeStatus::Pending),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChargeStatus::Pending => "pending",
            ChargeStatus::Succeeded => "succeeded",
            ChargeStatus::Canceled => "canceled",
        }
    }
}

/// Input for recording a freshly created charge.
pub struct NewCharge {
    pub id: Uuid,
    pub requester_id: i64,
    pub gateway_ref: String,
    pub amount: Decimal,
}
