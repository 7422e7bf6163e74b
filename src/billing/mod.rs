pub mod yookassa;

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Input for opening a charge with the payment gateway.
pub struct ChargeRequest {
    /// Local charge identity; doubles as the gateway idempotency key so a
    /// true retry of the same logical charge cannot create a duplicate.
    pub charge_id: Uuid,
    pub requester_id: i64,
    pub amount: Decimal,
}

/// What the gateway hands back for a freshly opened charge.
#[derive(Debug)]
pub struct CreatedCharge {
    pub gateway_ref: String,
    pub payment_url: String,
}

/// Abstraction over the payment gateway.
///
/// Calls are bounded by a fixed timeout and never retried inline —
/// recovering from transient gateway failure is exclusively the sweep's
/// job. Implementation: `yookassa::YooKassaClient`.
#[async_trait]
pub trait ChargeGateway: Send + Sync {
    /// Open a charge. Returns the gateway's reference and the payment link.
    async fn create_charge(&self, req: &ChargeRequest) -> anyhow::Result<CreatedCharge>;

    /// Current status of a charge as the gateway reports it (raw string).
    async fn charge_status(&self, gateway_ref: &str) -> anyhow::Result<String>;
}
