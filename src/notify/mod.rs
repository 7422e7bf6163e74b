pub mod telegram;

use async_trait::async_trait;

/// Capability to deliver a final outcome message to a requester.
///
/// Delivery is best-effort: a failed notification is logged by the caller
/// and never rolls back a terminal transition that was already applied.
/// Implementation: `telegram::TelegramNotifier`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, requester_id: i64, text: &str) -> anyhow::Result<()>;
}
