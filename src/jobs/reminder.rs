//! Background job: subscription expiry reminders.
//!
//! Once a day, walks the assigned keys and pings holders whose 30-day
//! subscription window ends in 7 or 3 days.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time;

use crate::notify::Notifier;
use crate::store::Store;

const SUBSCRIPTION_DAYS: i64 = 30;
const REMINDER_DAYS: [i64; 2] = [7, 3];

/// Spawn the daily reminder task. Call this once at startup.
pub fn spawn(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(24 * 3600));
        loop {
            interval.tick().await;
            if let Err(e) = remind_expiring(store.as_ref(), notifier.as_ref()).await {
                tracing::error!(error = %e, "reminder job failed");
            }
        }
    });
}

/// Days left on the subscription, if it lands on a reminder mark.
fn reminder_due(assigned_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    let expires = assigned_at + chrono::Duration::days(SUBSCRIPTION_DAYS);
    let days_left = (expires - now).num_days();
    REMINDER_DAYS.contains(&days_left).then_some(days_left)
}

pub async fn remind_expiring(store: &dyn Store, notifier: &dyn Notifier) -> anyhow::Result<()> {
    let keys = store.list_assigned_credentials().await?;
    let now = Utc::now();

    for key in keys {
        let (Some(assigned_at), Some(holder)) = (key.assigned_at, key.holder_id) else {
            continue;
        };
        let Some(days_left) = reminder_due(assigned_at, now) else {
            continue;
        };

        let text = format!(
            "Your access key expires in {} days. Renew to keep your subscription.",
            days_left
        );
        if let Err(e) = notifier.notify(holder, &text).await {
            tracing::warn!(holder, error = %e, "expiry reminder delivery failed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminders_fire_at_seven_and_three_days() {
        let now = Utc::now();
        assert_eq!(
            reminder_due(now - chrono::Duration::days(23), now),
            Some(7)
        );
        assert_eq!(
            reminder_due(now - chrono::Duration::days(27), now),
            Some(3)
        );
    }

    #[test]
    fn no_reminder_outside_the_marks() {
        let now = Utc::now();
        assert_eq!(reminder_due(now, now), None);
        assert_eq!(reminder_due(now - chrono::Duration::days(10), now), None);
        assert_eq!(reminder_due(now - chrono::Duration::days(29), now), None);
        // Already expired.
        assert_eq!(reminder_due(now - chrono::Duration::days(40), now), None);
    }
}
