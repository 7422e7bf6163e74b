//! Background job: periodic payment reconciliation sweep.
//!
//! Polls the gateway for every stale pending charge and routes each one
//! through the reconciliation engine. This is the correctness backstop for
//! lost pushes, duplicate deliveries, and process restarts mid-flight.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::reconcile::ReconcileEngine;

/// Spawn the sweep task. Call this once at startup.
pub fn spawn(engine: Arc<ReconcileEngine>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        loop {
            interval.tick().await;
            engine.sweep().await;
        }
    });
}
