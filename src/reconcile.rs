//! Reconciliation Engine: the single authority that drives a charge and
//! its held key to a terminal state.
//!
//! Two independent triggers land here — the gateway's push notification
//! and the periodic sweep — and both go through [`ReconcileEngine::apply_outcome`].
//! The per-charge compare-and-swap on `status = pending` makes the entry
//! point idempotent: whichever trigger wins the swap applies the side
//! effects exactly once, and every other invocation is a no-op.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::billing::ChargeGateway;
use crate::errors::AppError;
use crate::models::ChargeStatus;
use crate::notify::Notifier;
use crate::store::Store;

/// What a single `apply_outcome` call did.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// This call performed the terminal transition.
    Applied(ChargeStatus),
    /// The charge was already terminal (or a concurrent call won the swap).
    AlreadySettled,
    /// The gateway still reports the charge in flight; nothing to apply.
    StillPending,
}

/// Counters for one sweep pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub checked: usize,
    pub applied: usize,
    pub expired: usize,
    pub failed: usize,
}

pub struct ReconcileEngine {
    store: Arc<dyn Store>,
    gateway: Arc<dyn ChargeGateway>,
    notifier: Arc<dyn Notifier>,
    /// Pending charges older than this are picked up by the sweep.
    stale_after: Duration,
    /// The reservation hold window; a pending charge past it with no
    /// terminal signal is abandoned and released.
    hold: Duration,
}

impl ReconcileEngine {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn ChargeGateway>,
        notifier: Arc<dyn Notifier>,
        stale_after: Duration,
        hold: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            notifier,
            stale_after,
            hold,
        }
    }

    /// Apply a reported gateway status to the charge, exactly once.
    ///
    /// Safe to call any number of times, from any trigger: once the charge
    /// is terminal every further call returns `AlreadySettled` without
    /// touching the key or re-notifying the requester.
    pub async fn apply_outcome(
        &self,
        gateway_ref: &str,
        reported: ChargeStatus,
    ) -> Result<Outcome, AppError> {
        let charge = self
            .store
            .get_charge(gateway_ref)
            .await?
            .ok_or_else(|| AppError::UnknownCharge(gateway_ref.to_string()))?;

        if charge.is_terminal() {
            tracing::debug!(
                gateway_ref,
                status = charge.status.as_str(),
                "charge already settled, no-op"
            );
            return Ok(Outcome::AlreadySettled);
        }

        match reported {
            ChargeStatus::Pending => Ok(Outcome::StillPending),

            ChargeStatus::Succeeded => {
                if !self
                    .store
                    .finalize_charge(gateway_ref, ChargeStatus::Succeeded)
                    .await?
                {
                    return Ok(Outcome::AlreadySettled);
                }

                match self
                    .store
                    .assign_held_credential(charge.requester_id, Utc::now())
                    .await?
                {
                    Some(credential) => {
                        tracing::info!(
                            gateway_ref,
                            requester_id = charge.requester_id,
                            credential_id = %credential.id,
                            "payment settled, key assigned"
                        );
                        self.send(
                            charge.requester_id,
                            "Payment received. Your access key is now active.",
                        )
                        .await;
                        Ok(Outcome::Applied(ChargeStatus::Succeeded))
                    }
                    None => {
                        // The hold lapsed before confirmation arrived and
                        // the key went back to the pool. The charge stays
                        // settled; compensation is an operator decision.
                        tracing::error!(
                            gateway_ref,
                            requester_id = charge.requester_id,
                            "payment settled but requester holds no key"
                        );
                        Err(AppError::NoHeldCredential(charge.requester_id))
                    }
                }
            }

            ChargeStatus::Canceled => {
                if !self
                    .store
                    .finalize_charge(gateway_ref, ChargeStatus::Canceled)
                    .await?
                {
                    return Ok(Outcome::AlreadySettled);
                }

                let released = self.store.release_hold(charge.requester_id).await?;
                tracing::info!(
                    gateway_ref,
                    requester_id = charge.requester_id,
                    released,
                    "charge canceled, hold released"
                );
                self.send(
                    charge.requester_id,
                    "Payment was not completed. Your key reservation has been released.",
                )
                .await;
                Ok(Outcome::Applied(ChargeStatus::Canceled))
            }
        }
    }

    /// Poll every stale pending charge against the gateway and reconcile it.
    ///
    /// This is the recovery path for lost or never-delivered pushes. One
    /// charge's failure never aborts the rest of the batch.
    pub async fn sweep(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        let cutoff = Utc::now() - self.stale_after;
        let stale = match self.store.list_stale_pending_charges(cutoff).await {
            Ok(charges) => charges,
            Err(e) => {
                tracing::error!(error = %e, "sweep: failed to list pending charges");
                return stats;
            }
        };

        if stale.is_empty() {
            return stats;
        }
        tracing::debug!(count = stale.len(), "sweep: checking stale pending charges");

        for charge in stale {
            stats.checked += 1;
            let gateway_ref = charge.gateway_ref.as_str();

            let raw = match self.gateway.charge_status(gateway_ref).await {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(gateway_ref, error = %e, "sweep: status query failed, skipping");
                    stats.failed += 1;
                    continue;
                }
            };

            let reported = match ChargeStatus::from_gateway(&raw) {
                Some(status) => status,
                None => {
                    tracing::warn!(gateway_ref, raw = %raw, "sweep: unrecognized gateway status, skipping");
                    stats.failed += 1;
                    continue;
                }
            };

            match self.apply_outcome(gateway_ref, reported).await {
                Ok(Outcome::Applied(status)) => {
                    tracing::info!(gateway_ref, status = status.as_str(), "sweep: outcome applied");
                    stats.applied += 1;
                }
                Ok(Outcome::AlreadySettled) => {}
                Ok(Outcome::StillPending) => {
                    // The hold window has fully elapsed with no terminal
                    // signal: abandon the charge and free the key.
                    if charge.created_at + self.hold < Utc::now() {
                        match self.apply_outcome(gateway_ref, ChargeStatus::Canceled).await {
                            Ok(Outcome::Applied(_)) => {
                                tracing::info!(
                                    gateway_ref,
                                    "sweep: hold window elapsed, charge released"
                                );
                                stats.expired += 1;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                tracing::warn!(gateway_ref, error = %e, "sweep: release failed");
                                stats.failed += 1;
                            }
                        }
                    }
                }
                // Already logged loudly inside apply_outcome.
                Err(AppError::NoHeldCredential(_)) => stats.failed += 1,
                Err(e) => {
                    tracing::warn!(gateway_ref, error = %e, "sweep: failed to apply outcome");
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(
            checked = stats.checked,
            applied = stats.applied,
            expired = stats.expired,
            failed = stats.failed,
            "sweep complete"
        );
        stats
    }

    async fn send(&self, requester_id: i64, text: &str) {
        if let Err(e) = self.notifier.notify(requester_id, text).await {
            tracing::warn!(requester_id, error = %e, "outcome notification failed");
        }
    }
}
