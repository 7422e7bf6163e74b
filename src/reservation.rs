//! Reservation Manager: places a time-boxed hold on one free key and opens
//! the matching charge with the payment gateway.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::billing::{ChargeGateway, ChargeRequest};
use crate::errors::AppError;
use crate::models::NewCharge;
use crate::pricing;
use crate::store::Store;

/// Everything the requester needs to complete a purchase.
#[derive(Debug, Serialize)]
pub struct PurchaseTicket {
    pub charge_id: Uuid,
    pub gateway_ref: String,
    pub amount: Decimal,
    pub payment_url: String,
}

pub struct ReservationManager {
    store: Arc<dyn Store>,
    gateway: Arc<dyn ChargeGateway>,
    hold: Duration,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn ChargeGateway>, hold: Duration) -> Self {
        Self {
            store,
            gateway,
            hold,
        }
    }

    /// Hold one free key at the location and open a charge for it.
    ///
    /// The hold and the charge form one compensating transaction: if the
    /// gateway call or the charge record fails, the hold is released
    /// immediately rather than left to expire.
    pub async fn reserve(
        &self,
        location_id: Uuid,
        requester_id: i64,
        months: u32,
    ) -> Result<PurchaseTicket, AppError> {
        let location = self
            .store
            .get_active_location(location_id)
            .await?
            .ok_or(AppError::UnknownLocation)?;

        let amount =
            pricing::quote(location.base_rate, months).ok_or(AppError::UnsupportedTerm(months))?;

        let until = Utc::now() + self.hold;
        let credential = self
            .store
            .hold_free_credential(location_id, requester_id, until)
            .await?
            .ok_or(AppError::NoAvailableCredential)?;

        tracing::debug!(
            requester_id,
            credential_id = %credential.id,
            location = %location.name,
            %until,
            "key held"
        );

        let charge_id = Uuid::new_v4();
        let created = match self
            .gateway
            .create_charge(&ChargeRequest {
                charge_id,
                requester_id,
                amount,
            })
            .await
        {
            Ok(created) => created,
            Err(e) => {
                self.rollback_hold(requester_id).await;
                return Err(AppError::GatewayUnavailable(e.to_string()));
            }
        };

        let charge = match self
            .store
            .insert_charge(&NewCharge {
                id: charge_id,
                requester_id,
                gateway_ref: created.gateway_ref,
                amount,
            })
            .await
        {
            Ok(charge) => charge,
            Err(e) => {
                self.rollback_hold(requester_id).await;
                return Err(AppError::Internal(e));
            }
        };

        tracing::info!(
            requester_id,
            charge_id = %charge.id,
            gateway_ref = %charge.gateway_ref,
            amount = %charge.amount,
            "reservation placed, awaiting payment"
        );

        Ok(PurchaseTicket {
            charge_id: charge.id,
            gateway_ref: charge.gateway_ref,
            amount: charge.amount,
            payment_url: created.payment_url,
        })
    }

    async fn rollback_hold(&self, requester_id: i64) {
        match self.store.release_hold(requester_id).await {
            Ok(released) => {
                tracing::debug!(requester_id, released, "hold rolled back");
            }
            Err(e) => {
                // The hold will still lapse on its own deadline.
                tracing::error!(requester_id, error = %e, "failed to roll back hold");
            }
        }
    }
}
