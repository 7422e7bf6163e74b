use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use crate::models::ChargeStatus;
use crate::AppState;

/// The gateway's push notification payload.
#[derive(Debug, Deserialize)]
pub struct GatewayPush {
    pub object: PushObject,
}

#[derive(Debug, Deserialize)]
pub struct PushObject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
}

/// POST /webhooks/yookassa — gateway-initiated status change.
///
/// The gateway retries a push until it gets a 2xx, so the response must be
/// 2xx if and only if processing succeeded. A charge that is already
/// terminal counts as processed (the retry is a duplicate).
pub async fn yookassa_webhook(
    State(state): State<Arc<AppState>>,
    Json(push): Json<GatewayPush>,
) -> Response {
    if push.object.id.is_empty() || push.object.status.is_empty() {
        tracing::warn!("webhook: payload missing charge id or status");
        return StatusCode::BAD_REQUEST.into_response();
    }

    let reported = match ChargeStatus::from_gateway(&push.object.status) {
        Some(status) => status,
        None => {
            tracing::warn!(
                gateway_ref = %push.object.id,
                raw = %push.object.status,
                "webhook: unrecognized gateway status"
            );
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    tracing::debug!(
        gateway_ref = %push.object.id,
        status = %push.object.status,
        "webhook: push received"
    );

    match state.engine.apply_outcome(&push.object.id, reported).await {
        Ok(outcome) => {
            tracing::debug!(gateway_ref = %push.object.id, ?outcome, "webhook: processed");
            StatusCode::OK.into_response()
        }
        // Non-2xx so the gateway keeps retrying anything unprocessed.
        Err(e) => e.into_response(),
    }
}
