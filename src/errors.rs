use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("no available key at this location")]
    NoAvailableCredential,

    #[error("payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("unknown charge: {0}")]
    UnknownCharge(String),

    #[error("payment settled but requester {0} no longer holds a key")]
    NoHeldCredential(i64),

    #[error("unknown location")]
    UnknownLocation,

    #[error("unsupported subscription term: {0} months")]
    UnsupportedTerm(u32),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, msg) = match &self {
            AppError::NoAvailableCredential => (
                StatusCode::CONFLICT,
                "no_available_key",
                "no free key at this location, try again later".to_string(),
            ),
            AppError::GatewayUnavailable(e) => {
                tracing::warn!("gateway unavailable: {}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    "gateway_unavailable",
                    "payment gateway is unavailable, try again later".to_string(),
                )
            }
            AppError::UnknownCharge(gateway_ref) => (
                StatusCode::NOT_FOUND,
                "unknown_charge",
                format!("no charge with reference {}", gateway_ref),
            ),
            AppError::NoHeldCredential(requester) => {
                // Paid but the hold is gone. Needs out-of-band compensation.
                tracing::error!(
                    requester,
                    "reconciliation anomaly: payment settled without a held key"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "no_held_key",
                    "payment recorded but no key was held".to_string(),
                )
            }
            AppError::UnknownLocation => (
                StatusCode::NOT_FOUND,
                "unknown_location",
                "location does not exist or is inactive".to_string(),
            ),
            AppError::UnsupportedTerm(months) => (
                StatusCode::BAD_REQUEST,
                "unsupported_term",
                format!("no tariff for a {}-month term", months),
            ),
            AppError::Internal(e) => {
                tracing::error!("internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_server_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "code": code,
            }
        }));

        (status, body).into_response()
    }
}
