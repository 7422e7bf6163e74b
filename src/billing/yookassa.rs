//! YooKassa payment gateway client.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::billing::{ChargeGateway, ChargeRequest, CreatedCharge};
use crate::config::Config;

pub struct YooKassaClient {
    client: reqwest::Client,
    base_url: String,
    shop_id: String,
    secret_key: String,
}

impl YooKassaClient {
    pub fn new(base_url: &str, shop_id: &str, secret_key: &str) -> Self {
        Self {
            // An unbounded gateway call under contention would stall the
            // purchase path; 10s is the contract with the caller.
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("failed to build gateway HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            shop_id: shop_id.to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            &cfg.yookassa_base_url,
            &cfg.yookassa_shop_id,
            &cfg.yookassa_secret_key,
        )
    }
}

// -- Wire types --

#[derive(Serialize)]
struct PaymentRequest {
    amount: Amount,
    capture: bool,
    payment_method_data: PaymentMethodData,
    metadata: Metadata,
}

#[derive(Serialize)]
struct Amount {
    value: String,
    currency: &'static str,
}

#[derive(Serialize)]
struct PaymentMethodData {
    #[serde(rename = "type")]
    method_type: &'static str,
}

#[derive(Serialize)]
struct Metadata {
    requester_id: i64,
}

#[derive(Deserialize)]
struct PaymentResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
    confirmation: Option<Confirmation>,
}

#[derive(Deserialize)]
struct Confirmation {
    confirmation_url: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: String,
}

#[async_trait]
impl ChargeGateway for YooKassaClient {
    async fn create_charge(&self, req: &ChargeRequest) -> anyhow::Result<CreatedCharge> {
        let body = PaymentRequest {
            amount: Amount {
                value: format!("{:.2}", req.amount),
                currency: "RUB",
            },
            capture: true,
            payment_method_data: PaymentMethodData {
                method_type: "bank_card",
            },
            metadata: Metadata {
                requester_id: req.requester_id,
            },
        };

        let resp = self
            .client
            .post(format!("{}/payments", self.base_url))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .header("Idempotence-Key", req.charge_id.to_string())
            .json(&body)
            .send()
            .await
            .context("failed to reach payment gateway")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("gateway rejected charge creation: status={}, body={}", status, body);
        }

        let payment: PaymentResponse = resp
            .json()
            .await
            .context("failed to decode gateway response")?;

        let payment_url = payment
            .confirmation
            .and_then(|c| c.confirmation_url)
            .unwrap_or_default();
        if payment.id.is_empty() || payment_url.is_empty() {
            anyhow::bail!("gateway response missing charge id or confirmation link");
        }

        tracing::debug!(
            gateway_ref = %payment.id,
            status = %payment.status,
            "charge opened with gateway"
        );

        Ok(CreatedCharge {
            gateway_ref: payment.id,
            payment_url,
        })
    }

    async fn charge_status(&self, gateway_ref: &str) -> anyhow::Result<String> {
        let resp = self
            .client
            .get(format!("{}/payments/{}", self.base_url, gateway_ref))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .send()
            .await
            .context("failed to reach payment gateway")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("gateway status query failed: status={}, body={}", status, body);
        }

        let payment: StatusResponse = resp
            .json()
            .await
            .context("failed to decode gateway status response")?;

        if payment.id.is_empty() || payment.status.is_empty() {
            anyhow::bail!("gateway status response missing id or status");
        }

        Ok(payment.status)
    }
}
