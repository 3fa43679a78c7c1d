//! Razorpay gateway client.
//!
//! Implements the Orders API for payment initiation and HMAC signature
//! verification for payment confirmation. The signature check is the sole
//! gate against forged confirmations: a client-supplied payload is never
//! trusted without it.

use anyhow::{anyhow, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::RazorpayConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct RazorpayClient {
    client: Client,
    config: RazorpayConfig,
}

/// Request to create a Razorpay order.
#[derive(Debug, Serialize)]
pub struct CreateOrderRequest {
    /// Amount in smallest currency unit (paise for INR).
    pub amount: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<serde_json::Value>,
}

/// Response from Razorpay order creation.
#[derive(Debug, Deserialize)]
pub struct RazorpayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    pub status: String,
    pub created_at: i64,
}

/// Razorpay API error response.
#[derive(Debug, Deserialize)]
pub struct RazorpayError {
    pub error: RazorpayErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct RazorpayErrorDetail {
    pub code: String,
    pub description: String,
}

/// The confirmation payload the checkout widget hands back on success.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

impl RazorpayClient {
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check whether gateway credentials are set.
    pub fn is_configured(&self) -> bool {
        !self.config.key_id.is_empty() && !self.config.key_secret.expose_secret().is_empty()
    }

    pub fn key_id(&self) -> &str {
        &self.config.key_id
    }

    /// Create a new order in Razorpay.
    pub async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: Option<String>,
        notes: Option<serde_json::Value>,
    ) -> Result<RazorpayOrder> {
        if !self.is_configured() {
            return Err(anyhow!("Razorpay credentials not configured"));
        }

        let request = CreateOrderRequest {
            amount,
            currency: currency.to_string(),
            receipt,
            notes,
        };

        let url = format!("{}/orders", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.key_id,
                Some(self.config.key_secret.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "Razorpay create_order response");

        if status.is_success() {
            let order: RazorpayOrder = serde_json::from_str(&body)?;
            tracing::info!(
                order_id = %order.id,
                amount = order.amount,
                currency = %order.currency,
                "Razorpay order created"
            );
            Ok(order)
        } else {
            let error: RazorpayError =
                serde_json::from_str(&body).unwrap_or_else(|_| RazorpayError {
                    error: RazorpayErrorDetail {
                        code: "UNKNOWN".to_string(),
                        description: body.clone(),
                    },
                });
            tracing::error!(
                code = %error.error.code,
                description = %error.error.description,
                "Razorpay order creation failed"
            );
            Err(anyhow!(
                "Razorpay error: {} - {}",
                error.error.code,
                error.error.description
            ))
        }
    }

    /// Verify the checkout confirmation signature.
    ///
    /// The signature is `hex(HMAC-SHA256("{order_id}|{payment_id}", key_secret))`.
    /// Comparison goes through `Mac::verify_slice`, which is constant-time.
    pub fn verify_payment_signature(&self, confirmation: &PaymentConfirmation) -> Result<bool> {
        let payload = format!(
            "{}|{}",
            confirmation.razorpay_order_id, confirmation.razorpay_payment_id
        );

        // A signature that is not valid hex cannot match anything.
        let Ok(supplied) = hex::decode(&confirmation.razorpay_signature) else {
            tracing::warn!(
                order_id = %confirmation.razorpay_order_id,
                "Payment signature is not valid hex"
            );
            return Ok(false);
        };

        let mut mac =
            HmacSha256::new_from_slice(self.config.key_secret.expose_secret().as_bytes())
                .map_err(|_| anyhow!("Invalid key length"))?;
        mac.update(payload.as_bytes());
        let is_valid = mac.verify_slice(&supplied).is_ok();

        if is_valid {
            tracing::info!(
                order_id = %confirmation.razorpay_order_id,
                payment_id = %confirmation.razorpay_payment_id,
                "Payment signature verified"
            );
        } else {
            tracing::warn!(
                order_id = %confirmation.razorpay_order_id,
                payment_id = %confirmation.razorpay_payment_id,
                "Payment signature verification failed"
            );
        }

        Ok(is_valid)
    }

    /// Compute the reference signature for an (order, payment) pair.
    /// What the gateway produces, reproduced here for tests.
    pub fn compute_signature(&self, order_id: &str, payment_id: &str) -> Result<String> {
        let payload = format!("{order_id}|{payment_id}");
        let mut mac =
            HmacSha256::new_from_slice(self.config.key_secret.expose_secret().as_bytes())
                .map_err(|_| anyhow!("Invalid key length"))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}
