//! Order initiation for paid events.

use std::sync::Arc;

use mongodb::bson::DateTime;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::models::{Registration, RegistrationStatus};
use crate::services::razorpay::RazorpayClient;
use crate::services::store::RegistrationStore;

/// What the caller needs to open the checkout widget.
#[derive(Debug, Clone)]
pub struct OrderCreated {
    pub order_id: String,
    /// Amount in smallest currency unit.
    pub amount: i64,
    /// Gateway public key for the checkout widget.
    pub key_id: String,
}

/// Opens a gateway order and writes the matching `Pending` registration.
#[derive(Clone)]
pub struct OrderInitiator {
    razorpay: RazorpayClient,
    store: Arc<dyn RegistrationStore>,
}

impl OrderInitiator {
    pub fn new(razorpay: RazorpayClient, store: Arc<dyn RegistrationStore>) -> Self {
        Self { razorpay, store }
    }

    /// Create a gateway order for `amount` tagged with `(event_id, user_id)`
    /// for reconciliation, then record the `Pending` registration.
    ///
    /// The vendor order is created before the local row. If the local write
    /// fails, the order id is still returned so payment can proceed; the
    /// persistence failure is logged and picked up by manual reconciliation.
    pub async fn create_order(
        &self,
        auth: &AuthContext,
        event_id: &str,
        amount: i64,
    ) -> Result<OrderCreated, AppError> {
        if !self.razorpay.is_configured() {
            return Err(AppError::GatewayNotConfigured);
        }

        let receipt = format!("evt_{}", DateTime::now().timestamp_millis());
        let notes = json!({
            "event_id": event_id,
            "user_id": auth.user_id,
        });

        let order = self
            .razorpay
            .create_order(amount, "INR", Some(receipt), Some(notes))
            .await
            .map_err(AppError::Gateway)?;

        let now = DateTime::now();
        let registration = Registration {
            id: Uuid::new_v4(),
            event_id: event_id.to_string(),
            user_id: auth.user_id.clone(),
            amount,
            status: RegistrationStatus::Pending,
            razorpay_order_id: Some(order.id.clone()),
            razorpay_payment_id: None,
            razorpay_signature: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert_registration(registration).await {
            // The gateway order already exists; payment can still proceed.
            // Verification will fail with registration_not_found until the
            // row is reconciled.
            tracing::error!(
                order_id = %order.id,
                event_id = %event_id,
                user_id = %auth.user_id,
                error = %e,
                "Failed to persist pending registration for gateway order"
            );
        }

        tracing::info!(
            order_id = %order.id,
            amount = order.amount,
            event_id = %event_id,
            user_id = %auth.user_id,
            "Gateway order created"
        );

        Ok(OrderCreated {
            order_id: order.id,
            amount: order.amount,
            key_id: self.razorpay.key_id().to_string(),
        })
    }
}
