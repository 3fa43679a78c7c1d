//! Payment verification.
//!
//! The only code path that advances a registration to `Confirmed`. Runs
//! with the service's own store privileges; registration status is never
//! writable through a user-facing path.

use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::models::Registration;
use crate::services::razorpay::{PaymentConfirmation, RazorpayClient};
use crate::services::store::{RegistrationStore, StoreError};

#[derive(Clone)]
pub struct PaymentVerifier {
    razorpay: RazorpayClient,
    store: Arc<dyn RegistrationStore>,
}

impl PaymentVerifier {
    pub fn new(razorpay: RazorpayClient, store: Arc<dyn RegistrationStore>) -> Self {
        Self { razorpay, store }
    }

    /// Authenticate the confirmation payload and confirm the registration.
    ///
    /// The registration is looked up by the vendor order id, never by a
    /// client-supplied row id. The underlying update is idempotent, so
    /// duplicate verification calls for the same order succeed without a
    /// second credit.
    pub async fn verify(
        &self,
        auth: &AuthContext,
        confirmation: &PaymentConfirmation,
    ) -> Result<Registration, AppError> {
        if !self.razorpay.is_configured() {
            return Err(AppError::GatewayNotConfigured);
        }

        let is_valid = self
            .razorpay
            .verify_payment_signature(confirmation)
            .map_err(AppError::Internal)?;
        if !is_valid {
            tracing::warn!(
                order_id = %confirmation.razorpay_order_id,
                user_id = %auth.user_id,
                "Rejecting payment confirmation with invalid signature"
            );
            return Err(AppError::SignatureMismatch);
        }

        let confirmed = self
            .store
            .confirm_registration(
                &confirmation.razorpay_order_id,
                &confirmation.razorpay_payment_id,
                &confirmation.razorpay_signature,
            )
            .await
            .map_err(|e| match e {
                StoreError::Duplicate => AppError::AlreadyRegistered,
                // Money has moved but the row did not update. Surface the
                // payment reference for manual reconciliation.
                StoreError::Backend(source) => AppError::UpdateFailed {
                    payment_id: confirmation.razorpay_payment_id.clone(),
                    source,
                },
            })?;

        let registration = confirmed.ok_or_else(|| {
            AppError::RegistrationNotFound(confirmation.razorpay_order_id.clone())
        })?;

        tracing::info!(
            order_id = %confirmation.razorpay_order_id,
            payment_id = %confirmation.razorpay_payment_id,
            registration_id = %registration.id,
            "Payment verified and registration confirmed"
        );

        Ok(registration)
    }
}
