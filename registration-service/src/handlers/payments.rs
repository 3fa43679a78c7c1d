//! Payment verification after checkout completion.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::services::PaymentConfirmation;
use crate::AppState;

/// The checkout widget's success payload, relayed by the client.
#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
}

pub async fn verify_payment(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    let missing = AppError::MissingFields(
        "razorpay_order_id, razorpay_payment_id, razorpay_signature, and eventId are required",
    );
    let (Some(order_id), Some(payment_id), Some(signature), Some(_event_id)) = (
        payload.razorpay_order_id.filter(|v| !v.is_empty()),
        payload.razorpay_payment_id.filter(|v| !v.is_empty()),
        payload.razorpay_signature.filter(|v| !v.is_empty()),
        payload.event_id.filter(|v| !v.is_empty()),
    ) else {
        return Err(missing);
    };

    tracing::info!(
        order_id = %order_id,
        payment_id = %payment_id,
        user_id = %auth.user_id,
        "Verifying payment"
    );

    let confirmation = PaymentConfirmation {
        razorpay_order_id: order_id,
        razorpay_payment_id: payment_id,
        razorpay_signature: signature,
    };

    state.verifier.verify(&auth, &confirmation).await?;

    Ok(Json(VerifyPaymentResponse {
        success: true,
        message: "Payment verified and registration confirmed".to_string(),
    }))
}
