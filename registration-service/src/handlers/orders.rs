//! Order creation for paid event registrations.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::AppState;

/// Request to open a payment order for an event.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
    /// Amount in the smallest currency unit (paise).
    pub amount: Option<i64>,
}

/// What the checkout widget needs.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: String,
    pub amount: i64,
    #[serde(rename = "keyId")]
    pub key_id: String,
}

pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), AppError> {
    let event_id = payload
        .event_id
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingFields("eventId and amount are required"))?;
    let amount = payload
        .amount
        .filter(|amount| *amount > 0)
        .ok_or(AppError::MissingFields("eventId and amount are required"))?;

    tracing::info!(
        event_id = %event_id,
        user_id = %auth.user_id,
        amount,
        "Creating payment order"
    );

    let created = state.orders.create_order(&auth, &event_id, amount).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            order_id: created.order_id,
            amount: created.amount,
            key_id: created.key_id,
        }),
    ))
}
