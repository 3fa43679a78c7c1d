//! Free-event registration and the caller's registration list.

use axum::{extract::State, http::StatusCode, Json};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::models::{Registration, RegistrationStatus};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterFreeRequest {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub id: Uuid,
    pub event_id: String,
    pub amount: i64,
    pub status: RegistrationStatus,
    pub razorpay_payment_id: Option<String>,
    pub created_at: String,
}

impl From<Registration> for RegistrationResponse {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            event_id: r.event_id,
            amount: r.amount,
            status: r.status,
            razorpay_payment_id: r.razorpay_payment_id,
            created_at: r.created_at.to_string(),
        }
    }
}

/// Register for a free event: a zero-amount registration is inserted
/// directly as `Confirmed`, no gateway involved.
pub async fn register_free(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(payload): Json<RegisterFreeRequest>,
) -> Result<(StatusCode, Json<RegistrationResponse>), AppError> {
    let event_id = payload
        .event_id
        .filter(|id| !id.is_empty())
        .ok_or(AppError::MissingFields("eventId is required"))?;

    let now = DateTime::now();
    let registration = Registration {
        id: Uuid::new_v4(),
        event_id,
        user_id: auth.user_id.clone(),
        amount: 0,
        status: RegistrationStatus::Confirmed,
        razorpay_order_id: None,
        razorpay_payment_id: None,
        razorpay_signature: None,
        created_at: now,
        updated_at: now,
    };

    state
        .store
        .insert_registration(registration.clone())
        .await?;

    tracing::info!(
        registration_id = %registration.id,
        event_id = %registration.event_id,
        user_id = %auth.user_id,
        "Free registration confirmed"
    );

    Ok((StatusCode::CREATED, Json(registration.into())))
}

/// List the caller's registrations, newest first.
pub async fn list_my_registrations(
    State(state): State<AppState>,
    auth: AuthContext,
) -> Result<Json<Vec<RegistrationResponse>>, AppError> {
    let registrations = state
        .store
        .list_registrations_for_user(&auth.user_id)
        .await?;
    Ok(Json(
        registrations.into_iter().map(Into::into).collect(),
    ))
}
