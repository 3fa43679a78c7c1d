//! Walk-up bookings and the staff check-in console.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::models::Booking;
use crate::services::{RegistrationStore, StoreError};
use crate::utils;
use crate::AppState;

/// How many times to retry on a booking-code collision before giving up.
const CODE_RETRIES: usize = 5;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 10, message = "Phone number must have at least 10 digits"))]
    pub phone: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    /// Set when the booking was paid for.
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub booking_code: String,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub checked_in: bool,
    pub checked_in_at: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub created_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            booking_code: b.booking_code,
            name: b.name,
            phone_number: b.phone_number,
            email: b.email,
            checked_in: b.checked_in,
            checked_in_at: b.checked_in_at.map(|ts| ts.to_string()),
            razorpay_payment_id: b.razorpay_payment_id,
            created_at: b.created_at.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateBookingResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    /// The string encoded into the scannable QR (`BJC:<code>`).
    pub qr_payload: String,
    /// Base64 PNG of the QR code.
    pub qr_image_base64: String,
}

/// Insert the booking, rolling a fresh code on a code collision.
///
/// The code space holds 31^6 values, so exhausting the retry budget means
/// the store is rejecting inserts for some other reason; that surfaces as
/// a store failure, never as an already-registered conflict.
async fn insert_with_fresh_code(
    store: &dyn RegistrationStore,
    mut booking: Booking,
) -> Result<Booking, AppError> {
    let mut attempts = 0;
    loop {
        match store.insert_booking(booking.clone()).await {
            Ok(()) => return Ok(booking),
            Err(StoreError::Duplicate) if attempts < CODE_RETRIES => {
                attempts += 1;
                booking.booking_code = utils::generate_booking_code();
            }
            Err(StoreError::Duplicate) => {
                return Err(AppError::Store(anyhow::anyhow!(
                    "booking code collided {CODE_RETRIES} times in a row"
                )))
            }
            Err(e) => return Err(e.into()),
        }
    }
}

pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<CreateBookingResponse>), AppError> {
    payload.validate()?;

    let phone = payload.phone.trim().to_string();
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 10 {
        let mut error = validator::ValidationError::new("phone_digits");
        error.message = Some("Phone number must contain at least 10 digits".into());
        let mut errors = validator::ValidationErrors::new();
        errors.add("phone", error);
        return Err(errors.into());
    }

    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    let booking = Booking {
        id: Uuid::new_v4(),
        booking_code: utils::generate_booking_code(),
        name,
        phone_number: phone,
        email,
        checked_in: false,
        checked_in_at: None,
        razorpay_payment_id: payload.payment_id,
        created_at: DateTime::now(),
    };

    let booking = insert_with_fresh_code(state.store.as_ref(), booking).await?;

    tracing::info!(
        booking_id = %booking.id,
        booking_code = %booking.booking_code,
        "Booking created"
    );

    let qr_payload = utils::qr_payload(&booking.booking_code);
    let qr_image_base64 = utils::generate_qr_base64(&qr_payload)?;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking: booking.into(),
            qr_payload,
            qr_image_base64,
        }),
    ))
}

/// Staff lookup by booking code. Accepts the typed code or the scanned
/// `BJC:`-prefixed payload, any case.
pub async fn lookup_booking(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(code): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    auth.require_admin()?;

    let normalized = utils::normalize_booking_code(&code);
    let booking = state
        .store
        .find_booking_by_code(&normalized)
        .await?
        .ok_or_else(|| AppError::BookingNotFound(normalized))?;

    Ok(Json(booking.into()))
}

/// Mark a booking as checked in.
///
/// Repeat check-in is a no-op that returns the current state; the original
/// `checked_in_at` is preserved, so the door record keeps the first entry
/// time.
pub async fn check_in(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    auth.require_admin()?;

    let booking = state
        .store
        .find_booking(id)
        .await?
        .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;

    if booking.checked_in {
        return Ok(Json(booking.into()));
    }

    let updated = state
        .store
        .set_check_in(id, true, Some(DateTime::now()))
        .await?
        .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;

    tracing::info!(booking_id = %id, name = %updated.name, "Booking checked in");
    Ok(Json(updated.into()))
}

/// Reverse a check-in: both fields are cleared together. Idempotent.
pub async fn undo_check_in(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    auth.require_admin()?;

    let booking = state
        .store
        .find_booking(id)
        .await?
        .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;

    if !booking.checked_in {
        return Ok(Json(booking.into()));
    }

    let updated = state
        .store
        .set_check_in(id, false, None)
        .await?
        .ok_or_else(|| AppError::BookingNotFound(id.to_string()))?;

    tracing::info!(booking_id = %id, "Check-in undone");
    Ok(Json(updated.into()))
}
