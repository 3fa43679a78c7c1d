use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::store::StoreError;

/// Application error taxonomy.
///
/// Every failure a handler can produce maps to one of these variants, each
/// carrying a stable machine-readable `reason` alongside the human message.
/// Clients branch on `reason`, humans read `error`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Missing required fields: {0}")]
    MissingFields(&'static str),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Forbidden: {0}")]
    Forbidden(anyhow::Error),

    #[error("Invalid payment signature")]
    SignatureMismatch,

    #[error("Registration not found for order {0}")]
    RegistrationNotFound(String),

    #[error("No booking found for code {0}")]
    BookingNotFound(String),

    #[error("Already registered for this event")]
    AlreadyRegistered,

    #[error("Payment gateway not configured")]
    GatewayNotConfigured,

    #[error("Payment gateway error: {0}")]
    Gateway(anyhow::Error),

    /// Store write failure after a verified payment. The message carries the
    /// payment reference so a human operator can reconcile manually.
    #[error("Failed to confirm registration for payment {payment_id}")]
    UpdateFailed {
        payment_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Store error: {0}")]
    Store(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-checkable reason string for this error.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_failed",
            AppError::MissingFields(_) => "missing_fields",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden(_) => "admin_required",
            AppError::SignatureMismatch => "invalid_signature",
            AppError::RegistrationNotFound(_) => "registration_not_found",
            AppError::BookingNotFound(_) => "booking_not_found",
            AppError::AlreadyRegistered => "already_registered",
            AppError::GatewayNotConfigured => "gateway_not_configured",
            AppError::Gateway(_) => "gateway_error",
            AppError::UpdateFailed { .. } => "update_failed",
            AppError::Store(_) => "store_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::MissingFields(_)
            | AppError::SignatureMismatch => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RegistrationNotFound(_) | AppError::BookingNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::AlreadyRegistered => StatusCode::CONFLICT,
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::GatewayNotConfigured
            | AppError::UpdateFailed { .. }
            | AppError::Store(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AppError::AlreadyRegistered,
            StoreError::Backend(e) => AppError::Store(e),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            reason: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let reason = self.reason();
        let status = self.status_code();

        let (error, details) = match &self {
            AppError::Validation(errs) => {
                ("Validation error".to_string(), Some(errs.to_string()))
            }
            AppError::Store(e) => ("Store error".to_string(), Some(e.to_string())),
            AppError::Internal(e) => {
                ("Internal server error".to_string(), Some(e.to_string()))
            }
            other => (other.to_string(), None),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                reason,
                details,
            }),
        )
            .into_response()
    }
}
