//! Registration attempt orchestration.
//!
//! Drives one user-visible registration attempt end to end:
//!
//! ```text
//! Idle -> Submitting -> AwaitingGateway -> Verifying -> Success | Failed
//!                   \-> Success (free events skip the gateway)
//!          AwaitingGateway -> Cancelled (user dismissed the widget)
//! ```
//!
//! The hosted checkout widget is vendor-controlled UI; it sits behind the
//! narrow [`CheckoutGateway`] port so the orchestration is testable with a
//! fake. Verification is never retried automatically: a failed verify after
//! a charge surfaces the payment id for manual reconciliation instead.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use mongodb::bson::DateTime;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::models::{Registration, RegistrationStatus};
use crate::services::orders::OrderInitiator;
use crate::services::razorpay::PaymentConfirmation;
use crate::services::store::{RegistrationStore, StoreError};
use crate::services::verifier::PaymentVerifier;

/// Checkout widget configuration, mirroring the vendor's contract.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Gateway public key.
    pub key: String,
    /// Amount in smallest currency unit.
    pub amount: i64,
    pub currency: String,
    pub order_id: String,
    pub prefill: Prefill,
}

#[derive(Debug, Clone)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// What the widget session ends with.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    /// Successful charge; the widget's handler callback fired.
    Completed(PaymentConfirmation),
    /// The user dismissed the widget. No charge, no server call.
    Cancelled,
}

/// Port over the hosted checkout widget.
///
/// The real widget is loaded at runtime in the browser; this service only
/// ever sees it through this interface, which tests satisfy with a fake.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn open_checkout(&self, config: CheckoutConfig) -> anyhow::Result<CheckoutOutcome>;
}

/// Contact form fields, validated before any network call.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Terminal state of one registration attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// Registration confirmed; for paid events the payment id is set.
    Success { registration: Registration },
    /// Local form validation failed; nothing was sent anywhere.
    Invalid(Vec<FieldError>),
    /// User dismissed the checkout widget. Retryable from idle.
    Cancelled,
    /// The attempt failed. When a charge may have gone through,
    /// `payment_id` is set so a human can reconcile.
    Failed {
        reason: &'static str,
        payment_id: Option<String>,
    },
}

pub fn validate_form(form: &RegistrationForm) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if form.name.trim().is_empty() {
        errors.push(FieldError {
            field: "name",
            message: "Name is required",
        });
    }
    if !form.email.validate_email() {
        errors.push(FieldError {
            field: "email",
            message: "Enter a valid email address",
        });
    }
    let digits = form.phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits < 10 {
        errors.push(FieldError {
            field: "phone",
            message: "Enter a valid phone number",
        });
    }
    errors
}

/// Drives registration attempts for one session.
///
/// At most one attempt per event is in flight at a time; a second submit
/// for the same event while its attempt runs is refused, while other
/// events proceed independently. This mirrors the per-event disabled
/// submit button in the UI and is advisory only — the store's uniqueness
/// constraint is the real guard against duplicate confirmed registrations.
pub struct RegistrationFlow {
    orders: OrderInitiator,
    verifier: PaymentVerifier,
    store: Arc<dyn RegistrationStore>,
    checkout: Arc<dyn CheckoutGateway>,
    in_flight: Mutex<HashSet<String>>,
}

impl RegistrationFlow {
    pub fn new(
        orders: OrderInitiator,
        verifier: PaymentVerifier,
        store: Arc<dyn RegistrationStore>,
        checkout: Arc<dyn CheckoutGateway>,
    ) -> Self {
        Self {
            orders,
            verifier,
            store,
            checkout,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Run one attempt to register `auth` for `event_id` at `amount` paise.
    /// A zero amount takes the free path and never touches the gateway.
    pub async fn run(
        &self,
        auth: &AuthContext,
        event_id: &str,
        amount: i64,
        form: &RegistrationForm,
    ) -> AttemptOutcome {
        let errors = validate_form(form);
        if !errors.is_empty() {
            return AttemptOutcome::Invalid(errors);
        }

        if !self.in_flight.lock().await.insert(event_id.to_string()) {
            return AttemptOutcome::Failed {
                reason: "attempt_in_flight",
                payment_id: None,
            };
        }
        let outcome = self.run_inner(auth, event_id, amount, form).await;
        self.in_flight.lock().await.remove(event_id);
        outcome
    }

    async fn run_inner(
        &self,
        auth: &AuthContext,
        event_id: &str,
        amount: i64,
        form: &RegistrationForm,
    ) -> AttemptOutcome {
        if amount == 0 {
            return self.register_free(auth, event_id).await;
        }

        // Submitting -> AwaitingGateway
        let order = match self.orders.create_order(auth, event_id, amount).await {
            Ok(order) => order,
            Err(e) => {
                return AttemptOutcome::Failed {
                    reason: e.reason(),
                    payment_id: None,
                }
            }
        };

        let config = CheckoutConfig {
            key: order.key_id,
            amount: order.amount,
            currency: "INR".to_string(),
            order_id: order.order_id,
            prefill: Prefill {
                name: form.name.trim().to_string(),
                email: form.email.trim().to_lowercase(),
                contact: form.phone.trim().to_string(),
            },
        };

        let confirmation = match self.checkout.open_checkout(config).await {
            Ok(CheckoutOutcome::Completed(confirmation)) => confirmation,
            Ok(CheckoutOutcome::Cancelled) => return AttemptOutcome::Cancelled,
            Err(e) => {
                tracing::error!(error = %e, "Checkout widget failed to open");
                return AttemptOutcome::Failed {
                    reason: "gateway_error",
                    payment_id: None,
                };
            }
        };

        // AwaitingGateway -> Verifying. From here on money may have moved,
        // so every failure carries the payment id.
        let payment_id = confirmation.razorpay_payment_id.clone();
        match self.verifier.verify(auth, &confirmation).await {
            Ok(registration) => AttemptOutcome::Success { registration },
            Err(e) => AttemptOutcome::Failed {
                reason: e.reason(),
                payment_id: Some(payment_id),
            },
        }
    }

    async fn register_free(&self, auth: &AuthContext, event_id: &str) -> AttemptOutcome {
        let now = DateTime::now();
        let registration = Registration {
            id: Uuid::new_v4(),
            event_id: event_id.to_string(),
            user_id: auth.user_id.clone(),
            amount: 0,
            status: RegistrationStatus::Confirmed,
            razorpay_order_id: None,
            razorpay_payment_id: None,
            razorpay_signature: None,
            created_at: now,
            updated_at: now,
        };
        match self.store.insert_registration(registration.clone()).await {
            Ok(()) => AttemptOutcome::Success { registration },
            Err(StoreError::Duplicate) => AttemptOutcome::Failed {
                reason: AppError::AlreadyRegistered.reason(),
                payment_id: None,
            },
            Err(StoreError::Backend(e)) => {
                tracing::error!(error = %e, "Free registration insert failed");
                AttemptOutcome::Failed {
                    reason: "store_error",
                    payment_id: None,
                }
            }
        }
    }
}
