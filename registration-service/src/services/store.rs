//! Persistence seam for registrations and bookings.
//!
//! Handlers and services talk to [`RegistrationStore`]; the production
//! implementation is MongoDB-backed ([`super::MongoStore`]), tests and
//! local development use [`super::MemoryStore`]. The trait is where the
//! store's two correctness guarantees live:
//!
//! - at most one `Confirmed` registration per `(event_id, user_id)`,
//!   surfaced as [`StoreError::Duplicate`];
//! - confirmation is keyed by the vendor order id, so repeated
//!   confirmations of the same order are idempotent.

use async_trait::async_trait;
use mongodb::bson::DateTime;
use uuid::Uuid;

use crate::models::{Booking, Registration};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (duplicate confirmed
    /// registration, order id, or booking code).
    #[error("uniqueness constraint violated")]
    Duplicate,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Insert a registration row. Fails with [`StoreError::Duplicate`] if a
    /// confirmed registration already exists for the same (event, user), or
    /// if the order id is already taken.
    async fn insert_registration(&self, registration: Registration) -> Result<(), StoreError>;

    async fn find_registration_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Registration>, StoreError>;

    /// Transition the registration carrying `order_id` to `Confirmed`,
    /// stamping the payment id, signature, and updated-time.
    ///
    /// Returns `Ok(None)` when no registration carries the order id. An
    /// already-confirmed row is returned unchanged (no-op, the original
    /// confirmation is preserved). A second confirmation for the same
    /// (event, user) fails with [`StoreError::Duplicate`].
    async fn confirm_registration(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Option<Registration>, StoreError>;

    /// List a user's registrations, newest first.
    async fn list_registrations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Registration>, StoreError>;

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError>;

    /// Lookup by booking code. Callers are expected to normalize the code
    /// first (see [`crate::utils::normalize_booking_code`]).
    async fn find_booking_by_code(&self, code: &str) -> Result<Option<Booking>, StoreError>;

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError>;

    /// Write `checked_in` and `checked_in_at` together, atomically, in
    /// either direction. Returns the updated booking, or `None` if the id
    /// is unknown.
    async fn set_check_in(
        &self,
        id: Uuid,
        checked_in: bool,
        checked_in_at: Option<DateTime>,
    ) -> Result<Option<Booking>, StoreError>;
}
