//! In-memory registration store.
//!
//! Backs the `memory` store backend, used by the integration tests and for
//! running the service locally without a MongoDB instance. Enforces the
//! same uniqueness rules as the Mongo indexes.

use async_trait::async_trait;
use mongodb::bson::DateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{Booking, Registration, RegistrationStatus};
use crate::services::store::{RegistrationStore, StoreError};

#[derive(Default)]
struct Inner {
    registrations: Vec<Registration>,
    bookings: Vec<Booking>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_other_confirmed(
    registrations: &[Registration],
    event_id: &str,
    user_id: &str,
    excluding: Uuid,
) -> bool {
    registrations.iter().any(|r| {
        r.id != excluding
            && r.event_id == event_id
            && r.user_id == user_id
            && r.status == RegistrationStatus::Confirmed
    })
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn insert_registration(&self, registration: Registration) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        if let Some(order_id) = &registration.razorpay_order_id {
            if inner
                .registrations
                .iter()
                .any(|r| r.razorpay_order_id.as_deref() == Some(order_id))
            {
                return Err(StoreError::Duplicate);
            }
        }
        if registration.status == RegistrationStatus::Confirmed
            && has_other_confirmed(
                &inner.registrations,
                &registration.event_id,
                &registration.user_id,
                registration.id,
            )
        {
            return Err(StoreError::Duplicate);
        }

        inner.registrations.push(registration);
        Ok(())
    }

    async fn find_registration_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Registration>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .registrations
            .iter()
            .find(|r| r.razorpay_order_id.as_deref() == Some(order_id))
            .cloned())
    }

    async fn confirm_registration(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Option<Registration>, StoreError> {
        let mut inner = self.inner.lock().await;

        let Some(index) = inner
            .registrations
            .iter()
            .position(|r| r.razorpay_order_id.as_deref() == Some(order_id))
        else {
            return Ok(None);
        };

        if inner.registrations[index].status == RegistrationStatus::Confirmed {
            return Ok(Some(inner.registrations[index].clone()));
        }

        let (event_id, user_id, id) = {
            let r = &inner.registrations[index];
            (r.event_id.clone(), r.user_id.clone(), r.id)
        };
        if has_other_confirmed(&inner.registrations, &event_id, &user_id, id) {
            return Err(StoreError::Duplicate);
        }

        let registration = &mut inner.registrations[index];
        registration.status = RegistrationStatus::Confirmed;
        registration.razorpay_payment_id = Some(payment_id.to_string());
        registration.razorpay_signature = Some(signature.to_string());
        registration.updated_at = DateTime::now();
        Ok(Some(registration.clone()))
    }

    async fn list_registrations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Registration>, StoreError> {
        let inner = self.inner.lock().await;
        let mut registrations: Vec<Registration> = inner
            .registrations
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        registrations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(registrations)
    }

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner
            .bookings
            .iter()
            .any(|b| b.booking_code == booking.booking_code)
        {
            return Err(StoreError::Duplicate);
        }
        inner.bookings.push(booking);
        Ok(())
    }

    async fn find_booking_by_code(&self, code: &str) -> Result<Option<Booking>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .bookings
            .iter()
            .find(|b| b.booking_code == code)
            .cloned())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn set_check_in(
        &self,
        id: Uuid,
        checked_in: bool,
        checked_in_at: Option<DateTime>,
    ) -> Result<Option<Booking>, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(booking) = inner.bookings.iter_mut().find(|b| b.id == id) else {
            return Ok(None);
        };
        booking.checked_in = checked_in;
        booking.checked_in_at = checked_in_at;
        Ok(Some(booking.clone()))
    }
}
