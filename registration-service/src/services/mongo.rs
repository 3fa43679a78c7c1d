//! MongoDB-backed registration store.

use anyhow::Result;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, Bson, DateTime};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use uuid::Uuid;

use crate::models::{Booking, Registration, RegistrationStatus};
use crate::services::store::{RegistrationStore, StoreError};

#[derive(Clone)]
pub struct MongoStore {
    registrations: Collection<Registration>,
    bookings: Collection<Booking>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            registrations: db.collection("event_registrations"),
            bookings: db.collection("temp_event_registrations"),
        }
    }

    pub async fn connect(url: &str, db_name: &str) -> Result<Self> {
        let mut client_options = ClientOptions::parse(url).await?;
        client_options.app_name = Some("registration-service".to_string());

        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);

        let store = Self::new(&db);
        store.init_indexes().await?;
        Ok(store)
    }

    /// Create the indexes that back the store's uniqueness guarantees.
    pub async fn init_indexes(&self) -> Result<()> {
        // Unique vendor order id; sparse because the free path has none.
        let order_id_index = IndexModel::builder()
            .keys(doc! { "razorpay_order_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("order_id_idx".to_string())
                    .unique(true)
                    .sparse(true)
                    .build(),
            )
            .build();

        // At most one confirmed registration per (event, user).
        let confirmed_index = IndexModel::builder()
            .keys(doc! { "event_id": 1, "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("confirmed_event_user_idx".to_string())
                    .unique(true)
                    .partial_filter_expression(doc! { "status": "CONFIRMED" })
                    .build(),
            )
            .build();

        // User-scoped listing.
        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_registrations_idx".to_string())
                    .build(),
            )
            .build();

        self.registrations
            .create_indexes([order_id_index, confirmed_index, user_index], None)
            .await?;

        let code_index = IndexModel::builder()
            .keys(doc! { "booking_code": 1 })
            .options(
                IndexOptions::builder()
                    .name("booking_code_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.bookings.create_indexes([code_index], None).await?;

        tracing::info!("Registration store indexes initialized");
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}

fn map_err(err: mongodb::error::Error) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::Duplicate
    } else {
        StoreError::Backend(anyhow::Error::new(err))
    }
}

#[async_trait]
impl RegistrationStore for MongoStore {
    async fn insert_registration(&self, registration: Registration) -> Result<(), StoreError> {
        self.registrations
            .insert_one(registration, None)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn find_registration_by_order_id(
        &self,
        order_id: &str,
    ) -> Result<Option<Registration>, StoreError> {
        let filter = doc! { "razorpay_order_id": order_id };
        self.registrations
            .find_one(filter, None)
            .await
            .map_err(map_err)
    }

    async fn confirm_registration(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Option<Registration>, StoreError> {
        let to_status = |status: RegistrationStatus| {
            to_bson(&status).map_err(|e| StoreError::Backend(e.into()))
        };

        // Guarded on `Pending` so a concurrent confirmation cannot be
        // overwritten: whichever update matches first stamps the payment
        // reference, the loser matches nothing.
        let pending = doc! {
            "razorpay_order_id": order_id,
            "status": to_status(RegistrationStatus::Pending)?,
        };
        let update = doc! {
            "$set": {
                "status": to_status(RegistrationStatus::Confirmed)?,
                "razorpay_payment_id": payment_id,
                "razorpay_signature": signature,
                "updated_at": DateTime::now(),
            }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        // The partial unique index rejects a second confirmed row for the
        // same (event, user); that surfaces here as a duplicate-key error.
        if let Some(updated) = self
            .registrations
            .find_one_and_update(pending, update, options)
            .await
            .map_err(map_err)?
        {
            return Ok(Some(updated));
        }

        // No pending row matched: the order is unknown, or it was already
        // confirmed. Re-read to tell the two apart; an already-confirmed
        // row is returned unchanged, first confirmation wins.
        self.registrations
            .find_one(doc! { "razorpay_order_id": order_id }, None)
            .await
            .map_err(map_err)
    }

    async fn list_registrations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Registration>, StoreError> {
        let filter = doc! { "user_id": user_id };
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let cursor = self
            .registrations
            .find(filter, Some(options))
            .await
            .map_err(map_err)?;
        let registrations: Vec<Registration> = cursor
            .try_collect()
            .await
            .map_err(map_err)?;
        Ok(registrations)
    }

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError> {
        self.bookings
            .insert_one(booking, None)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn find_booking_by_code(&self, code: &str) -> Result<Option<Booking>, StoreError> {
        let filter = doc! { "booking_code": code };
        self.bookings.find_one(filter, None).await.map_err(map_err)
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let id_bson = to_bson(&id).map_err(|e| StoreError::Backend(e.into()))?;
        let filter = doc! { "_id": id_bson };
        self.bookings.find_one(filter, None).await.map_err(map_err)
    }

    async fn set_check_in(
        &self,
        id: Uuid,
        checked_in: bool,
        checked_in_at: Option<DateTime>,
    ) -> Result<Option<Booking>, StoreError> {
        let id_bson = to_bson(&id).map_err(|e| StoreError::Backend(e.into()))?;
        let filter = doc! { "_id": id_bson };

        let at = match checked_in_at {
            Some(ts) => Bson::DateTime(ts),
            None => Bson::Null,
        };
        let update = doc! {
            "$set": {
                "checked_in": checked_in,
                "checked_in_at": at,
            }
        };

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        self.bookings
            .find_one_and_update(filter, update, options)
            .await
            .map_err(map_err)
    }
}
