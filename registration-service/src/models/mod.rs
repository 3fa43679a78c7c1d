use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registration links a signed-in user to an event, with payment status.
///
/// Rows are created `Pending` by the order initiator (paid events) or
/// inserted directly as `Confirmed` with a zero amount (free events).
/// Only the payment verifier advances `status` to `Confirmed`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Registration {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub event_id: String,
    pub user_id: String,
    /// Amount in the smallest currency unit (paise for INR).
    pub amount: i64,
    pub status: RegistrationStatus,
    /// Vendor order id, unique per registration. Absent on the free path,
    /// where no gateway order exists.
    pub razorpay_order_id: Option<String>,
    /// Populated only at confirmation.
    pub razorpay_payment_id: Option<String>,
    /// Populated only at confirmation.
    pub razorpay_signature: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    Pending,
    Confirmed,
    Failed,
}

/// A walk-up booking identified by a short human-typeable code instead of
/// a user account. Staff flip `checked_in` at the door, reversibly.
///
/// Invariant: `checked_in_at` is non-null iff `checked_in` is true. The two
/// fields are always written together.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Generated at insert time, immutable thereafter.
    pub booking_code: String,
    pub name: String,
    pub phone_number: String,
    pub email: String,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime>,
    /// Set when the booking required payment.
    pub razorpay_payment_id: Option<String>,
    pub created_at: DateTime,
}
