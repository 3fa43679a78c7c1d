pub mod memory;
pub mod mongo;
pub mod orders;
pub mod razorpay;
pub mod store;
pub mod verifier;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use orders::{OrderCreated, OrderInitiator};
pub use razorpay::{PaymentConfirmation, RazorpayClient};
pub use store::{RegistrationStore, StoreError};
pub use verifier::PaymentVerifier;
