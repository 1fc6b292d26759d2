//! # Domain Models
//!
//! Order records, queued payment events, and the tagged response envelope
//! that every read-path operation returns.

pub mod order;
pub mod payment_event;
pub mod response;

pub use order::{Order, OrderStatus};
pub use payment_event::{PaymentEvent, DEAD_LETTER_MARKER};
pub use response::{ApiResponse, Provenance};
