//! Orders domain module.
//!
//! The order state machine, implemented purely as deterministic domain logic
//! (no IO, no stock bookkeeping, no storage). Stock side effects of a
//! transition are the caller's job.

pub mod order;
pub mod promo;
pub mod status;

pub use order::{
    ChangeStatus, Order, OrderCommand, OrderEvent, OrderItem, OrderPlaced, PlaceOrder,
    StatusChanged,
};
pub use promo::{NoPromo, PromoPolicy};
pub use status::{DeliveryType, OrderStatus, PaymentType, StatusAction};
