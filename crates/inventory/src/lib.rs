//! Inventory domain module: availability rows, reservations and the slot that
//! keeps them consistent.
//!
//! Pure domain logic (no IO, no locks, no storage).

pub mod availability;
pub mod reservation;
pub mod slot;

pub use availability::Availability;
pub use reservation::{Reservation, ReserveRequest};
pub use slot::{Committed, StockSlot};
