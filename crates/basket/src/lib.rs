//! Basket domain module.
//!
//! A basket is a per-user wish list. Amounts are never checked against stock
//! here; stock is only checked when an order is placed.

pub mod basket;

pub use basket::{Basket, BasketEntry};
