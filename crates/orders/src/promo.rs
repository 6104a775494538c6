//! Promo/discount hook.
//!
//! Discount rules are not implemented; the order workflow calls this seam so a
//! pricing engine can be plugged in later.

use crate::OrderItem;

pub trait PromoPolicy: Send + Sync {
    /// Final order sum for the given subtotal (smallest currency unit).
    fn apply(&self, subtotal: u64, items: &[OrderItem]) -> u64;
}

/// No discounts: the order sum is the subtotal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPromo;

impl PromoPolicy for NoPromo {
    fn apply(&self, subtotal: u64, _items: &[OrderItem]) -> u64 {
        subtotal
    }
}
