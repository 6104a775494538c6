use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{
    AvailabilityId, Entity, OrderId, ProductId, ReservationId, ShopId, UserId,
};

/// A hold of `amount` units against one availability row.
///
/// `order` is `None` for a soft hold and `Some` once the hold belongs to an
/// order's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub user: UserId,
    pub product: ProductId,
    pub shop: ShopId,
    pub availability: AvailabilityId,
    pub order: Option<OrderId>,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_bound(&self) -> bool {
        self.order.is_some()
    }

    /// Soft holds expire `ttl` after creation; bound holds never do.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        !self.is_bound() && self.created_at + ttl <= now
    }
}

impl Entity for Reservation {
    type Id = ReservationId;
    const NAME: &'static str = "reservation";

    fn id(&self) -> ReservationId {
        self.id
    }
}

/// Input for a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveRequest {
    pub user: UserId,
    pub product: ProductId,
    pub shop: ShopId,
    pub amount: i64,
    pub order: Option<OrderId>,
}

impl ReserveRequest {
    pub fn soft(user: UserId, product: ProductId, shop: ShopId, amount: i64) -> Self {
        Self {
            user,
            product,
            shop,
            amount,
            order: None,
        }
    }

    pub fn for_order(mut self, order: OrderId) -> Self {
        self.order = Some(order);
        self
    }
}
