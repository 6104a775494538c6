use serde::{Deserialize, Serialize};

use storefront_core::{AvailabilityId, DomainError, DomainResult, Entity, ProductId, ShopId};

/// On-hand stock of one product at one shop.
///
/// `amount` is never decremented by a reservation alone; only a commit (order
/// finished) or an explicit adjustment changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub id: AvailabilityId,
    pub product: ProductId,
    pub shop: ShopId,
    pub amount: i64,
}

impl Availability {
    pub fn new(id: AvailabilityId, product: ProductId, shop: ShopId, amount: i64) -> DomainResult<Self> {
        if amount < 0 {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        Ok(Self {
            id,
            product,
            shop,
            amount,
        })
    }
}

impl Entity for Availability {
    type Id = AvailabilityId;
    const NAME: &'static str = "availability";

    fn id(&self) -> AvailabilityId {
        self.id
    }
}
