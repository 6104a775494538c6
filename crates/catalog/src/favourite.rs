use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Entity, FavouriteId, ProductId, UserId};

/// A product a user has liked. At most one per (user, product).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favourite {
    pub id: FavouriteId,
    pub user: UserId,
    pub product: ProductId,
    pub created_at: DateTime<Utc>,
}

impl Favourite {
    pub fn new(id: FavouriteId, user: UserId, product: ProductId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user,
            product,
            created_at,
        }
    }

    pub fn is(&self, user: UserId, product: ProductId) -> bool {
        self.user == user && self.product == product
    }
}

impl Entity for Favourite {
    type Id = FavouriteId;
    const NAME: &'static str = "favourite";

    fn id(&self) -> FavouriteId {
        self.id
    }
}
