//! Basket service: per-user wish-list rows, no stock guarantee.

use std::sync::Arc;

use tracing::debug;

use storefront_basket::{Basket, BasketEntry};
use storefront_core::{Clock, DomainResult, ProductId, UserId};

use crate::catalog::InMemoryCatalog;
use crate::store::InMemoryTable;

pub struct BasketService {
    clock: Arc<dyn Clock>,
    catalog: Arc<InMemoryCatalog>,
    baskets: InMemoryTable<Basket>,
}

impl core::fmt::Debug for BasketService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BasketService").finish_non_exhaustive()
    }
}

impl BasketService {
    pub fn new(clock: Arc<dyn Clock>, catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            clock,
            catalog,
            baskets: InMemoryTable::new(),
        }
    }

    /// Add `amount` of `product`, increasing an existing row. Stock is not checked.
    pub fn add(&self, user: UserId, product: ProductId, amount: i64) -> DomainResult<BasketEntry> {
        self.catalog.get_product(product)?;
        let now = self.clock.now();
        let entry = self.baskets.update_or_insert(
            user,
            || Basket::empty(user),
            |basket| basket.add(product, amount, now),
        )?;
        debug!(user = %user, product = %product, amount = entry.amount, "basket entry added");
        Ok(entry)
    }

    pub fn set_amount(
        &self,
        user: UserId,
        product: ProductId,
        amount: i64,
    ) -> DomainResult<BasketEntry> {
        let now = self.clock.now();
        self.baskets.update_or_insert(
            user,
            || Basket::empty(user),
            |basket| basket.set_amount(product, amount, now),
        )
    }

    pub fn remove(&self, user: UserId, product: ProductId) -> DomainResult<BasketEntry> {
        let now = self.clock.now();
        self.baskets.update_or_insert(
            user,
            || Basket::empty(user),
            |basket| basket.remove(product, now),
        )
    }

    pub fn clear(&self, user: UserId) -> DomainResult<()> {
        let now = self.clock.now();
        self.baskets.update_or_insert(
            user,
            || Basket::empty(user),
            |basket| {
                basket.clear(now);
                Ok(())
            },
        )
    }

    pub fn list(&self, user: UserId) -> Vec<BasketEntry> {
        self.baskets
            .get(user)
            .map(|basket| basket.entries().to_vec())
            .unwrap_or_default()
    }

    /// Take ordered quantities out of the basket after a successful checkout.
    pub fn subtract(&self, user: UserId, ordered: &[BasketEntry]) -> DomainResult<()> {
        let now = self.clock.now();
        self.baskets.update_or_insert(
            user,
            || Basket::empty(user),
            |basket| {
                basket.subtract(ordered, now);
                Ok(())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use storefront_auth::{Actor, RoleRegistry};
    use storefront_catalog::NewProduct;
    use storefront_core::{DomainError, ManualClock};

    use crate::reservations::ReservationManager;

    fn service() -> (BasketService, ProductId) {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Utc::now()));
        let stock = Arc::new(ReservationManager::new(clock.clone(), Duration::minutes(15)));
        let catalog = Arc::new(InMemoryCatalog::new(
            clock.clone(),
            Arc::new(RoleRegistry::new()),
            stock,
            "https://img.example.com",
        ));
        let category = catalog.add_category(Actor::System, "Coal", false).unwrap();
        let product = catalog
            .add_product(Actor::System, NewProduct::new("Coconut coal 1kg", 600, category.id))
            .unwrap();
        (BasketService::new(clock, catalog), product.id)
    }

    #[test]
    fn add_upserts_without_checking_stock() {
        let (baskets, product) = service();
        let user = UserId::new();
        baskets.add(user, product, 2).unwrap();
        let entry = baskets.add(user, product, 1_000).unwrap();
        assert_eq!(entry.amount, 1_002);
        assert_eq!(baskets.list(user), vec![entry]);
    }

    #[test]
    fn add_rejects_unknown_product_and_bad_amount() {
        let (baskets, product) = service();
        let user = UserId::new();
        assert!(matches!(
            baskets.add(user, ProductId::new(), 1),
            Err(DomainError::NotFound { entity: "product", .. })
        ));
        assert!(matches!(baskets.add(user, product, 0), Err(DomainError::Validation(_))));
        assert!(baskets.list(user).is_empty());
    }

    #[test]
    fn set_remove_and_clear() {
        let (baskets, product) = service();
        let user = UserId::new();
        assert!(baskets.set_amount(user, product, 3).is_err());

        baskets.add(user, product, 1).unwrap();
        assert_eq!(baskets.set_amount(user, product, 3).unwrap().amount, 3);
        baskets.remove(user, product).unwrap();
        assert!(baskets.list(user).is_empty());

        baskets.add(user, product, 1).unwrap();
        baskets.clear(user).unwrap();
        assert!(baskets.list(user).is_empty());
    }

    #[test]
    fn baskets_are_per_user() {
        let (baskets, product) = service();
        let (a, b) = (UserId::new(), UserId::new());
        baskets.add(a, product, 1).unwrap();
        assert!(baskets.list(b).is_empty());
    }

    #[test]
    fn rejected_edits_do_not_create_a_basket() {
        let (baskets, product) = service();
        let user = UserId::new();
        assert!(baskets.remove(user, product).is_err());
        assert!(baskets.set_amount(user, product, 2).is_err());
        assert!(!baskets.baskets.contains(user));
    }
}
