//! Order workflow: places orders against held stock and drives status changes.
//!
//! Each operation authorizes the actor first, then works under the order's
//! keyed lock. A finish commits stock before the new status is saved, so a
//! failed commit leaves the order exactly as it was; if the save fails instead,
//! the ledger's commit record lets a retried finish go through without
//! committing again. A cancel saves first and releases afterwards.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use storefront_auth::{authorize, authorize_owner_or, Actor, Permission, PermissionGate};
use storefront_basket::BasketEntry;
use storefront_core::{
    Aggregate, AggregateRoot, Clock, DomainError, DomainResult, ExpectedVersion, OrderId,
    ReservationId, ShopId, StockShortage, UserId,
};
use storefront_orders::{
    ChangeStatus, DeliveryType, NoPromo, Order, OrderCommand, OrderEvent, OrderItem, OrderStatus,
    PaymentType, PlaceOrder, PromoPolicy, StatusAction,
};

use crate::basket::BasketService;
use crate::catalog::InMemoryCatalog;
use crate::locks::KeyedLocks;
use crate::orders::{OrderStore, StoredOrderEvent};
use crate::reservations::ReservationManager;

pub struct OrderWorkflow {
    clock: Arc<dyn Clock>,
    gate: Arc<dyn PermissionGate>,
    catalog: Arc<InMemoryCatalog>,
    stock: Arc<ReservationManager>,
    baskets: Arc<BasketService>,
    orders: Arc<dyn OrderStore>,
    promo: Arc<dyn PromoPolicy>,
    locks: KeyedLocks<OrderId>,
}

impl core::fmt::Debug for OrderWorkflow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OrderWorkflow").finish_non_exhaustive()
    }
}

impl OrderWorkflow {
    pub fn new(
        clock: Arc<dyn Clock>,
        gate: Arc<dyn PermissionGate>,
        catalog: Arc<InMemoryCatalog>,
        stock: Arc<ReservationManager>,
        baskets: Arc<BasketService>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            clock,
            gate,
            catalog,
            stock,
            baskets,
            orders,
            promo: Arc::new(NoPromo),
            locks: KeyedLocks::new(),
        }
    }

    pub fn with_promo(mut self, promo: Arc<dyn PromoPolicy>) -> Self {
        self.promo = promo;
        self
    }

    /// Reserve stock for every line and create the order, or hold nothing.
    ///
    /// Duplicate product lines are merged. A product without a stock row at
    /// `shop` counts as out of stock. When any line is short, every hold made
    /// here is released and the error lists all short lines.
    #[tracing::instrument(skip(self, items), fields(lines = items.len()))]
    pub fn place_order(
        &self,
        actor: Actor,
        user: UserId,
        shop: ShopId,
        items: &[BasketEntry],
        delivery_type: DeliveryType,
        payment_type: PaymentType,
    ) -> DomainResult<Order> {
        authorize_owner_or(&*self.gate, actor, user, &Permission::ORDERS_MANAGE)?;
        self.catalog.get_shop(shop)?;

        let lines = merge_lines(items)?;
        let mut order_items = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = self.catalog.get_product(line.product)?;
            order_items.push(OrderItem {
                product: product.id,
                price: product.price,
                amount: line.amount,
            });
        }
        let subtotal = OrderItem::subtotal(&order_items)
            .ok_or_else(|| DomainError::validation("order sum overflows"))?;

        let order_id = OrderId::new();
        let mut held: Vec<ReservationId> = Vec::with_capacity(lines.len());
        let mut short: Vec<StockShortage> = Vec::new();

        for line in &lines {
            match self
                .stock
                .reserve_for_order(order_id, user, line.product, shop, line.amount)
            {
                Ok(reservation) => held.push(reservation.id),
                Err(DomainError::InsufficientStock(shortage)) => short.push(shortage),
                Err(DomainError::NotFound { entity: "availability", .. }) => {
                    short.push(StockShortage {
                        product: line.product,
                        shop,
                        requested: line.amount,
                        available: 0,
                    })
                }
                Err(e) => {
                    self.stock.release_all(&held);
                    return Err(e);
                }
            }
        }

        if !short.is_empty() {
            self.stock.release_all(&held);
            warn!(order = %order_id, short = short.len(), "order placement failed, holds released");
            return Err(DomainError::OrderPlacementFailed {
                reason: "insufficient stock".to_string(),
                failed_items: short,
            });
        }

        let command = OrderCommand::Place(PlaceOrder {
            order_id,
            user,
            shop,
            delivery_type,
            payment_type,
            sum: self.promo.apply(subtotal, &order_items),
            items: order_items,
            reservations: held.clone(),
            occurred_at: self.clock.now(),
        });

        let placed = self.locks.with_lock(&order_id, || {
            let mut order = Order::empty(order_id);
            let events = order.handle(&command)?;
            for event in &events {
                order.apply(event);
            }
            self.orders.save(&order, ExpectedVersion::Exact(0), &events)?;
            Ok::<_, DomainError>(order)
        });

        match placed.and_then(|r| r) {
            Ok(order) => {
                info!(
                    order = %order_id,
                    user = %user,
                    shop = %shop,
                    status = %order.status(),
                    sum = order.sum(),
                    "order placed"
                );
                Ok(order)
            }
            Err(e) => {
                self.stock.release_all(&held);
                Err(e)
            }
        }
    }

    /// Place an order from the user's basket and take the ordered rows out of it.
    #[tracing::instrument(skip(self))]
    pub fn checkout(
        &self,
        actor: Actor,
        user: UserId,
        shop: ShopId,
        delivery_type: DeliveryType,
        payment_type: PaymentType,
    ) -> DomainResult<Order> {
        authorize_owner_or(&*self.gate, actor, user, &Permission::ORDERS_MANAGE)?;

        let entries = self.baskets.list(user);
        if entries.is_empty() {
            return Err(DomainError::validation("basket is empty"));
        }

        let order = self.place_order(actor, user, shop, &entries, delivery_type, payment_type)?;
        if let Err(e) = self.baskets.subtract(user, &entries) {
            warn!(order = %order.id_typed(), error = %e, "order placed but basket not updated");
        }
        Ok(order)
    }

    /// `awaiting_payment -> forming`.
    #[tracing::instrument(skip(self))]
    pub fn confirm_payment(&self, actor: Actor, order: OrderId) -> DomainResult<Order> {
        self.transition(actor, order, StatusAction::ConfirmPayment)
    }

    /// `forming -> waiting_to_receive`.
    #[tracing::instrument(skip(self))]
    pub fn mark_ready(&self, actor: Actor, order: OrderId) -> DomainResult<Order> {
        self.transition(actor, order, StatusAction::MarkReady)
    }

    /// Hand over: delivery orders go out, pickup orders finish on the spot.
    #[tracing::instrument(skip(self))]
    pub fn dispatch(&self, actor: Actor, order: OrderId) -> DomainResult<Order> {
        self.transition(actor, order, StatusAction::Dispatch)
    }

    /// Finish the order and consume its reservations.
    #[tracing::instrument(skip(self))]
    pub fn complete(&self, actor: Actor, order: OrderId) -> DomainResult<Order> {
        self.transition(actor, order, StatusAction::Complete)
    }

    /// Cancel and release every hold. A no-op on finished or canceled orders.
    #[tracing::instrument(skip(self))]
    pub fn cancel(&self, actor: Actor, order: OrderId, by_system: bool) -> DomainResult<Order> {
        self.transition(actor, order, StatusAction::Cancel { by_system })
    }

    pub fn get_order(&self, actor: Actor, id: OrderId) -> DomainResult<Order> {
        let order = self.orders.get(id)?;
        authorize_owner_or(&*self.gate, actor, order.user(), &Permission::ORDERS_MANAGE)?;
        Ok(order)
    }

    pub fn list_orders(&self, actor: Actor, user: UserId) -> DomainResult<Vec<Order>> {
        authorize_owner_or(&*self.gate, actor, user, &Permission::ORDERS_MANAGE)?;
        Ok(self.orders.list_for_user(user))
    }

    pub fn order_history(&self, actor: Actor, id: OrderId) -> DomainResult<Vec<StoredOrderEvent>> {
        self.get_order(actor, id)?;
        self.orders.history(id)
    }

    fn transition(&self, actor: Actor, id: OrderId, action: StatusAction) -> DomainResult<Order> {
        self.locks
            .with_lock(&id, || self.transition_locked(actor, id, action))?
    }

    fn transition_locked(
        &self,
        actor: Actor,
        id: OrderId,
        action: StatusAction,
    ) -> DomainResult<Order> {
        let mut order = self.orders.get(id)?;
        self.authorize_action(actor, &order, action)?;

        let events = order.handle(&OrderCommand::ChangeStatus(ChangeStatus {
            order_id: id,
            action,
            occurred_at: self.clock.now(),
        }))?;
        let Some(to) = target_status(&events) else {
            debug!(order = %id, action = action.name(), status = %order.status(), "no-op on terminal order");
            return Ok(order);
        };

        let from = order.status();
        let already_committed = self.stock.is_committed(id)?;
        if to == OrderStatus::Finished {
            if already_committed {
                warn!(order = %id, "stock was committed by an earlier attempt, finishing without commit");
            } else if let Err(e) = self.stock.commit_all(order.reservations()) {
                error!(order = %id, error = %e, "stock commit failed, order left unchanged");
                return Err(e);
            }
        } else if to.is_canceled() && already_committed {
            return Err(DomainError::conflict(format!(
                "order {id} already has its stock committed and can only be completed"
            )));
        }

        let holds: Vec<ReservationId> = order.reservations().to_vec();
        let expected = ExpectedVersion::Exact(order.version());
        for event in &events {
            order.apply(event);
        }
        if let Err(e) = self.orders.save(&order, expected, &events) {
            error!(order = %id, to = %to, error = %e, "order status not saved");
            return Err(e);
        }

        if to == OrderStatus::Finished {
            self.stock.settle_order(id);
        } else if to.is_canceled() {
            let released = self.stock.release_all(&holds);
            debug!(order = %id, released = released.len(), "order holds released");
        }

        info!(order = %id, action = action.name(), from = %from, to = %to, "order status changed");
        Ok(order)
    }

    fn authorize_action(&self, actor: Actor, order: &Order, action: StatusAction) -> DomainResult<()> {
        let gate = &*self.gate;
        match action {
            StatusAction::ConfirmPayment => {
                authorize(gate, actor, &Permission::ORDERS_CONFIRM_PAYMENT)
            }
            StatusAction::MarkReady | StatusAction::Dispatch | StatusAction::Complete => {
                authorize(gate, actor, &Permission::ORDERS_MANAGE)
            }
            StatusAction::Cancel { by_system: true } => {
                authorize(gate, actor, &Permission::ORDERS_MANAGE)
            }
            StatusAction::Cancel { by_system: false } => {
                authorize_owner_or(gate, actor, order.user(), &Permission::ORDERS_MANAGE)
            }
        }
    }
}

fn target_status(events: &[OrderEvent]) -> Option<OrderStatus> {
    events.iter().rev().find_map(|event| match event {
        OrderEvent::StatusChanged(e) => Some(e.to),
        OrderEvent::Placed(_) => None,
    })
}

/// Validate basket lines and merge duplicates, keeping first-seen order.
fn merge_lines(items: &[BasketEntry]) -> DomainResult<Vec<BasketEntry>> {
    if items.is_empty() {
        return Err(DomainError::validation("order must contain at least one item"));
    }

    let mut merged: Vec<BasketEntry> = Vec::with_capacity(items.len());
    for item in items {
        if item.amount <= 0 {
            return Err(DomainError::validation(format!(
                "amount for product {} must be positive",
                item.product
            )));
        }
        match merged.iter_mut().find(|m| m.product == item.product) {
            Some(existing) => {
                existing.amount = existing
                    .amount
                    .checked_add(item.amount)
                    .ok_or_else(|| DomainError::validation("line amount overflow"))?;
            }
            None => merged.push(*item),
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::ProductId;

    fn line(product: ProductId, amount: i64) -> BasketEntry {
        BasketEntry { product, amount }
    }

    #[test]
    fn merge_lines_sums_duplicates_in_first_seen_order() {
        let (a, b) = (ProductId::new(), ProductId::new());
        let merged = merge_lines(&[line(a, 1), line(b, 2), line(a, 3)]).unwrap();
        assert_eq!(merged, vec![line(a, 4), line(b, 2)]);
    }

    #[test]
    fn merge_lines_rejects_empty_and_non_positive() {
        assert!(matches!(merge_lines(&[]), Err(DomainError::Validation(_))));
        assert!(matches!(
            merge_lines(&[line(ProductId::new(), -1)]),
            Err(DomainError::Validation(_))
        ));
    }
}
