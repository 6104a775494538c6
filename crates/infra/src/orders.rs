//! Order persistence: current state plus an append-only status history.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_core::{
    AggregateRoot, DomainError, DomainResult, Event, ExpectedVersion, OrderId, UserId,
};
use storefront_orders::{Order, OrderEvent};

/// One persisted order event, numbered within its order's stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrderEvent {
    pub order_id: OrderId,
    /// 1-based, equal to the order version right after this event.
    pub sequence_number: u64,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl StoredOrderEvent {
    fn from_typed(order_id: OrderId, sequence_number: u64, event: &OrderEvent) -> DomainResult<Self> {
        let payload = serde_json::to_value(event).map_err(|e| {
            DomainError::inconsistency(format!("failed to serialize order event: {e}"))
        })?;
        Ok(Self {
            order_id,
            sequence_number,
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }

    /// Decode the payload back into the typed event.
    pub fn to_typed(&self) -> DomainResult<OrderEvent> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            DomainError::inconsistency(format!("failed to decode order event: {e}"))
        })
    }
}

pub trait OrderStore: Send + Sync {
    fn get(&self, id: OrderId) -> DomainResult<Order>;

    /// Persist `order` after `events` were applied to it.
    ///
    /// `expected` is the version the caller loaded; a mismatch is a `Conflict`
    /// and nothing is written.
    ///
    /// Implementations should not fail once the version check has passed. If
    /// one does after a finish committed stock, the order stays in its old
    /// status and a retried finish skips the commit.
    fn save(&self, order: &Order, expected: ExpectedVersion, events: &[OrderEvent]) -> DomainResult<()>;

    fn list_for_user(&self, user: UserId) -> Vec<Order>;

    fn history(&self, id: OrderId) -> DomainResult<Vec<StoredOrderEvent>>;
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn get(&self, id: OrderId) -> DomainResult<Order> {
        (**self).get(id)
    }

    fn save(&self, order: &Order, expected: ExpectedVersion, events: &[OrderEvent]) -> DomainResult<()> {
        (**self).save(order, expected, events)
    }

    fn list_for_user(&self, user: UserId) -> Vec<Order> {
        (**self).list_for_user(user)
    }

    fn history(&self, id: OrderId) -> DomainResult<Vec<StoredOrderEvent>> {
        (**self).history(id)
    }
}

#[derive(Debug, Clone)]
struct Row {
    order: Order,
    history: Vec<StoredOrderEvent>,
}

/// In-memory order store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    rows: RwLock<HashMap<OrderId, Row>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn get(&self, id: OrderId) -> DomainResult<Order> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        rows.get(&id)
            .map(|row| row.order.clone())
            .ok_or_else(|| DomainError::not_found("order", id))
    }

    fn save(&self, order: &Order, expected: ExpectedVersion, events: &[OrderEvent]) -> DomainResult<()> {
        let id = order.id_typed();
        let mut rows = self.rows.write().map_err(|_| poisoned())?;

        let current = rows.get(&id).map(|row| row.order.version()).unwrap_or(0);
        expected.check(current)?;

        let applied = order.version().checked_sub(current).unwrap_or(0);
        if applied != events.len() as u64 {
            return Err(DomainError::inconsistency(format!(
                "order {id} moved from version {current} to {} with {} event(s)",
                order.version(),
                events.len()
            )));
        }

        let stored = events
            .iter()
            .enumerate()
            .map(|(idx, event)| StoredOrderEvent::from_typed(id, current + idx as u64 + 1, event))
            .collect::<DomainResult<Vec<_>>>()?;

        let row = rows.entry(id).or_insert_with(|| Row {
            order: order.clone(),
            history: Vec::new(),
        });
        row.order = order.clone();
        row.history.extend(stored);
        Ok(())
    }

    fn list_for_user(&self, user: UserId) -> Vec<Order> {
        let rows = match self.rows.read() {
            Ok(r) => r,
            Err(_) => return vec![],
        };
        let mut orders: Vec<Order> = rows
            .values()
            .filter(|row| row.order.user() == user)
            .map(|row| row.order.clone())
            .collect();
        orders.sort_by_key(|o| (o.created_at(), o.id_typed()));
        orders
    }

    fn history(&self, id: OrderId) -> DomainResult<Vec<StoredOrderEvent>> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        rows.get(&id)
            .map(|row| row.history.clone())
            .ok_or_else(|| DomainError::not_found("order", id))
    }
}

fn poisoned() -> DomainError {
    DomainError::inconsistency("order store lock poisoned")
}
