use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{
    Aggregate, AggregateRoot, DomainError, Event, OrderId, ProductId, ReservationId, ShopId,
    UserId,
};

use crate::status::{DeliveryType, OrderStatus, PaymentType, StatusAction};

/// Order line: a price/quantity snapshot taken when the order was placed.
///
/// Never re-priced afterwards, whatever happens to the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductId,
    /// Unit price in smallest currency unit (e.g., kopecks).
    pub price: u64,
    pub amount: i64,
}

impl OrderItem {
    pub fn line_total(&self) -> Option<u64> {
        let amount = u64::try_from(self.amount).ok()?;
        self.price.checked_mul(amount)
    }

    /// Sum of all line totals; `None` on overflow or a non-positive amount.
    pub fn subtotal(items: &[OrderItem]) -> Option<u64> {
        items
            .iter()
            .try_fold(0u64, |acc, item| acc.checked_add(item.line_total()?))
    }
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user: UserId,
    shop: ShopId,
    status: OrderStatus,
    delivery_type: DeliveryType,
    payment_type: PaymentType,
    items: Vec<OrderItem>,
    reservations: Vec<ReservationId>,
    sum: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-placed aggregate instance.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            user: UserId::default(),
            shop: ShopId::default(),
            status: OrderStatus::Forming,
            delivery_type: DeliveryType::Pickup,
            payment_type: PaymentType::Postpayment,
            items: Vec::new(),
            reservations: Vec::new(),
            sum: 0,
            created_at: DateTime::<Utc>::default(),
            updated_at: DateTime::<Utc>::default(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn user(&self) -> UserId {
        self.user
    }

    pub fn shop(&self) -> ShopId {
        self.shop
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn delivery_type(&self) -> DeliveryType {
        self.delivery_type
    }

    pub fn payment_type(&self) -> PaymentType {
        self.payment_type
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Reservations still held for this order. Empty once the order is terminal.
    pub fn reservations(&self) -> &[ReservationId] {
        &self.reservations
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Resolve where `action` would take this order without changing it.
    pub fn target_of(&self, action: StatusAction) -> Result<Option<OrderStatus>, DomainError> {
        self.status.apply_action(action, self.delivery_type)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
///
/// Stock is already held by `reservations` when this is issued; the aggregate
/// only records the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub user: UserId,
    pub shop: ShopId,
    pub delivery_type: DeliveryType,
    pub payment_type: PaymentType,
    pub items: Vec<OrderItem>,
    pub reservations: Vec<ReservationId>,
    pub sum: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ChangeStatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
    pub order_id: OrderId,
    pub action: StatusAction,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    Place(PlaceOrder),
    ChangeStatus(ChangeStatus),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub user: UserId,
    pub shop: ShopId,
    pub status: OrderStatus,
    pub delivery_type: DeliveryType,
    pub payment_type: PaymentType,
    pub items: Vec<OrderItem>,
    pub reservations: Vec<ReservationId>,
    pub sum: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StatusChanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChanged {
    pub order_id: OrderId,
    pub action: StatusAction,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    Placed(OrderPlaced),
    StatusChanged(StatusChanged),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "orders.order.placed",
            OrderEvent::StatusChanged(_) => "orders.order.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Placed(e) => e.occurred_at,
            OrderEvent::StatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::Placed(e) => {
                self.id = e.order_id;
                self.user = e.user;
                self.shop = e.shop;
                self.status = e.status;
                self.delivery_type = e.delivery_type;
                self.payment_type = e.payment_type;
                self.items = e.items.clone();
                self.reservations = e.reservations.clone();
                self.sum = e.sum;
                self.created_at = e.occurred_at;
                self.updated_at = e.occurred_at;
                self.created = true;
            }
            OrderEvent::StatusChanged(e) => {
                self.status = e.to;
                self.updated_at = e.occurred_at;
                // Committed on finish, released on cancel.
                if e.to.is_terminal() {
                    self.reservations.clear();
                }
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::Place(cmd) => self.handle_place(cmd),
            OrderCommand::ChangeStatus(cmd) => self.handle_change_status(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::validation("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict(format!("order {} already exists", self.id)));
        }
        self.ensure_order_id(cmd.order_id)?;

        if cmd.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }
        if let Some(item) = cmd.items.iter().find(|i| i.amount <= 0) {
            return Err(DomainError::validation(format!(
                "amount for product {} must be positive",
                item.product
            )));
        }
        if OrderItem::subtotal(&cmd.items).is_none() {
            return Err(DomainError::validation("order sum overflows"));
        }

        Ok(vec![OrderEvent::Placed(OrderPlaced {
            order_id: cmd.order_id,
            user: cmd.user,
            shop: cmd.shop,
            status: OrderStatus::initial(cmd.payment_type),
            delivery_type: cmd.delivery_type,
            payment_type: cmd.payment_type,
            items: cmd.items.clone(),
            reservations: cmd.reservations.clone(),
            sum: cmd.sum,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_change_status(&self, cmd: &ChangeStatus) -> Result<Vec<OrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("order", self.id));
        }
        self.ensure_order_id(cmd.order_id)?;

        let Some(to) = self.target_of(cmd.action)? else {
            return Ok(vec![]);
        };

        Ok(vec![OrderEvent::StatusChanged(StatusChanged {
            order_id: self.id,
            action: cmd.action,
            from: self.status,
            to,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn item(price: u64, amount: i64) -> OrderItem {
        OrderItem {
            product: ProductId::new(),
            price,
            amount,
        }
    }

    fn place(order_id: OrderId, delivery: DeliveryType, payment: PaymentType) -> PlaceOrder {
        PlaceOrder {
            order_id,
            user: UserId::new(),
            shop: ShopId::new(),
            delivery_type: delivery,
            payment_type: payment,
            items: vec![item(250, 2), item(100, 1)],
            reservations: vec![ReservationId::new(), ReservationId::new()],
            sum: 600,
            occurred_at: test_time(),
        }
    }

    fn placed(delivery: DeliveryType, payment: PaymentType) -> Order {
        let order_id = OrderId::new();
        let mut order = Order::empty(order_id);
        let events = order
            .handle(&OrderCommand::Place(place(order_id, delivery, payment)))
            .unwrap();
        order.apply(&events[0]);
        order
    }

    fn change(order: &Order, action: StatusAction) -> Result<Vec<OrderEvent>, DomainError> {
        order.handle(&OrderCommand::ChangeStatus(ChangeStatus {
            order_id: order.id_typed(),
            action,
            occurred_at: order.updated_at() + Duration::seconds(1),
        }))
    }

    fn run(order: &mut Order, action: StatusAction) {
        for event in change(order, action).unwrap() {
            order.apply(&event);
        }
    }

    #[test]
    fn subtotal_sums_line_totals_and_detects_overflow() {
        assert_eq!(OrderItem::subtotal(&[item(250, 2), item(100, 1)]), Some(600));
        assert_eq!(OrderItem::subtotal(&[item(u64::MAX, 2)]), None);
        assert_eq!(OrderItem::subtotal(&[item(10, -1)]), None);
    }

    #[test]
    fn place_order_emits_placed_event_with_initial_status() {
        let order = placed(DeliveryType::Delivery, PaymentType::Prepay);
        assert!(order.is_created());
        assert_eq!(order.status(), OrderStatus::AwaitingPayment);
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.reservations().len(), 2);
        assert_eq!(order.sum(), 600);
        assert_eq!(order.created_at(), order.updated_at());
        assert_eq!(order.version(), 1);

        let order = placed(DeliveryType::Pickup, PaymentType::Postpayment);
        assert_eq!(order.status(), OrderStatus::Forming);
    }

    #[test]
    fn cannot_place_twice() {
        let order = placed(DeliveryType::Pickup, PaymentType::Postpayment);
        let err = order
            .handle(&OrderCommand::Place(place(
                order.id_typed(),
                DeliveryType::Pickup,
                PaymentType::Postpayment,
            )))
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn place_rejects_empty_or_non_positive_lines() {
        let order_id = OrderId::new();
        let order = Order::empty(order_id);

        let mut cmd = place(order_id, DeliveryType::Pickup, PaymentType::Prepay);
        cmd.items.clear();
        assert!(matches!(
            order.handle(&OrderCommand::Place(cmd)),
            Err(DomainError::Validation(_))
        ));

        let mut cmd = place(order_id, DeliveryType::Pickup, PaymentType::Prepay);
        cmd.items.push(item(10, 0));
        assert!(matches!(
            order.handle(&OrderCommand::Place(cmd)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn status_change_on_unplaced_order_is_not_found() {
        let order = Order::empty(OrderId::new());
        assert!(matches!(
            change(&order, StatusAction::MarkReady),
            Err(DomainError::NotFound { entity: "order", .. })
        ));
    }

    #[test]
    fn delivery_order_walks_to_finished() {
        let mut order = placed(DeliveryType::Delivery, PaymentType::Prepay);
        let placed_at = order.updated_at();

        run(&mut order, StatusAction::ConfirmPayment);
        assert_eq!(order.status(), OrderStatus::Forming);
        assert!(order.updated_at() > placed_at);

        run(&mut order, StatusAction::MarkReady);
        run(&mut order, StatusAction::Dispatch);
        assert_eq!(order.status(), OrderStatus::InDelivery);
        assert_eq!(order.reservations().len(), 2);

        run(&mut order, StatusAction::Complete);
        assert_eq!(order.status(), OrderStatus::Finished);
        assert!(order.reservations().is_empty());
        assert_eq!(order.version(), 5);
    }

    #[test]
    fn invalid_transition_leaves_order_unchanged() {
        let order = placed(DeliveryType::Delivery, PaymentType::Postpayment);
        let before = order.clone();

        let err = change(&order, StatusAction::Complete).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidOrderTransition {
                current: "forming",
                requested: "finished",
            }
        );
        assert_eq!(order, before);
    }

    #[test]
    fn cancel_twice_emits_nothing_the_second_time() {
        let mut order = placed(DeliveryType::Pickup, PaymentType::Prepay);
        run(&mut order, StatusAction::Cancel { by_system: false });
        assert_eq!(order.status(), OrderStatus::CanceledByUser);
        assert!(order.reservations().is_empty());

        let version = order.version();
        assert!(change(&order, StatusAction::Cancel { by_system: true })
            .unwrap()
            .is_empty());
        assert_eq!(order.version(), version);
    }

    #[test]
    fn events_carry_stable_type_names() {
        let order = placed(DeliveryType::Pickup, PaymentType::Prepay);
        let events = change(&order, StatusAction::ConfirmPayment).unwrap();
        assert_eq!(events[0].event_type(), "orders.order.status_changed");
        match &events[0] {
            OrderEvent::StatusChanged(e) => {
                assert_eq!(e.from, OrderStatus::AwaitingPayment);
                assert_eq!(e.to, OrderStatus::Forming);
            }
            _ => panic!("Expected StatusChanged event"),
        }
    }

    fn action_strategy() -> impl Strategy<Value = StatusAction> {
        prop_oneof![
            Just(StatusAction::ConfirmPayment),
            Just(StatusAction::MarkReady),
            Just(StatusAction::Dispatch),
            Just(StatusAction::Complete),
            any::<bool>().prop_map(|by_system| StatusAction::Cancel { by_system }),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn transitions_only_follow_the_table(
            delivery in prop_oneof![Just(DeliveryType::Pickup), Just(DeliveryType::Delivery)],
            payment in prop_oneof![Just(PaymentType::Prepay), Just(PaymentType::Postpayment)],
            actions in prop::collection::vec(action_strategy(), 1..16),
        ) {
            let mut order = placed(delivery, payment);

            for action in actions {
                let before = order.clone();
                match change(&order, action) {
                    Ok(events) => {
                        for event in &events {
                            if let OrderEvent::StatusChanged(e) = event {
                                prop_assert!(e.from.can_transition_to(e.to, delivery));
                            }
                            order.apply(event);
                        }
                        prop_assert_eq!(order.version(), before.version() + events.len() as u64);
                        if events.is_empty() {
                            prop_assert!(before.status().is_terminal());
                        }
                    }
                    Err(err) => {
                        let is_transition_error =
                            matches!(err, DomainError::InvalidOrderTransition { .. });
                        prop_assert!(is_transition_error);
                        prop_assert_eq!(&order, &before);
                    }
                }
            }
        }
    }
}
