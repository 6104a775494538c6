//! Order status lifecycle and its transition table.
//!
//! ```text
//! prepay:      awaiting_payment --confirm_payment--> forming
//! postpayment:                                       forming
//!
//! forming --mark_ready--> waiting_to_receive
//!
//! delivery: waiting_to_receive --dispatch--> in_delivery --complete--> finished
//! pickup:   waiting_to_receive --dispatch | complete-----------------> finished
//!
//! any non-terminal --cancel--> canceled_by_system | canceled_by_user
//! ```

use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingPayment,
    Forming,
    WaitingToReceive,
    InDelivery,
    Finished,
    CanceledBySystem,
    CanceledByUser,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::AwaitingPayment,
        OrderStatus::Forming,
        OrderStatus::WaitingToReceive,
        OrderStatus::InDelivery,
        OrderStatus::Finished,
        OrderStatus::CanceledBySystem,
        OrderStatus::CanceledByUser,
    ];

    /// Entry state of a freshly placed order.
    pub fn initial(payment: PaymentType) -> Self {
        match payment {
            PaymentType::Prepay => OrderStatus::AwaitingPayment,
            PaymentType::Postpayment => OrderStatus::Forming,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::Forming => "forming",
            OrderStatus::WaitingToReceive => "waiting_to_receive",
            OrderStatus::InDelivery => "in_delivery",
            OrderStatus::Finished => "finished",
            OrderStatus::CanceledBySystem => "canceled_by_system",
            OrderStatus::CanceledByUser => "canceled_by_user",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Finished | OrderStatus::CanceledBySystem | OrderStatus::CanceledByUser
        )
    }

    pub fn is_canceled(self) -> bool {
        matches!(self, OrderStatus::CanceledBySystem | OrderStatus::CanceledByUser)
    }

    /// Whether `self -> to` is an edge of the table for an order with `delivery`.
    pub fn can_transition_to(self, to: OrderStatus, delivery: DeliveryType) -> bool {
        use OrderStatus::*;
        match (self, to) {
            (AwaitingPayment, Forming) => true,
            (Forming, WaitingToReceive) => true,
            (WaitingToReceive, InDelivery) => delivery == DeliveryType::Delivery,
            (WaitingToReceive, Finished) => delivery == DeliveryType::Pickup,
            (InDelivery, Finished) => delivery == DeliveryType::Delivery,
            (from, CanceledBySystem | CanceledByUser) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Resolve the target status of `action`.
    ///
    /// Returns `Ok(None)` for a cancel on an already terminal order (idempotent
    /// no-op) and `InvalidOrderTransition` for every move outside the table.
    pub fn apply_action(
        self,
        action: StatusAction,
        delivery: DeliveryType,
    ) -> DomainResult<Option<OrderStatus>> {
        let target = match action {
            StatusAction::ConfirmPayment => OrderStatus::Forming,
            StatusAction::MarkReady => OrderStatus::WaitingToReceive,
            StatusAction::Dispatch => match delivery {
                DeliveryType::Delivery => OrderStatus::InDelivery,
                DeliveryType::Pickup => OrderStatus::Finished,
            },
            StatusAction::Complete => OrderStatus::Finished,
            StatusAction::Cancel { by_system } => {
                if self.is_terminal() {
                    return Ok(None);
                }
                if by_system {
                    OrderStatus::CanceledBySystem
                } else {
                    OrderStatus::CanceledByUser
                }
            }
        };

        if self.can_transition_to(target, delivery) {
            Ok(Some(target))
        } else {
            Err(DomainError::InvalidOrderTransition {
                current: self.as_str(),
                requested: target.as_str(),
            })
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status-changing operation requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusAction {
    ConfirmPayment,
    MarkReady,
    Dispatch,
    Complete,
    Cancel { by_system: bool },
}

impl StatusAction {
    pub fn name(self) -> &'static str {
        match self {
            StatusAction::ConfirmPayment => "confirm_payment",
            StatusAction::MarkReady => "mark_ready",
            StatusAction::Dispatch => "dispatch",
            StatusAction::Complete => "complete",
            StatusAction::Cancel { .. } => "cancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Prepay,
    Postpayment,
}
