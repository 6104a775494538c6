//! One availability row together with its active reservations.
//!
//! A `StockSlot` is the unit of atomicity for stock: callers hold it behind a
//! lock and every check-then-act below runs on a single `&mut` borrow. The
//! invariant kept by every method is
//!
//! ```text
//! amount >= 0  &&  amount - sum(reservations.amount) >= 0
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use storefront_core::{DomainError, DomainResult, ReservationId, StockShortage};

use crate::{Availability, Reservation, ReserveRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockSlot {
    availability: Availability,
    reservations: BTreeMap<ReservationId, Reservation>,
}

/// Result of committing reservations against one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub reservations: Vec<Reservation>,
    pub amount_before: i64,
    pub amount_after: i64,
}

impl StockSlot {
    pub fn new(availability: Availability) -> Self {
        Self {
            availability,
            reservations: BTreeMap::new(),
        }
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.reservations.values()
    }

    pub fn reservation(&self, id: ReservationId) -> Option<&Reservation> {
        self.reservations.get(&id)
    }

    pub fn reserved_total(&self) -> i64 {
        self.reservations.values().map(|r| r.amount).sum()
    }

    /// Units that can still be reserved.
    pub fn free_amount(&self) -> i64 {
        self.availability.amount - self.reserved_total()
    }

    fn shortage(&self, requested: i64) -> StockShortage {
        StockShortage {
            product: self.availability.product,
            shop: self.availability.shop,
            requested,
            available: self.free_amount().max(0),
        }
    }

    /// Hold `request.amount` units. Fails fast when the free amount is short.
    pub fn reserve(
        &mut self,
        id: ReservationId,
        request: &ReserveRequest,
        at: DateTime<Utc>,
    ) -> DomainResult<Reservation> {
        if request.amount <= 0 {
            return Err(DomainError::validation("reservation amount must be positive"));
        }
        if request.product != self.availability.product || request.shop != self.availability.shop {
            return Err(DomainError::validation(
                "reservation does not target this availability row",
            ));
        }
        if self.reservations.contains_key(&id) {
            return Err(DomainError::conflict(format!("reservation {id} already exists")));
        }
        if self.free_amount() < request.amount {
            return Err(DomainError::InsufficientStock(self.shortage(request.amount)));
        }

        let reservation = Reservation {
            id,
            user: request.user,
            product: request.product,
            shop: request.shop,
            availability: self.availability.id,
            order: request.order,
            amount: request.amount,
            created_at: at,
        };
        self.reservations.insert(id, reservation);
        Ok(reservation)
    }

    /// Drop a hold. Stock is untouched (it was never decremented).
    pub fn release(&mut self, id: ReservationId) -> DomainResult<Reservation> {
        self.reservations
            .remove(&id)
            .ok_or_else(|| DomainError::not_found("reservation", id))
    }

    /// Validate that committing `ids` keeps stock non-negative, without mutating.
    ///
    /// Returns the total amount that would be decremented.
    pub fn check_commit(&self, ids: &[ReservationId]) -> DomainResult<i64> {
        let mut seen = Vec::with_capacity(ids.len());
        let mut total = 0i64;
        for id in ids {
            if seen.contains(id) {
                continue;
            }
            seen.push(*id);
            let reservation = self
                .reservations
                .get(id)
                .ok_or_else(|| DomainError::not_found("reservation", id))?;
            total += reservation.amount;
        }

        let after = self.availability.amount - total;
        if after < 0 {
            return Err(DomainError::inconsistency(format!(
                "committing {total} unit(s) would drive availability {} to {after}",
                self.availability.id
            )));
        }
        if after < self.reserved_total() - total {
            return Err(DomainError::inconsistency(format!(
                "availability {} would be left with less stock than its remaining reservations",
                self.availability.id
            )));
        }
        Ok(total)
    }

    /// Permanently consume the given holds: decrement `amount`, delete the rows.
    ///
    /// All-or-nothing: if any id is unknown or the decrement would go negative,
    /// the slot is left unchanged.
    pub fn commit(&mut self, ids: &[ReservationId]) -> DomainResult<Committed> {
        let total = self.check_commit(ids)?;
        let amount_before = self.availability.amount;

        let mut committed = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(reservation) = self.reservations.remove(id) {
                committed.push(reservation);
            }
        }
        self.availability.amount -= total;

        Ok(Committed {
            reservations: committed,
            amount_before,
            amount_after: self.availability.amount,
        })
    }

    /// Restock (`delta > 0`) or write off (`delta < 0`) units.
    ///
    /// A write-off may not eat into units that are already reserved.
    pub fn adjust(&mut self, delta: i64) -> DomainResult<i64> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_amount = self
            .availability
            .amount
            .checked_add(delta)
            .ok_or_else(|| DomainError::validation("stock amount overflow"))?;
        if new_amount < self.reserved_total() {
            return Err(DomainError::InsufficientStock(self.shortage(-delta)));
        }
        self.availability.amount = new_amount;
        Ok(new_amount)
    }

    /// Remove soft holds older than `ttl`; bound holds are kept.
    pub fn reap_expired(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<Reservation> {
        let expired: Vec<ReservationId> = self
            .reservations
            .values()
            .filter(|r| r.is_expired(now, ttl))
            .map(|r| r.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.reservations.remove(&id))
            .collect()
    }

    /// Re-check the slot invariant (used by tests and consistency audits).
    pub fn check_invariant(&self) -> DomainResult<()> {
        if self.availability.amount < 0 {
            return Err(DomainError::inconsistency(format!(
                "availability {} has negative amount {}",
                self.availability.id, self.availability.amount
            )));
        }
        if self.free_amount() < 0 {
            return Err(DomainError::inconsistency(format!(
                "availability {} is over-reserved by {}",
                self.availability.id,
                -self.free_amount()
            )));
        }
        Ok(())
    }
}
