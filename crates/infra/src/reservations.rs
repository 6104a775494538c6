//! Reservation manager: the shared, lock-guarded stock ledger.
//!
//! Every availability row lives in its own [`StockSlot`] behind a `Mutex`, so
//! check-then-act on one row is atomic while different rows proceed in
//! parallel. The slot map and the lookup indexes sit behind `RwLock`s that are
//! only held for the lookup itself.
//!
//! Lock order: a slot mutex may be held while taking an index lock, never the
//! other way around. `commit_all` takes several slot mutexes in ascending
//! `AvailabilityId` order.
//!
//! Orders whose holds were committed are remembered until the caller settles
//! them, so a finish that committed stock but failed to record the new status
//! can be retried without committing twice.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use storefront_core::{
    AvailabilityId, Clock, DomainError, DomainResult, OrderId, ProductId, ReservationId, ShopId,
    UserId,
};
use storefront_inventory::{Availability, Committed, Reservation, ReserveRequest, StockSlot};

type SlotRef = Arc<Mutex<StockSlot>>;

pub struct ReservationManager {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    slots: RwLock<HashMap<AvailabilityId, SlotRef>>,
    by_row: RwLock<HashMap<(ProductId, ShopId), AvailabilityId>>,
    by_reservation: RwLock<HashMap<ReservationId, AvailabilityId>>,
    committed_orders: RwLock<HashSet<OrderId>>,
}

impl core::fmt::Debug for ReservationManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReservationManager")
            .field("ttl", &self.ttl)
            .field("rows", &self.slots.read().map(|s| s.len()).unwrap_or(0))
            .finish_non_exhaustive()
    }
}

impl ReservationManager {
    /// `ttl` bounds the life of unbound reservations (see [`Self::reap_expired`]).
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            slots: RwLock::new(HashMap::new()),
            by_row: RwLock::new(HashMap::new()),
            by_reservation: RwLock::new(HashMap::new()),
            committed_orders: RwLock::new(HashSet::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // ---- availability rows -------------------------------------------------

    /// Create the stock row for (product, shop).
    pub fn register_availability(
        &self,
        product: ProductId,
        shop: ShopId,
        amount: i64,
    ) -> DomainResult<Availability> {
        let mut by_row = self.by_row.write().map_err(|_| poisoned("row index"))?;
        if let Some(existing) = by_row.get(&(product, shop)) {
            return Err(DomainError::conflict(format!(
                "availability for product {product} at shop {shop} already exists ({existing})"
            )));
        }

        let availability = Availability::new(AvailabilityId::new(), product, shop, amount)?;
        self.slots
            .write()
            .map_err(|_| poisoned("slot map"))?
            .insert(availability.id, Arc::new(Mutex::new(StockSlot::new(availability))));
        by_row.insert((product, shop), availability.id);

        info!(
            availability = %availability.id,
            product = %product,
            shop = %shop,
            amount,
            "availability registered"
        );
        Ok(availability)
    }

    pub fn availability(&self, id: AvailabilityId) -> DomainResult<Availability> {
        let slot = self.slot(id)?;
        let guard = lock_slot(&slot, id)?;
        Ok(*guard.availability())
    }

    pub fn find_availability(&self, product: ProductId, shop: ShopId) -> DomainResult<Availability> {
        self.availability(self.row_id(product, shop)?)
    }

    /// Every availability row of a product, ordered by shop.
    pub fn list_for_product(&self, product: ProductId) -> DomainResult<Vec<Availability>> {
        let ids: Vec<AvailabilityId> = self
            .by_row
            .read()
            .map_err(|_| poisoned("row index"))?
            .iter()
            .filter(|((p, _), _)| *p == product)
            .map(|(_, id)| *id)
            .collect();

        let mut rows = ids
            .into_iter()
            .map(|id| self.availability(id))
            .collect::<DomainResult<Vec<_>>>()?;
        rows.sort_by_key(|a| a.shop);
        Ok(rows)
    }

    /// Units of a row that are neither sold nor held.
    pub fn free_amount(&self, id: AvailabilityId) -> DomainResult<i64> {
        let slot = self.slot(id)?;
        let guard = lock_slot(&slot, id)?;
        Ok(guard.free_amount())
    }

    /// Restock (`delta > 0`) or write off (`delta < 0`) a row.
    pub fn adjust_stock(&self, id: AvailabilityId, delta: i64) -> DomainResult<Availability> {
        let slot = self.slot(id)?;
        let mut guard = lock_slot(&slot, id)?;
        let amount = guard.adjust(delta)?;
        info!(availability = %id, delta, amount, "stock adjusted");
        Ok(*guard.availability())
    }

    // ---- reservations ------------------------------------------------------

    pub fn reservation(&self, id: ReservationId) -> DomainResult<Reservation> {
        let availability = self.reservation_row(id)?;
        let slot = self.slot(availability)?;
        let guard = lock_slot(&slot, availability)?;
        guard
            .reservation(id)
            .copied()
            .ok_or_else(|| DomainError::not_found("reservation", id))
    }

    pub fn reservations_for(&self, id: AvailabilityId) -> DomainResult<Vec<Reservation>> {
        let slot = self.slot(id)?;
        let guard = lock_slot(&slot, id)?;
        Ok(guard.reservations().copied().collect())
    }

    /// Hold `amount` units of `product` at `shop` for `user` (soft hold).
    pub fn reserve(
        &self,
        user: UserId,
        product: ProductId,
        shop: ShopId,
        amount: i64,
    ) -> DomainResult<Reservation> {
        self.reserve_request(ReserveRequest::soft(user, product, shop, amount))
    }

    /// Hold stock already bound to `order`.
    pub fn reserve_for_order(
        &self,
        order: OrderId,
        user: UserId,
        product: ProductId,
        shop: ShopId,
        amount: i64,
    ) -> DomainResult<Reservation> {
        self.reserve_request(ReserveRequest::soft(user, product, shop, amount).for_order(order))
    }

    fn reserve_request(&self, request: ReserveRequest) -> DomainResult<Reservation> {
        let availability = self.row_id(request.product, request.shop)?;
        let slot = self.slot(availability)?;
        let mut guard = lock_slot(&slot, availability)?;

        let reservation = match guard.reserve(ReservationId::new(), &request, self.clock.now()) {
            Ok(r) => r,
            Err(e) => {
                debug!(availability = %availability, requested = request.amount, error = %e, "reservation refused");
                return Err(e);
            }
        };
        match self.by_reservation.write() {
            Ok(mut index) => {
                index.insert(reservation.id, availability);
            }
            Err(_) => {
                // Unindexed holds could never be released or committed.
                let _ = guard.release(reservation.id);
                return Err(poisoned("reservation index"));
            }
        }

        debug!(
            reservation = %reservation.id,
            availability = %availability,
            amount = reservation.amount,
            order = ?reservation.order,
            free = guard.free_amount(),
            "stock reserved"
        );
        Ok(reservation)
    }

    /// Drop a hold without touching on-hand stock.
    pub fn release(&self, id: ReservationId) -> DomainResult<Reservation> {
        let availability = self.reservation_row(id)?;
        let slot = self.slot(availability)?;
        let mut guard = lock_slot(&slot, availability)?;

        let reservation = guard.release(id)?;
        self.forget(&[id]);
        debug!(reservation = %id, availability = %availability, amount = reservation.amount, "reservation released");
        Ok(reservation)
    }

    /// Compensating release: unknown ids are skipped.
    pub fn release_all(&self, ids: &[ReservationId]) -> Vec<Reservation> {
        let mut released = Vec::with_capacity(ids.len());
        for id in ids {
            match self.release(*id) {
                Ok(r) => released.push(r),
                Err(e) => warn!(reservation = %id, error = %e, "release skipped"),
            }
        }
        released
    }

    /// Consume one hold: decrement on-hand stock and delete the reservation.
    pub fn commit(&self, id: ReservationId) -> DomainResult<Committed> {
        let mut committed = self.commit_all(&[id])?;
        committed
            .pop()
            .ok_or_else(|| DomainError::inconsistency(format!("commit of {id} produced no result")))
    }

    /// Consume several holds as one unit, possibly spanning several rows.
    ///
    /// Every affected row is locked (ascending id) and validated before any is
    /// changed, so either all reservations commit or none do.
    pub fn commit_all(&self, ids: &[ReservationId]) -> DomainResult<Vec<Committed>> {
        let mut grouped: BTreeMap<AvailabilityId, Vec<ReservationId>> = BTreeMap::new();
        for id in ids {
            grouped.entry(self.reservation_row(*id)?).or_default().push(*id);
        }

        let slots = grouped
            .keys()
            .map(|availability| Ok((*availability, self.slot(*availability)?)))
            .collect::<DomainResult<Vec<_>>>()?;
        let mut guards: Vec<(AvailabilityId, MutexGuard<'_, StockSlot>)> = slots
            .iter()
            .map(|(availability, slot)| Ok((*availability, lock_slot(slot, *availability)?)))
            .collect::<DomainResult<_>>()?;

        for (availability, guard) in &guards {
            if let Err(e) = guard.check_commit(&grouped[availability]) {
                if matches!(e, DomainError::StockInconsistency(_)) {
                    error!(availability = %availability, error = %e, "stock inconsistency detected on commit");
                }
                return Err(e);
            }
        }

        let mut committed = Vec::with_capacity(guards.len());
        for (availability, guard) in guards.iter_mut() {
            let result = guard.commit(&grouped[&*availability])?;
            info!(
                availability = %availability,
                reservations = result.reservations.len(),
                amount_before = result.amount_before,
                amount_after = result.amount_after,
                "stock committed"
            );
            committed.push(result);
        }
        drop(guards);

        self.forget(ids);
        self.remember_committed(&committed);
        Ok(committed)
    }

    /// Whether `commit_all` consumed holds of `order` that were not settled yet.
    pub fn is_committed(&self, order: OrderId) -> DomainResult<bool> {
        Ok(self
            .committed_orders
            .read()
            .map_err(|_| poisoned("committed orders"))?
            .contains(&order))
    }

    /// Forget the commit record of `order` once its final status is stored.
    pub fn settle_order(&self, order: OrderId) {
        match self.committed_orders.write() {
            Ok(mut orders) => {
                orders.remove(&order);
            }
            Err(_) => error!(order = %order, "committed orders lock poisoned, record kept"),
        }
    }

    /// Delete unbound reservations older than the TTL. Bound ones are kept.
    pub fn reap_expired(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let slots: Vec<(AvailabilityId, SlotRef)> = self
            .slots
            .read()
            .map_err(|_| poisoned("slot map"))?
            .iter()
            .map(|(id, slot)| (*id, slot.clone()))
            .collect();

        let mut reaped = Vec::new();
        for (availability, slot) in slots {
            let mut guard = lock_slot(&slot, availability)?;
            let expired = guard.reap_expired(now, self.ttl);
            drop(guard);
            if !expired.is_empty() {
                let ids: Vec<ReservationId> = expired.iter().map(|r| r.id).collect();
                self.forget(&ids);
                reaped.extend(expired);
            }
        }

        if !reaped.is_empty() {
            info!(count = reaped.len(), "expired reservations reaped");
        }
        Ok(reaped)
    }

    /// Re-check every row's stock invariant.
    pub fn check_invariants(&self) -> DomainResult<()> {
        let slots: Vec<(AvailabilityId, SlotRef)> = self
            .slots
            .read()
            .map_err(|_| poisoned("slot map"))?
            .iter()
            .map(|(id, slot)| (*id, slot.clone()))
            .collect();
        for (availability, slot) in slots {
            let guard = lock_slot(&slot, availability)?;
            if let Err(e) = guard.check_invariant() {
                error!(availability = %availability, error = %e, "stock invariant violated");
                return Err(e);
            }
        }
        Ok(())
    }

    // ---- internals ---------------------------------------------------------

    fn row_id(&self, product: ProductId, shop: ShopId) -> DomainResult<AvailabilityId> {
        self.by_row
            .read()
            .map_err(|_| poisoned("row index"))?
            .get(&(product, shop))
            .copied()
            .ok_or_else(|| DomainError::not_found("availability", format!("{product}@{shop}")))
    }

    fn reservation_row(&self, id: ReservationId) -> DomainResult<AvailabilityId> {
        self.by_reservation
            .read()
            .map_err(|_| poisoned("reservation index"))?
            .get(&id)
            .copied()
            .ok_or_else(|| DomainError::not_found("reservation", id))
    }

    fn slot(&self, id: AvailabilityId) -> DomainResult<SlotRef> {
        self.slots
            .read()
            .map_err(|_| poisoned("slot map"))?
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("availability", id))
    }

    fn forget(&self, ids: &[ReservationId]) {
        match self.by_reservation.write() {
            Ok(mut index) => {
                for id in ids {
                    index.remove(id);
                }
            }
            Err(_) => error!(
                lock = "reservation index",
                stale = ids.len(),
                "lock poisoned, index entries left behind"
            ),
        }
    }

    fn remember_committed(&self, committed: &[Committed]) {
        let orders: HashSet<OrderId> = committed
            .iter()
            .flat_map(|c| c.reservations.iter().filter_map(|r| r.order))
            .collect();
        if orders.is_empty() {
            return;
        }
        match self.committed_orders.write() {
            Ok(mut known) => known.extend(orders),
            Err(_) => error!(orders = orders.len(), "committed orders lock poisoned, commit not recorded"),
        }
    }
}

fn lock_slot(slot: &SlotRef, id: AvailabilityId) -> DomainResult<MutexGuard<'_, StockSlot>> {
    slot.lock().map_err(|_| {
        error!(availability = %id, "stock slot lock poisoned");
        DomainError::inconsistency(format!("stock slot {id} lock poisoned"))
    })
}

fn poisoned(what: &str) -> DomainError {
    error!(lock = what, "lock poisoned");
    DomainError::inconsistency(format!("{what} lock poisoned"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    use proptest::prelude::*;
    use storefront_core::{ManualClock, StockShortage};

    struct Fixture {
        clock: Arc<ManualClock>,
        stock: ReservationManager,
        product: ProductId,
        shop: ShopId,
        user: UserId,
    }

    fn fixture(amount: i64) -> (Fixture, AvailabilityId) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let stock = ReservationManager::new(clock.clone(), Duration::minutes(15));
        let product = ProductId::new();
        let shop = ShopId::new();
        let row = stock.register_availability(product, shop, amount).unwrap();
        (
            Fixture {
                clock,
                stock,
                product,
                shop,
                user: UserId::new(),
            },
            row.id,
        )
    }

    #[test]
    fn reserve_holds_stock_and_reports_shortage() {
        let (f, row) = fixture(5);
        f.stock.reserve(f.user, f.product, f.shop, 3).unwrap();
        assert_eq!(f.stock.free_amount(row).unwrap(), 2);
        assert_eq!(f.stock.availability(row).unwrap().amount, 5);

        let err = f.stock.reserve(f.user, f.product, f.shop, 3).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock(StockShortage {
                product: f.product,
                shop: f.shop,
                requested: 3,
                available: 2,
            })
        );
    }

    #[test]
    fn unknown_row_and_bad_amount() {
        let (f, _) = fixture(5);
        assert!(matches!(
            f.stock.reserve(f.user, f.product, ShopId::new(), 1),
            Err(DomainError::NotFound { entity: "availability", .. })
        ));
        assert!(matches!(
            f.stock.reserve(f.user, f.product, f.shop, 0),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_row_is_a_conflict() {
        let (f, _) = fixture(5);
        assert!(matches!(
            f.stock.register_availability(f.product, f.shop, 1),
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn release_then_reserve_again_does_not_leak() {
        let (f, row) = fixture(4);
        let r = f.stock.reserve(f.user, f.product, f.shop, 4).unwrap();
        f.stock.release(r.id).unwrap();
        assert_eq!(f.stock.free_amount(row).unwrap(), 4);
        f.stock.reserve(f.user, f.product, f.shop, 4).unwrap();

        assert!(matches!(
            f.stock.release(r.id),
            Err(DomainError::NotFound { entity: "reservation", .. })
        ));
    }

    #[test]
    fn commit_decrements_and_deletes_exactly_one() {
        let (f, row) = fixture(10);
        let a = f.stock.reserve(f.user, f.product, f.shop, 4).unwrap();
        let b = f.stock.reserve(f.user, f.product, f.shop, 1).unwrap();

        let committed = f.stock.commit(a.id).unwrap();
        assert_eq!(committed.amount_before, 10);
        assert_eq!(committed.amount_after, 6);
        assert_eq!(f.stock.availability(row).unwrap().amount, 6);
        assert_eq!(f.stock.reservations_for(row).unwrap(), vec![b]);
        assert!(f.stock.reservation(a.id).is_err());
    }

    #[test]
    fn commit_all_spans_rows_and_is_all_or_nothing() {
        let (f, row_a) = fixture(10);
        let other = ProductId::new();
        let row_b = f.stock.register_availability(other, f.shop, 3).unwrap().id;

        let a = f.stock.reserve(f.user, f.product, f.shop, 2).unwrap();
        let b = f.stock.reserve(f.user, other, f.shop, 3).unwrap();

        let unknown = ReservationId::new();
        assert!(f.stock.commit_all(&[a.id, b.id, unknown]).is_err());
        assert_eq!(f.stock.availability(row_a).unwrap().amount, 10);
        assert_eq!(f.stock.reservations_for(row_b).unwrap().len(), 1);

        let committed = f.stock.commit_all(&[a.id, b.id]).unwrap();
        assert_eq!(committed.len(), 2);
        assert_eq!(f.stock.availability(row_a).unwrap().amount, 8);
        assert_eq!(f.stock.availability(row_b).unwrap().amount, 0);
        f.stock.check_invariants().unwrap();
    }

    #[test]
    fn release_all_skips_unknown_ids() {
        let (f, row) = fixture(10);
        let a = f.stock.reserve(f.user, f.product, f.shop, 2).unwrap();
        let released = f.stock.release_all(&[ReservationId::new(), a.id]);
        assert_eq!(released, vec![a]);
        assert_eq!(f.stock.free_amount(row).unwrap(), 10);
    }

    #[test]
    fn adjust_cannot_eat_into_reserved_units() {
        let (f, row) = fixture(5);
        f.stock.reserve(f.user, f.product, f.shop, 4).unwrap();
        assert!(matches!(
            f.stock.adjust_stock(row, -2),
            Err(DomainError::InsufficientStock(_))
        ));
        assert_eq!(f.stock.adjust_stock(row, -1).unwrap().amount, 4);
        assert_eq!(f.stock.adjust_stock(row, 6).unwrap().amount, 10);
    }

    #[test]
    fn reaping_only_touches_old_unbound_holds() {
        let (f, row) = fixture(10);
        let soft = f.stock.reserve(f.user, f.product, f.shop, 2).unwrap();
        let bound = f
            .stock
            .reserve_for_order(OrderId::new(), f.user, f.product, f.shop, 3)
            .unwrap();

        assert!(f.stock.reap_expired(f.clock.now()).unwrap().is_empty());

        f.clock.advance(Duration::minutes(16));
        let reaped = f.stock.reap_expired(f.clock.now()).unwrap();
        assert_eq!(reaped, vec![soft]);
        assert_eq!(f.stock.reservations_for(row).unwrap(), vec![bound]);
        assert!(f.stock.reservation(soft.id).is_err());
    }

    #[test]
    fn list_for_product_returns_every_shop() {
        let (f, _) = fixture(1);
        f.stock.register_availability(f.product, ShopId::new(), 7).unwrap();
        f.stock.register_availability(ProductId::new(), f.shop, 9).unwrap();
        let rows = f.stock.list_for_product(f.product).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.product == f.product));
    }

    #[test]
    fn concurrent_reserves_never_oversell() {
        let (f, row) = fixture(5);
        let stock = Arc::new(f.stock);
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stock = stock.clone();
                let barrier = barrier.clone();
                let (product, shop) = (f.product, f.shop);
                thread::spawn(move || {
                    barrier.wait();
                    stock.reserve(UserId::new(), product, shop, 2).is_ok()
                })
            })
            .collect();
        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(granted, 2);
        assert_eq!(stock.free_amount(row).unwrap(), 1);
        stock.check_invariants().unwrap();
    }

    #[test]
    fn a_held_row_does_not_block_reserves_on_other_rows() {
        let (f, row_a) = fixture(5);
        let other_shop = ShopId::new();
        let row_b = f
            .stock
            .register_availability(f.product, other_shop, 5)
            .unwrap()
            .id;
        let stock = Arc::new(f.stock);

        let slot_a = stock.slot(row_a).unwrap();
        let held = slot_a.lock().unwrap();

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = {
            let stock = stock.clone();
            let (user, product) = (f.user, f.product);
            thread::spawn(move || {
                let _ = tx.send(stock.reserve(user, product, other_shop, 2));
            })
        };
        let result = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("reserve on row B waited for row A");
        assert!(result.is_ok());

        drop(held);
        worker.join().unwrap();
        assert_eq!(stock.free_amount(row_b).unwrap(), 3);
        assert_eq!(stock.free_amount(row_a).unwrap(), 5);
    }

    fn poison_reservation_index(stock: &ReservationManager) {
        thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _index = stock.by_reservation.write().unwrap();
                    panic!("index writer died");
                })
                .join();
        });
    }

    #[test]
    fn unindexable_hold_is_rolled_back() {
        let (f, row) = fixture(5);
        poison_reservation_index(&f.stock);

        let err = f.stock.reserve(f.user, f.product, f.shop, 2).unwrap_err();
        assert!(matches!(err, DomainError::StockInconsistency(_)));
        assert_eq!(f.stock.free_amount(row).unwrap(), 5);
        assert!(f.stock.reservations_for(row).unwrap().is_empty());
    }

    #[test]
    fn reaping_survives_a_poisoned_index() {
        let (f, row) = fixture(5);
        f.stock.reserve(f.user, f.product, f.shop, 2).unwrap();
        poison_reservation_index(&f.stock);

        f.clock.advance(Duration::minutes(16));
        let reaped = f.stock.reap_expired(f.clock.now()).unwrap();
        assert_eq!(reaped.len(), 1);
        assert_eq!(f.stock.free_amount(row).unwrap(), 5);
    }

    #[test]
    fn order_commits_are_remembered_until_settled() {
        let (f, _) = fixture(5);
        let order = OrderId::new();
        let bound = f
            .stock
            .reserve_for_order(order, f.user, f.product, f.shop, 2)
            .unwrap();
        let soft = f.stock.reserve(f.user, f.product, f.shop, 1).unwrap();
        assert!(!f.stock.is_committed(order).unwrap());

        f.stock.commit_all(&[bound.id, soft.id]).unwrap();
        assert!(f.stock.is_committed(order).unwrap());

        f.stock.settle_order(order);
        assert!(!f.stock.is_committed(order).unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn granted_amounts_never_exceed_stock(
            amount in 0i64..50,
            requests in prop::collection::vec(1i64..10, 1..30),
        ) {
            let (f, row) = fixture(amount);
            let mut granted = 0i64;
            for req in requests {
                if f.stock.reserve(f.user, f.product, f.shop, req).is_ok() {
                    granted += req;
                }
            }
            prop_assert!(granted <= amount);
            prop_assert_eq!(f.stock.free_amount(row).unwrap(), amount - granted);
        }
    }
}
