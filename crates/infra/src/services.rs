//! Wiring of the in-memory storefront services.

use std::sync::Arc;

use storefront_auth::PermissionGate;
use storefront_core::Clock;

use crate::basket::BasketService;
use crate::catalog::InMemoryCatalog;
use crate::config::StorefrontConfig;
use crate::orders::InMemoryOrderStore;
use crate::reaper::{ReservationReaper, ReservationReaperHandle};
use crate::reservations::ReservationManager;
use crate::workflow::OrderWorkflow;

/// All services sharing one clock, one permission gate and one stock ledger.
#[derive(Clone)]
pub struct StorefrontServices {
    pub config: StorefrontConfig,
    pub clock: Arc<dyn Clock>,
    pub stock: Arc<ReservationManager>,
    pub catalog: Arc<InMemoryCatalog>,
    pub baskets: Arc<BasketService>,
    pub orders: Arc<InMemoryOrderStore>,
    pub workflow: Arc<OrderWorkflow>,
}

impl core::fmt::Debug for StorefrontServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StorefrontServices")
            .field("config", &self.config)
            .field("stock", &self.stock)
            .finish_non_exhaustive()
    }
}

impl StorefrontServices {
    pub fn build(
        config: StorefrontConfig,
        clock: Arc<dyn Clock>,
        gate: Arc<dyn PermissionGate>,
    ) -> Self {
        let stock = Arc::new(ReservationManager::new(
            clock.clone(),
            config.reservation_ttl_chrono(),
        ));
        let catalog = Arc::new(InMemoryCatalog::new(
            clock.clone(),
            gate.clone(),
            stock.clone(),
            config.image_base_url.clone(),
        ));
        let baskets = Arc::new(BasketService::new(clock.clone(), catalog.clone()));
        let orders = Arc::new(InMemoryOrderStore::new());
        let workflow = Arc::new(OrderWorkflow::new(
            clock.clone(),
            gate,
            catalog.clone(),
            stock.clone(),
            baskets.clone(),
            orders.clone(),
        ));

        Self {
            config,
            clock,
            stock,
            catalog,
            baskets,
            orders,
            workflow,
        }
    }

    /// Start the background reaper for expired soft reservations.
    pub fn spawn_reaper(&self) -> std::io::Result<ReservationReaperHandle> {
        ReservationReaper::from_config(&self.config).spawn(self.stock.clone(), self.clock.clone())
    }
}
