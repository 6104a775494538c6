//! Infrastructure layer: shared state, locking, configuration and the services
//! that orchestrate the storefront domain crates.

pub mod basket;
pub mod catalog;
pub mod config;
pub mod locks;
pub mod orders;
pub mod reaper;
pub mod reservations;
pub mod services;
pub mod store;
pub mod workflow;


pub use basket::BasketService;
pub use catalog::InMemoryCatalog;
pub use config::{ConfigError, StorefrontConfig};
pub use orders::{InMemoryOrderStore, OrderStore, StoredOrderEvent};
pub use reaper::{ReservationReaper, ReservationReaperHandle};
pub use reservations::ReservationManager;
pub use services::StorefrontServices;
pub use workflow::OrderWorkflow;
