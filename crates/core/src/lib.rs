//! `storefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod clock;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, StockShortage};
pub use event::Event;
pub use id::{
    AvailabilityId, CategoryId, FavouriteId, ImageId, OrderId, ProductId, ReservationId,
    ReviewId, ShopId, SubCategoryId, UserId,
};
