//! Catalog domain module.
//!
//! Products, categories, shops, images, reviews and favourites, plus the
//! computed fields of a product page. Pure data and validation (no IO, no storage).

pub mod category;
pub mod favourite;
pub mod image;
pub mod product;
pub mod review;
pub mod shop;
pub mod view;

pub use category::{Category, SubCategory};
pub use favourite::Favourite;
pub use image::{allowed_extension, ImageRef};
pub use product::{NewProduct, Product};
pub use review::{avg_stars, Review};
pub use shop::{Address, Shop};
pub use view::{ProductView, ShopAvailability};
