use serde::{Deserialize, Serialize};

use storefront_core::ShopId;

use crate::{Category, Product};

/// On-hand stock of one product at one shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopAvailability {
    pub shop: ShopId,
    pub amount: i64,
}

/// Read model of a product page: the product plus its computed fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductView {
    pub product: Product,
    pub category: Category,
    pub available: Vec<ShopAvailability>,
    pub variants: Vec<Product>,
    pub image_link: Option<String>,
    pub avg_stars: f64,
}
