use serde::{Deserialize, Serialize};

use storefront_core::{DomainResult, Entity, ShopId};

use crate::product::validate_title;

/// Street address of a shop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub building: String,
}

/// A physical shop: stock location and pickup point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    pub id: ShopId,
    pub title: String,
    pub address: Address,
    pub description: Option<String>,
    pub preview: Option<String>,
}

impl Shop {
    pub fn new(id: ShopId, title: impl Into<String>, address: Address) -> DomainResult<Self> {
        Ok(Self {
            id,
            title: validate_title(title.into(), 64)?,
            address,
            description: None,
            preview: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Entity for Shop {
    type Id = ShopId;
    const NAME: &'static str = "shop";

    fn id(&self) -> ShopId {
        self.id
    }
}
