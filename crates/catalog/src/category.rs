use serde::{Deserialize, Serialize};

use storefront_core::{CategoryId, DomainError, DomainResult, Entity, SubCategoryId};

use crate::product::validate_title;

/// Top-level catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    /// Age-restricted goods (hidden from minors by the storefront).
    pub not_for_children: bool,
}

impl Category {
    pub fn new(id: CategoryId, title: impl Into<String>, not_for_children: bool) -> DomainResult<Self> {
        let title = validate_title(title.into(), 64)?;
        Ok(Self {
            id,
            title,
            not_for_children,
        })
    }
}

impl Entity for Category {
    type Id = CategoryId;
    const NAME: &'static str = "category";

    fn id(&self) -> CategoryId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub category: CategoryId,
    pub title: String,
}

impl SubCategory {
    pub fn new(id: SubCategoryId, category: CategoryId, title: impl Into<String>) -> DomainResult<Self> {
        let title = validate_title(title.into(), 64)?;
        Ok(Self { id, category, title })
    }

    /// A subcategory can only classify products of its own category.
    pub fn ensure_belongs_to(&self, category: CategoryId) -> DomainResult<()> {
        if self.category != category {
            return Err(DomainError::validation(format!(
                "subcategory {} does not belong to category {}",
                self.id, category
            )));
        }
        Ok(())
    }
}

impl Entity for SubCategory {
    type Id = SubCategoryId;
    const NAME: &'static str = "subcategory";

    fn id(&self) -> SubCategoryId {
        self.id
    }
}
