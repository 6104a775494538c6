use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_core::{
    CategoryId, DomainError, DomainResult, Entity, ImageId, ProductId, SubCategoryId,
};

/// Catalog product.
///
/// A product with `is_child` set is a variant (size, flavour, colour) of its
/// `parent` product and is sold on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: Option<String>,
    /// Price in smallest currency unit (e.g., kopecks).
    pub price: u64,
    pub image: Option<ImageId>,
    pub is_child: bool,
    pub parent: Option<ProductId>,
    pub category: CategoryId,
    pub subcategory: Option<SubCategoryId>,
    /// Free-form technical specifications shown on the product page.
    pub specifications: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;
    const NAME: &'static str = "product";

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub description: Option<String>,
    pub price: u64,
    pub image: Option<ImageId>,
    pub is_child: bool,
    pub parent: Option<ProductId>,
    pub category: CategoryId,
    pub subcategory: Option<SubCategoryId>,
    pub specifications: Option<JsonValue>,
}

impl NewProduct {
    pub fn new(title: impl Into<String>, price: u64, category: CategoryId) -> Self {
        Self {
            title: title.into(),
            description: None,
            price,
            image: None,
            is_child: false,
            parent: None,
            category,
            subcategory: None,
            specifications: None,
        }
    }

    pub fn variant_of(mut self, parent: ProductId) -> Self {
        self.is_child = true;
        self.parent = Some(parent);
        self
    }

    pub fn with_subcategory(mut self, subcategory: SubCategoryId) -> Self {
        self.subcategory = Some(subcategory);
        self
    }

    pub fn with_image(mut self, image: ImageId) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_specifications(mut self, specifications: JsonValue) -> Self {
        self.specifications = Some(specifications);
        self
    }

    /// Validate field-level rules and build the product.
    ///
    /// Referential checks (category, parent, image exist) are the store's job.
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> DomainResult<Product> {
        let title = validate_title(self.title, 64)?;
        if self.price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        if self.is_child != self.parent.is_some() {
            return Err(DomainError::validation(
                "a child product must reference its parent (and only a child may)",
            ));
        }
        if self.parent == Some(id) {
            return Err(DomainError::validation("a product cannot be its own parent"));
        }
        if let Some(description) = &self.description {
            if description.chars().count() > 1024 {
                return Err(DomainError::validation("description is too long"));
            }
        }

        Ok(Product {
            id,
            title,
            description: self.description,
            price: self.price,
            image: self.image,
            is_child: self.is_child,
            parent: self.parent,
            category: self.category,
            subcategory: self.subcategory,
            specifications: self.specifications,
            created_at,
        })
    }
}

/// Trim a title and check it is non-empty and at most `max` characters.
pub(crate) fn validate_title(title: String, max: usize) -> DomainResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("title cannot be empty"));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "title must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewProduct {
        NewProduct::new("  Hookah Classic  ", 450_000, CategoryId::new())
    }

    #[test]
    fn builds_product_with_trimmed_title() {
        let product = draft().into_product(ProductId::new(), Utc::now()).unwrap();
        assert_eq!(product.title, "Hookah Classic");
        assert_eq!(product.price, 450_000);
        assert!(!product.is_child);
    }

    #[test]
    fn rejects_zero_price() {
        let mut input = draft();
        input.price = 0;
        assert!(matches!(
            input.into_product(ProductId::new(), Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn rejects_blank_or_long_title() {
        let mut blank = draft();
        blank.title = "   ".into();
        assert!(blank.into_product(ProductId::new(), Utc::now()).is_err());

        let mut long = draft();
        long.title = "x".repeat(65);
        assert!(long.into_product(ProductId::new(), Utc::now()).is_err());
    }

    #[test]
    fn child_flag_and_parent_must_agree() {
        let mut orphan = draft();
        orphan.is_child = true;
        assert!(orphan.into_product(ProductId::new(), Utc::now()).is_err());

        let parent = ProductId::new();
        let child = draft()
            .variant_of(parent)
            .into_product(ProductId::new(), Utc::now())
            .unwrap();
        assert_eq!(child.parent, Some(parent));

        let id = ProductId::new();
        assert!(draft().variant_of(id).into_product(id, Utc::now()).is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: any non-blank title of at most 64 chars and positive price is accepted.
            #[test]
            fn valid_inputs_are_accepted(
                title in "[A-Za-z][A-Za-z0-9 ]{0,63}",
                price in 1u64..10_000_000
            ) {
                let input = NewProduct::new(title.clone(), price, CategoryId::new());
                let product = input.into_product(ProductId::new(), Utc::now()).unwrap();
                prop_assert_eq!(product.title, title.trim().to_string());
                prop_assert_eq!(product.price, price);
            }
        }
    }
}
