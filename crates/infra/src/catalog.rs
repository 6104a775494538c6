//! Catalog store: products, categories, shops, images, reviews and favourites.
//!
//! Reads are side-effect free. Admin writes are gated by `catalog.manage`
//! (images by `admin.s3.upload`). Stock rows are owned by the
//! [`ReservationManager`]; the catalog only validates references before
//! delegating to it.

use std::sync::Arc;

use tracing::{debug, info};

use storefront_auth::{authorize, Actor, Permission, PermissionGate};
use storefront_catalog::{
    avg_stars, Address, Category, Favourite, ImageRef, NewProduct, Product, ProductView, Review,
    Shop, ShopAvailability, SubCategory,
};
use storefront_core::{
    CategoryId, Clock, DomainError, DomainResult, FavouriteId, ImageId, ProductId, ReviewId,
    ShopId, SubCategoryId, UserId,
};
use storefront_inventory::Availability;

use crate::reservations::ReservationManager;
use crate::store::InMemoryTable;

pub struct InMemoryCatalog {
    clock: Arc<dyn Clock>,
    gate: Arc<dyn PermissionGate>,
    stock: Arc<ReservationManager>,
    image_base_url: String,
    categories: InMemoryTable<Category>,
    subcategories: InMemoryTable<SubCategory>,
    shops: InMemoryTable<Shop>,
    images: InMemoryTable<ImageRef>,
    products: InMemoryTable<Product>,
    reviews: InMemoryTable<Review>,
    favourites: InMemoryTable<Favourite>,
}

impl core::fmt::Debug for InMemoryCatalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InMemoryCatalog")
            .field("image_base_url", &self.image_base_url)
            .finish_non_exhaustive()
    }
}

impl InMemoryCatalog {
    pub fn new(
        clock: Arc<dyn Clock>,
        gate: Arc<dyn PermissionGate>,
        stock: Arc<ReservationManager>,
        image_base_url: impl Into<String>,
    ) -> Self {
        Self {
            clock,
            gate,
            stock,
            image_base_url: image_base_url.into(),
            categories: InMemoryTable::new(),
            subcategories: InMemoryTable::new(),
            shops: InMemoryTable::new(),
            images: InMemoryTable::new(),
            products: InMemoryTable::new(),
            reviews: InMemoryTable::new(),
            favourites: InMemoryTable::new(),
        }
    }

    // ---- admin writes ------------------------------------------------------

    pub fn add_category(
        &self,
        actor: Actor,
        title: &str,
        not_for_children: bool,
    ) -> DomainResult<Category> {
        authorize(&*self.gate, actor, &Permission::CATALOG_MANAGE)?;
        let category = self
            .categories
            .insert(Category::new(CategoryId::new(), title, not_for_children)?)?;
        info!(category = %category.id, title = %category.title, "category added");
        Ok(category)
    }

    pub fn add_subcategory(
        &self,
        actor: Actor,
        category: CategoryId,
        title: &str,
    ) -> DomainResult<SubCategory> {
        authorize(&*self.gate, actor, &Permission::CATALOG_MANAGE)?;
        self.categories.get(category)?;
        self.subcategories
            .insert(SubCategory::new(SubCategoryId::new(), category, title)?)
    }

    pub fn add_shop(&self, actor: Actor, title: &str, address: Address) -> DomainResult<Shop> {
        authorize(&*self.gate, actor, &Permission::CATALOG_MANAGE)?;
        let shop = self.shops.insert(Shop::new(ShopId::new(), title, address)?)?;
        info!(shop = %shop.id, title = %shop.title, "shop added");
        Ok(shop)
    }

    /// Record an uploaded image; only png/jpg/jpeg are accepted.
    pub fn register_image(&self, actor: Actor, filename: &str) -> DomainResult<ImageRef> {
        authorize(&*self.gate, actor, &Permission::IMAGES_UPLOAD)?;
        let image = self.images.insert(ImageRef::from_upload(ImageId::new(), filename)?)?;
        info!(image = %image.id, key = %image.link, "image registered");
        Ok(image)
    }

    pub fn add_product(&self, actor: Actor, new: NewProduct) -> DomainResult<Product> {
        authorize(&*self.gate, actor, &Permission::CATALOG_MANAGE)?;

        self.categories.get(new.category)?;
        if let Some(subcategory) = new.subcategory {
            self.subcategories.get(subcategory)?.ensure_belongs_to(new.category)?;
        }
        if let Some(parent) = new.parent {
            if self.products.get(parent)?.is_child {
                return Err(DomainError::validation(format!(
                    "product {parent} is itself a variant and cannot have variants"
                )));
            }
        }
        if let Some(image) = new.image {
            self.images.get(image)?;
        }

        let product = self
            .products
            .insert(new.into_product(ProductId::new(), self.clock.now())?)?;
        info!(product = %product.id, title = %product.title, price = product.price, "product added");
        Ok(product)
    }

    /// Change the list price. Placed orders keep their snapshot.
    pub fn update_price(&self, actor: Actor, id: ProductId, price: u64) -> DomainResult<Product> {
        authorize(&*self.gate, actor, &Permission::CATALOG_MANAGE)?;
        if price == 0 {
            return Err(DomainError::validation("price must be positive"));
        }
        let product = self.products.update(id, |p| {
            p.price = price;
            Ok(p.clone())
        })?;
        info!(product = %id, price, "price updated");
        Ok(product)
    }

    /// Open a stock row for a product at a shop.
    pub fn register_availability(
        &self,
        actor: Actor,
        product: ProductId,
        shop: ShopId,
        amount: i64,
    ) -> DomainResult<Availability> {
        authorize(&*self.gate, actor, &Permission::CATALOG_MANAGE)?;
        self.products.get(product)?;
        self.shops.get(shop)?;
        self.stock.register_availability(product, shop, amount)
    }

    pub fn add_review(
        &self,
        user: UserId,
        product: ProductId,
        stars: u8,
        text: Option<String>,
    ) -> DomainResult<Review> {
        self.products.get(product)?;
        let review = Review::new(ReviewId::new(), product, user, stars, text, self.clock.now())?;
        self.reviews.insert(review)
    }

    /// Like a product. Liking it again returns the existing row.
    pub fn add_favourite(&self, user: UserId, product: ProductId) -> DomainResult<Favourite> {
        self.products.get(product)?;
        let now = self.clock.now();
        let (favourite, inserted) = self.favourites.find_or_insert(
            |f| f.is(user, product),
            || Favourite::new(FavouriteId::new(), user, product, now),
        )?;
        if inserted {
            debug!(user = %user, product = %product, "favourite added");
        }
        Ok(favourite)
    }

    /// Unlike a product; `false` when it was not liked.
    pub fn remove_favourite(&self, user: UserId, product: ProductId) -> DomainResult<bool> {
        self.products.get(product)?;
        let removed = self.favourites.remove_where(|f| f.is(user, product))?;
        Ok(!removed.is_empty())
    }

    /// A user's favourites, oldest first.
    pub fn list_favourites(&self, user: UserId) -> Vec<Favourite> {
        let mut favourites = self.favourites.filter(|f| f.user == user);
        favourites.sort_by_key(|f| (f.created_at, f.id));
        favourites
    }

    // ---- reads -------------------------------------------------------------

    pub fn get_product(&self, id: ProductId) -> DomainResult<Product> {
        self.products.get(id)
    }

    pub fn get_category(&self, id: CategoryId) -> DomainResult<Category> {
        self.categories.get(id)
    }

    pub fn get_shop(&self, id: ShopId) -> DomainResult<Shop> {
        self.shops.get(id)
    }

    pub fn list_shops(&self) -> Vec<Shop> {
        let mut shops = self.shops.list();
        shops.sort_by(|a, b| a.title.cmp(&b.title));
        shops
    }

    /// Products, optionally restricted to one category, oldest first.
    pub fn list_products(&self, category: Option<CategoryId>) -> Vec<Product> {
        let mut products = self
            .products
            .filter(|p| category.is_none_or(|c| p.category == c));
        products.sort_by_key(|p| (p.created_at, p.id));
        products
    }

    /// Variants of `parent`.
    pub fn child_products(&self, parent: ProductId) -> DomainResult<Vec<Product>> {
        self.products.get(parent)?;
        let mut children = self.products.filter(|p| p.parent == Some(parent));
        children.sort_by_key(|p| (p.created_at, p.id));
        Ok(children)
    }

    /// On-hand stock of a product per shop.
    pub fn list_availability(&self, product: ProductId) -> DomainResult<Vec<ShopAvailability>> {
        self.products.get(product)?;
        Ok(self
            .stock
            .list_for_product(product)?
            .into_iter()
            .map(|a| ShopAvailability {
                shop: a.shop,
                amount: a.amount,
            })
            .collect())
    }

    pub fn list_reviews(&self, product: ProductId) -> Vec<Review> {
        let mut reviews = self.reviews.filter(|r| r.product == product);
        reviews.sort_by_key(|r| (r.created_at, r.id));
        reviews
    }

    pub fn avg_stars(&self, product: ProductId) -> f64 {
        avg_stars(&self.list_reviews(product))
    }

    /// Public URL of the product image, `None` when it has none.
    pub fn image_link(&self, product: &Product) -> DomainResult<Option<String>> {
        match product.image {
            None => Ok(None),
            Some(image) => Ok(Some(self.images.get(image)?.url(&self.image_base_url))),
        }
    }

    pub fn product_view(&self, id: ProductId) -> DomainResult<ProductView> {
        let product = self.products.get(id)?;
        Ok(ProductView {
            category: self.categories.get(product.category)?,
            available: self.list_availability(id)?,
            variants: self.child_products(id)?,
            image_link: self.image_link(&product)?,
            avg_stars: self.avg_stars(id),
            product,
        })
    }
}
