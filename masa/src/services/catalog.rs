use std::sync::Arc;

use garde::Validate;
use masa_core::validation::validate;
use masa_core::{ActionError, ActionResult, Clock, MessageKey, QueryCache};
use masa_data::{
    Category, CategoryRepository, CategoryUpdate, NewCategory, NewProduct, Product, ProductRepository,
    ProductUpdate,
};
use masa_security::StaffUser;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{menu_key, nullable, nullable_text};

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCategory {
    #[garde(length(chars, min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[garde(length(chars, max = 500))]
    pub description: Option<String>,
    #[serde(default)]
    #[garde(skip)]
    pub sort_order: i32,
    #[serde(default = "yes")]
    #[garde(skip)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCategory {
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 100))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[garde(custom(nullable_text(500)))]
    pub description: Option<Option<String>>,
    #[serde(default)]
    #[garde(skip)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    #[garde(skip)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProduct {
    #[garde(skip)]
    pub category_id: Uuid,
    #[garde(length(chars, min = 1, max = 150))]
    pub name: String,
    #[serde(default)]
    #[garde(length(chars, max = 1000))]
    pub description: Option<String>,
    #[garde(range(min = 0))]
    pub price_cents: i64,
    #[serde(default)]
    #[garde(length(max = 2048))]
    pub image_url: Option<String>,
    #[serde(default = "yes")]
    #[garde(skip)]
    pub is_available: bool,
    #[serde(default)]
    #[garde(skip)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProduct {
    #[serde(default)]
    #[garde(skip)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    #[garde(length(chars, min = 1, max = 150))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    #[garde(custom(nullable_text(1000)))]
    pub description: Option<Option<String>>,
    #[serde(default)]
    #[garde(range(min = 0))]
    pub price_cents: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    #[garde(custom(nullable_text(2048)))]
    pub image_url: Option<Option<String>>,
    #[serde(default)]
    #[garde(skip)]
    pub is_available: Option<bool>,
    #[serde(default)]
    #[garde(skip)]
    pub sort_order: Option<i32>,
}

/// Menu categories and products of the caller's organization.
///
/// Staff may read; owners write. Every write drops the cached public menu.
#[derive(Clone)]
pub struct CatalogService {
    categories: Arc<dyn CategoryRepository>,
    products: Arc<dyn ProductRepository>,
    cache: QueryCache<Value>,
    clock: Arc<dyn Clock>,
}

impl CatalogService {
    pub fn new(
        categories: Arc<dyn CategoryRepository>,
        products: Arc<dyn ProductRepository>,
        cache: QueryCache<Value>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            categories,
            products,
            cache,
            clock,
        }
    }

    fn menu_changed(&self, organization_id: Uuid) {
        self.cache.remove(&menu_key(organization_id));
    }

    async fn ensure_category(&self, organization_id: Uuid, category_id: Uuid) -> ActionResult<()> {
        match self.categories.find(organization_id, category_id).await? {
            Some(_) => Ok(()),
            None => Err(ActionError::not_found(MessageKey::CategoryNotFound)),
        }
    }

    pub async fn list_categories(&self, user: &StaffUser) -> ActionResult<Vec<Category>> {
        Ok(self.categories.list(user.organization()?).await?)
    }

    pub async fn create_category(&self, user: &StaffUser, input: CreateCategory) -> ActionResult<Category> {
        user.require_manager()?;
        validate(&input)?;
        let organization_id = user.organization()?;
        let category = self
            .categories
            .create(
                NewCategory {
                    organization_id,
                    name: input.name,
                    description: input.description,
                    sort_order: input.sort_order,
                    is_active: input.is_active,
                },
                self.clock.now(),
            )
            .await?;
        info!(%organization_id, category_id = %category.id, "Category created");
        self.menu_changed(organization_id);
        Ok(category)
    }

    pub async fn update_category(
        &self,
        user: &StaffUser,
        id: Uuid,
        input: UpdateCategory,
    ) -> ActionResult<Category> {
        user.require_manager()?;
        validate(&input)?;
        let organization_id = user.organization()?;
        let update = CategoryUpdate {
            name: input.name,
            description: input.description,
            sort_order: input.sort_order,
            is_active: input.is_active,
        };
        let category = self
            .categories
            .update(organization_id, id, update)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::CategoryNotFound))?;
        self.menu_changed(organization_id);
        Ok(category)
    }

    /// Deleting a category deletes its products.
    pub async fn delete_category(&self, user: &StaffUser, id: Uuid) -> ActionResult<()> {
        user.require_manager()?;
        let organization_id = user.organization()?;
        if !self.categories.delete(organization_id, id).await? {
            return Err(ActionError::not_found(MessageKey::CategoryNotFound));
        }
        info!(%organization_id, category_id = %id, "Category deleted");
        self.menu_changed(organization_id);
        Ok(())
    }

    pub async fn list_products(&self, user: &StaffUser, category_id: Option<Uuid>) -> ActionResult<Vec<Product>> {
        Ok(self.products.list(user.organization()?, category_id).await?)
    }

    pub async fn create_product(&self, user: &StaffUser, input: CreateProduct) -> ActionResult<Product> {
        user.require_manager()?;
        validate(&input)?;
        let organization_id = user.organization()?;
        self.ensure_category(organization_id, input.category_id).await?;
        let product = self
            .products
            .create(
                NewProduct {
                    organization_id,
                    category_id: input.category_id,
                    name: input.name,
                    description: input.description,
                    price_cents: input.price_cents,
                    image_url: input.image_url,
                    is_available: input.is_available,
                    sort_order: input.sort_order,
                },
                self.clock.now(),
            )
            .await?;
        info!(%organization_id, product_id = %product.id, "Product created");
        self.menu_changed(organization_id);
        Ok(product)
    }

    pub async fn update_product(&self, user: &StaffUser, id: Uuid, input: UpdateProduct) -> ActionResult<Product> {
        user.require_manager()?;
        validate(&input)?;
        let organization_id = user.organization()?;
        if let Some(category_id) = input.category_id {
            self.ensure_category(organization_id, category_id).await?;
        }
        let update = ProductUpdate {
            category_id: input.category_id,
            name: input.name,
            description: input.description,
            price_cents: input.price_cents,
            image_url: input.image_url,
            is_available: input.is_available,
            sort_order: input.sort_order,
        };
        self.save_product(organization_id, id, update).await
    }

    /// Staff may toggle availability (sold out / back on the menu).
    pub async fn set_availability(&self, user: &StaffUser, id: Uuid, available: bool) -> ActionResult<Product> {
        let organization_id = user.organization()?;
        let update = ProductUpdate {
            is_available: Some(available),
            ..ProductUpdate::default()
        };
        let product = self.save_product(organization_id, id, update).await?;
        info!(%organization_id, product_id = %id, available, "Product availability changed");
        Ok(product)
    }

    async fn save_product(&self, organization_id: Uuid, id: Uuid, update: ProductUpdate) -> ActionResult<Product> {
        let product = self
            .products
            .update(organization_id, id, update)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::ProductNotFound))?;
        self.menu_changed(organization_id);
        Ok(product)
    }

    pub async fn delete_product(&self, user: &StaffUser, id: Uuid) -> ActionResult<()> {
        user.require_manager()?;
        let organization_id = user.organization()?;
        if !self.products.delete(organization_id, id).await? {
            return Err(ActionError::not_found(MessageKey::ProductNotFound));
        }
        self.menu_changed(organization_id);
        Ok(())
    }
}
