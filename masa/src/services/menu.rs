use std::collections::HashMap;
use std::sync::Arc;

use masa_core::{ActionError, ActionResult, MessageKey, QueryCache};
use masa_data::{
    Category, CategoryRepository, Organization, OrganizationRepository, Product, ProductRepository,
    TableRepository,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use super::menu_key;

/// Settings key holding values never shown to guests.
const PRIVATE_SETTINGS: &str = "private";

#[derive(Debug, Serialize)]
struct PublicOrganization<'a> {
    id: Uuid,
    name: &'a str,
    slug: &'a str,
    theme: &'a Value,
    settings: Value,
}

#[derive(Debug, Serialize)]
struct MenuCategory<'a> {
    #[serde(flatten)]
    category: &'a Category,
    products: Vec<&'a Product>,
}

#[derive(Debug, Serialize)]
struct Menu<'a> {
    organization: PublicOrganization<'a>,
    categories: Vec<MenuCategory<'a>>,
}

#[derive(Debug, Serialize)]
struct PublicTable {
    id: Uuid,
    name: String,
    capacity: i32,
}

/// Read-only views served to guests.
#[derive(Clone)]
pub struct MenuService {
    organizations: Arc<dyn OrganizationRepository>,
    categories: Arc<dyn CategoryRepository>,
    products: Arc<dyn ProductRepository>,
    tables: Arc<dyn TableRepository>,
    cache: QueryCache<Value>,
}

impl MenuService {
    pub fn new(
        organizations: Arc<dyn OrganizationRepository>,
        categories: Arc<dyn CategoryRepository>,
        products: Arc<dyn ProductRepository>,
        tables: Arc<dyn TableRepository>,
        cache: QueryCache<Value>,
    ) -> Self {
        Self {
            organizations,
            categories,
            products,
            tables,
            cache,
        }
    }

    async fn organization(&self, slug: &str) -> ActionResult<Organization> {
        self.organizations
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| ActionError::not_found(MessageKey::OrganizationNotFound))
    }

    /// Active categories with their available products, both in `sort_order`.
    pub async fn menu(&self, slug: &str) -> ActionResult<Value> {
        let organization = self.organization(slug).await?;
        self.cached_menu(&organization).await
    }

    async fn cached_menu(&self, organization: &Organization) -> ActionResult<Value> {
        self.cache
            .get_or_try_insert(&menu_key(organization.id), || self.build(organization))
            .await
    }

    async fn build(&self, organization: &Organization) -> ActionResult<Value> {
        let categories = self.categories.list(organization.id).await?;
        let products = self.products.list(organization.id, None).await?;

        let mut by_category: HashMap<Uuid, Vec<&Product>> = HashMap::new();
        for product in products.iter().filter(|p| p.is_available) {
            by_category.entry(product.category_id).or_default().push(product);
        }

        let mut settings = organization.settings.clone();
        if let Some(map) = settings.as_object_mut() {
            map.remove(PRIVATE_SETTINGS);
        }

        let menu = Menu {
            organization: PublicOrganization {
                id: organization.id,
                name: &organization.name,
                slug: &organization.slug,
                theme: &organization.theme,
                settings,
            },
            categories: categories
                .iter()
                .filter(|c| c.is_active)
                .map(|category| MenuCategory {
                    category,
                    products: by_category.remove(&category.id).unwrap_or_default(),
                })
                .collect(),
        };
        serde_json::to_value(menu).map_err(|e| ActionError::unknown(e.to_string()))
    }

    /// QR landing: the scanned table plus the menu.
    pub async fn landing(&self, slug: &str, qr_token: &str) -> ActionResult<Value> {
        let organization = self.organization(slug).await?;
        let table = self
            .tables
            .find_by_qr_token(organization.id, qr_token)
            .await?
            .filter(|t| t.is_active)
            .ok_or_else(|| ActionError::not_found(MessageKey::TableNotFound))?;
        let menu = self.cached_menu(&organization).await?;
        Ok(serde_json::json!({
            "table": PublicTable {
                id: table.id,
                name: table.name,
                capacity: table.capacity,
            },
            "menu": menu,
        }))
    }

    /// KVKK / privacy texts.
    pub async fn legal(&self, slug: &str) -> ActionResult<Value> {
        Ok(self.organization(slug).await?.legal)
    }
}
