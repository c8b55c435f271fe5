//! In-memory backend for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{DataError, DataResult};
use crate::models::*;
use crate::page::{Page, Pageable};
use crate::repository::*;

/// One process-local store implementing every repository.
#[derive(Default)]
pub struct MemoryStore {
    organizations: DashMap<Uuid, Organization>,
    slugs: DashMap<String, Uuid>,
    profiles: DashMap<Uuid, Profile>,
    emails: DashMap<String, Uuid>,
    resets: DashMap<String, PasswordReset>,
    tables: DashMap<Uuid, Table>,
    categories: DashMap<Uuid, Category>,
    products: DashMap<Uuid, Product>,
    requests: DashMap<Uuid, ServiceRequest>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_sort_order<T>(items: &mut [T], key: impl Fn(&T) -> (i32, String)) {
    items.sort_by_key(|item| key(item));
}

#[async_trait]
impl OrganizationRepository for MemoryStore {
    async fn find(&self, id: Uuid) -> DataResult<Option<Organization>> {
        Ok(self.organizations.get(&id).map(|o| o.clone()))
    }

    async fn find_by_slug(&self, slug: &str) -> DataResult<Option<Organization>> {
        let id = self.slugs.get(slug).map(|id| *id);
        Ok(id.and_then(|id| self.organizations.get(&id).map(|o| o.clone())))
    }

    async fn list(&self) -> DataResult<Vec<Organization>> {
        let mut all: Vec<Organization> = self.organizations.iter().map(|o| o.clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.slug.cmp(&b.slug)));
        Ok(all)
    }

    async fn create(&self, new: NewOrganization, now: DateTime<Utc>) -> DataResult<Organization> {
        let id = Uuid::new_v4();
        match self.slugs.entry(new.slug.clone()) {
            Entry::Occupied(_) => return Err(DataError::Conflict(format!("slug '{}' is taken", new.slug))),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        let org = Organization {
            id,
            name: new.name,
            slug: new.slug,
            settings: json!({}),
            theme: json!({}),
            legal: json!({}),
            created_at: now,
            updated_at: now,
        };
        self.organizations.insert(id, org.clone());
        Ok(org)
    }

    async fn write_document(
        &self,
        id: Uuid,
        document: OrgDocument,
        value: Value,
        now: DateTime<Utc>,
    ) -> DataResult<Option<Organization>> {
        Ok(self.organizations.get_mut(&id).map(|mut org| {
            match document {
                OrgDocument::Settings => org.settings = value,
                OrgDocument::Theme => org.theme = value,
                OrgDocument::Legal => org.legal = value,
            }
            org.updated_at = now;
            org.clone()
        }))
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn find(&self, id: Uuid) -> DataResult<Option<Profile>> {
        Ok(self.profiles.get(&id).map(|p| p.clone()))
    }

    async fn find_by_email(&self, email: &str) -> DataResult<Option<Profile>> {
        let id = self.emails.get(&email.to_lowercase()).map(|id| *id);
        Ok(id.and_then(|id| self.profiles.get(&id).map(|p| p.clone())))
    }

    async fn list(&self) -> DataResult<Vec<Profile>> {
        let mut all: Vec<Profile> = self.profiles.iter().map(|p| p.clone()).collect();
        all.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(all)
    }

    async fn create(&self, new: NewProfile, now: DateTime<Utc>) -> DataResult<Profile> {
        let id = Uuid::new_v4();
        let email = new.email.to_lowercase();
        match self.emails.entry(email.clone()) {
            Entry::Occupied(_) => return Err(DataError::Conflict(format!("email '{email}' is taken"))),
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }
        let profile = Profile {
            id,
            organization_id: new.organization_id,
            email,
            full_name: new.full_name,
            role: new.role,
            password_hash: new.password_hash,
            created_at: now,
        };
        self.profiles.insert(id, profile.clone());
        Ok(profile)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> DataResult<Option<Profile>> {
        Ok(self.profiles.get_mut(&id).map(|mut p| {
            p.role = role;
            p.clone()
        }))
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DataResult<bool> {
        Ok(self
            .profiles
            .get_mut(&id)
            .map(|mut p| p.password_hash = password_hash.to_string())
            .is_some())
    }
}

#[async_trait]
impl PasswordResetRepository for MemoryStore {
    async fn insert(&self, reset: PasswordReset) -> DataResult<()> {
        self.resets.insert(reset.token.clone(), reset);
        Ok(())
    }

    async fn take(&self, token: &str) -> DataResult<Option<PasswordReset>> {
        Ok(self.resets.remove(token).map(|(_, reset)| reset))
    }
}

#[async_trait]
impl TableRepository for MemoryStore {
    async fn list(&self, organization_id: Uuid) -> DataResult<Vec<Table>> {
        let mut tables: Vec<Table> = self
            .tables
            .iter()
            .filter(|t| t.organization_id == organization_id)
            .map(|t| t.clone())
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tables)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Table>> {
        Ok(self
            .tables
            .get(&id)
            .filter(|t| t.organization_id == organization_id)
            .map(|t| t.clone()))
    }

    async fn find_by_qr_token(&self, organization_id: Uuid, qr_token: &str) -> DataResult<Option<Table>> {
        Ok(self
            .tables
            .iter()
            .find(|t| t.organization_id == organization_id && t.qr_token == qr_token)
            .map(|t| t.clone()))
    }

    async fn create(&self, new: NewTable, now: DateTime<Utc>) -> DataResult<Table> {
        if self.tables.iter().any(|t| t.qr_token == new.qr_token) {
            return Err(DataError::Conflict("qr token is taken".into()));
        }
        let table = Table {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            name: new.name,
            capacity: new.capacity,
            qr_token: new.qr_token,
            is_active: new.is_active,
            created_at: now,
        };
        self.tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn update(&self, organization_id: Uuid, id: Uuid, update: TableUpdate) -> DataResult<Option<Table>> {
        let Some(mut table) = self.tables.get_mut(&id).filter(|t| t.organization_id == organization_id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            table.name = name;
        }
        if let Some(capacity) = update.capacity {
            table.capacity = capacity;
        }
        if let Some(is_active) = update.is_active {
            table.is_active = is_active;
        }
        Ok(Some(table.clone()))
    }

    async fn set_qr_token(&self, organization_id: Uuid, id: Uuid, qr_token: &str) -> DataResult<Option<Table>> {
        Ok(self
            .tables
            .get_mut(&id)
            .filter(|t| t.organization_id == organization_id)
            .map(|mut t| {
                t.qr_token = qr_token.to_string();
                t.clone()
            }))
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Vec<ServiceRequest>>> {
        if self
            .tables
            .remove_if(&id, |_, t| t.organization_id == organization_id)
            .is_none()
        {
            return Ok(None);
        }
        let mut removed = Vec::new();
        self.requests.retain(|_, r| {
            if r.table_id == id {
                removed.push(r.clone());
                false
            } else {
                true
            }
        });
        Ok(Some(removed))
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn list(&self, organization_id: Uuid) -> DataResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .categories
            .iter()
            .filter(|c| c.organization_id == organization_id)
            .map(|c| c.clone())
            .collect();
        by_sort_order(&mut categories, |c| (c.sort_order, c.name.clone()));
        Ok(categories)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Category>> {
        Ok(self
            .categories
            .get(&id)
            .filter(|c| c.organization_id == organization_id)
            .map(|c| c.clone()))
    }

    async fn create(&self, new: NewCategory, now: DateTime<Utc>) -> DataResult<Category> {
        let category = Category {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            name: new.name,
            description: new.description,
            sort_order: new.sort_order,
            is_active: new.is_active,
            created_at: now,
        };
        self.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, organization_id: Uuid, id: Uuid, update: CategoryUpdate) -> DataResult<Option<Category>> {
        let Some(mut category) = self
            .categories
            .get_mut(&id)
            .filter(|c| c.organization_id == organization_id)
        else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            category.name = name;
        }
        if let Some(description) = update.description {
            category.description = description;
        }
        if let Some(sort_order) = update.sort_order {
            category.sort_order = sort_order;
        }
        if let Some(is_active) = update.is_active {
            category.is_active = is_active;
        }
        Ok(Some(category.clone()))
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<bool> {
        let removed = self
            .categories
            .remove_if(&id, |_, c| c.organization_id == organization_id)
            .is_some();
        if removed {
            self.products.retain(|_, p| p.category_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self, organization_id: Uuid, category_id: Option<Uuid>) -> DataResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .filter(|p| category_id.map_or(true, |c| p.category_id == c))
            .map(|p| p.clone())
            .collect();
        by_sort_order(&mut products, |p| (p.sort_order, p.name.clone()));
        Ok(products)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Product>> {
        Ok(self
            .products
            .get(&id)
            .filter(|p| p.organization_id == organization_id)
            .map(|p| p.clone()))
    }

    async fn create(&self, new: NewProduct, now: DateTime<Utc>) -> DataResult<Product> {
        let product = Product {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            category_id: new.category_id,
            name: new.name,
            description: new.description,
            price_cents: new.price_cents,
            image_url: new.image_url,
            is_available: new.is_available,
            sort_order: new.sort_order,
            created_at: now,
        };
        self.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(&self, organization_id: Uuid, id: Uuid, update: ProductUpdate) -> DataResult<Option<Product>> {
        let Some(mut product) = self
            .products
            .get_mut(&id)
            .filter(|p| p.organization_id == organization_id)
        else {
            return Ok(None);
        };
        if let Some(category_id) = update.category_id {
            product.category_id = category_id;
        }
        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price_cents) = update.price_cents {
            product.price_cents = price_cents;
        }
        if let Some(image_url) = update.image_url {
            product.image_url = image_url;
        }
        if let Some(is_available) = update.is_available {
            product.is_available = is_available;
        }
        if let Some(sort_order) = update.sort_order {
            product.sort_order = sort_order;
        }
        Ok(Some(product.clone()))
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<bool> {
        Ok(self
            .products
            .remove_if(&id, |_, p| p.organization_id == organization_id)
            .is_some())
    }
}

#[async_trait]
impl ServiceRequestRepository for MemoryStore {
    async fn count_since(&self, table_id: Uuid, since: DateTime<Utc>) -> DataResult<u64> {
        Ok(self
            .requests
            .iter()
            .filter(|r| r.table_id == table_id && r.created_at >= since)
            .count() as u64)
    }

    async fn insert(&self, new: NewServiceRequest, now: DateTime<Utc>) -> DataResult<ServiceRequest> {
        let request = ServiceRequest {
            id: Uuid::new_v4(),
            organization_id: new.organization_id,
            table_id: new.table_id,
            request_type: new.request_type,
            status: RequestStatus::Pending,
            message: new.message,
            session_id: new.session_id,
            created_at: now,
            acknowledged_at: None,
            completed_at: None,
            handled_by: None,
        };
        self.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<ServiceRequest>> {
        Ok(self
            .requests
            .get(&id)
            .filter(|r| r.organization_id == organization_id)
            .map(|r| r.clone()))
    }

    async fn list(
        &self,
        organization_id: Uuid,
        status: Option<RequestStatus>,
        pageable: Pageable,
    ) -> DataResult<Page<ServiceRequest>> {
        let mut rows: Vec<ServiceRequest> = self
            .requests
            .iter()
            .filter(|r| r.organization_id == organization_id)
            .filter(|r| status.map_or(true, |s| r.status == s))
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        let total = rows.len() as u64;
        let content = rows
            .into_iter()
            .skip(pageable.offset() as usize)
            .take(pageable.limit() as usize)
            .collect();
        Ok(Page::new(content, &pageable, total))
    }

    async fn transition(
        &self,
        organization_id: Uuid,
        id: Uuid,
        transition: Transition,
        handled_by: Uuid,
        now: DateTime<Utc>,
    ) -> DataResult<TransitionOutcome> {
        // The shard lock held by `get_mut` makes check-and-set atomic per row.
        let Some(mut row) = self
            .requests
            .get_mut(&id)
            .filter(|r| r.organization_id == organization_id)
        else {
            return Ok(TransitionOutcome::NotFound);
        };
        if !transition.can_apply(row.status) {
            return Ok(TransitionOutcome::InvalidState(row.status));
        }
        let old = row.clone();
        let new = transition.apply(&old, handled_by, now);
        *row = new.clone();
        Ok(TransitionOutcome::Updated { old, new })
    }

    async fn pending_ids(&self, organization_id: Uuid) -> DataResult<Vec<Uuid>> {
        Ok(self
            .requests
            .iter()
            .filter(|r| r.organization_id == organization_id && r.status.is_pending())
            .map(|r| r.id)
            .collect())
    }
}
