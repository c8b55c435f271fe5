//! Postgres backend (sqlx).

mod error;

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use masa_core::health::{HealthIndicator, HealthStatus};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

pub use self::error::SqlxErrorExt;
use self::error::db;
use crate::error::{DataError, DataResult};
use crate::models::*;
use crate::page::{Page, Pageable};
use crate::repository::*;

/// Open a connection pool.
pub async fn connect(url: &str, max_connections: u32) -> DataResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(db)
}

/// Apply the bundled migrations.
pub async fn migrate(pool: &PgPool) -> DataResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DataError::database)?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Pool-backed store implementing every repository.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// `SELECT 1` against the pool.
pub struct DatabaseHealth {
    pool: PgPool,
}

impl DatabaseHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl HealthIndicator for DatabaseHealth {
    fn name(&self) -> &str {
        "database"
    }

    fn check(&self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + '_>> {
        Box::pin(async move {
            match sqlx::query("SELECT 1").execute(&self.pool).await {
                Ok(_) => HealthStatus::Up,
                Err(e) => HealthStatus::Down(e.to_string()),
            }
        })
    }
}

#[async_trait]
impl OrganizationRepository for PgStore {
    async fn find(&self, id: Uuid) -> DataResult<Option<Organization>> {
        sqlx::query_as("SELECT * FROM organizations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn find_by_slug(&self, slug: &str) -> DataResult<Option<Organization>> {
        sqlx::query_as("SELECT * FROM organizations WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn list(&self) -> DataResult<Vec<Organization>> {
        sqlx::query_as("SELECT * FROM organizations ORDER BY created_at, slug")
            .fetch_all(&self.pool)
            .await
            .map_err(db)
    }

    async fn create(&self, new: NewOrganization, now: DateTime<Utc>) -> DataResult<Organization> {
        sqlx::query_as(
            "INSERT INTO organizations (id, name, slug, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&new.name)
        .bind(&new.slug)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn write_document(
        &self,
        id: Uuid,
        document: OrgDocument,
        value: Value,
        now: DateTime<Utc>,
    ) -> DataResult<Option<Organization>> {
        let sql = format!(
            "UPDATE organizations SET {} = $2, updated_at = $3 WHERE id = $1 RETURNING *",
            document.column()
        );
        sqlx::query_as(&sql)
            .bind(id)
            .bind(value)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn find(&self, id: Uuid) -> DataResult<Option<Profile>> {
        sqlx::query_as("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn find_by_email(&self, email: &str) -> DataResult<Option<Profile>> {
        sqlx::query_as("SELECT * FROM profiles WHERE email = $1")
            .bind(email.to_lowercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn list(&self) -> DataResult<Vec<Profile>> {
        sqlx::query_as("SELECT * FROM profiles ORDER BY email")
            .fetch_all(&self.pool)
            .await
            .map_err(db)
    }

    async fn create(&self, new: NewProfile, now: DateTime<Utc>) -> DataResult<Profile> {
        sqlx::query_as(
            "INSERT INTO profiles (id, organization_id, email, full_name, role, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.organization_id)
        .bind(new.email.to_lowercase())
        .bind(&new.full_name)
        .bind(new.role)
        .bind(&new.password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> DataResult<Option<Profile>> {
        sqlx::query_as("UPDATE profiles SET role = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(role)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn set_password_hash(&self, id: Uuid, password_hash: &str) -> DataResult<bool> {
        let result = sqlx::query("UPDATE profiles SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PasswordResetRepository for PgStore {
    async fn insert(&self, reset: PasswordReset) -> DataResult<()> {
        sqlx::query("INSERT INTO password_resets (token, profile_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&reset.token)
            .bind(reset.profile_id)
            .bind(reset.expires_at)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(())
    }

    async fn take(&self, token: &str) -> DataResult<Option<PasswordReset>> {
        sqlx::query_as("DELETE FROM password_resets WHERE token = $1 RETURNING *")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }
}

#[async_trait]
impl TableRepository for PgStore {
    async fn list(&self, organization_id: Uuid) -> DataResult<Vec<Table>> {
        sqlx::query_as("SELECT * FROM tables WHERE organization_id = $1 ORDER BY name")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Table>> {
        sqlx::query_as("SELECT * FROM tables WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn find_by_qr_token(&self, organization_id: Uuid, qr_token: &str) -> DataResult<Option<Table>> {
        sqlx::query_as("SELECT * FROM tables WHERE qr_token = $1 AND organization_id = $2")
            .bind(qr_token)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn create(&self, new: NewTable, now: DateTime<Utc>) -> DataResult<Table> {
        sqlx::query_as(
            "INSERT INTO tables (id, organization_id, name, capacity, qr_token, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.organization_id)
        .bind(&new.name)
        .bind(new.capacity)
        .bind(&new.qr_token)
        .bind(new.is_active)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn update(&self, organization_id: Uuid, id: Uuid, update: TableUpdate) -> DataResult<Option<Table>> {
        sqlx::query_as(
            "UPDATE tables SET name = COALESCE($3, name), capacity = COALESCE($4, capacity), \
             is_active = COALESCE($5, is_active) \
             WHERE id = $1 AND organization_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(organization_id)
        .bind(update.name)
        .bind(update.capacity)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)
    }

    async fn set_qr_token(&self, organization_id: Uuid, id: Uuid, qr_token: &str) -> DataResult<Option<Table>> {
        sqlx::query_as("UPDATE tables SET qr_token = $3 WHERE id = $1 AND organization_id = $2 RETURNING *")
            .bind(id)
            .bind(organization_id)
            .bind(qr_token)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Vec<ServiceRequest>>> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        // Removed explicitly so callers can announce each row; the FK cascade
        // would drop them silently.
        let removed: Vec<ServiceRequest> = sqlx::query_as(
            "DELETE FROM service_requests WHERE table_id = $1 AND organization_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db)?;

        let result = sqlx::query("DELETE FROM tables WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        if result.rows_affected() == 0 {
            tx.rollback().await.map_err(db)?;
            return Ok(None);
        }

        tx.commit().await.map_err(db)?;
        Ok(Some(removed))
    }
}

#[async_trait]
impl CategoryRepository for PgStore {
    async fn list(&self, organization_id: Uuid) -> DataResult<Vec<Category>> {
        sqlx::query_as("SELECT * FROM categories WHERE organization_id = $1 ORDER BY sort_order, name")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Category>> {
        sqlx::query_as("SELECT * FROM categories WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn create(&self, new: NewCategory, now: DateTime<Utc>) -> DataResult<Category> {
        sqlx::query_as(
            "INSERT INTO categories (id, organization_id, name, description, sort_order, is_active, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.organization_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.sort_order)
        .bind(new.is_active)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn update(&self, organization_id: Uuid, id: Uuid, update: CategoryUpdate) -> DataResult<Option<Category>> {
        sqlx::query_as(
            "UPDATE categories SET name = COALESCE($3, name), \
             description = CASE WHEN $4 THEN $5 ELSE description END, \
             sort_order = COALESCE($6, sort_order), is_active = COALESCE($7, is_active) \
             WHERE id = $1 AND organization_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(organization_id)
        .bind(update.name)
        .bind(update.description.is_some())
        .bind(update.description.flatten())
        .bind(update.sort_order)
        .bind(update.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductRepository for PgStore {
    async fn list(&self, organization_id: Uuid, category_id: Option<Uuid>) -> DataResult<Vec<Product>> {
        sqlx::query_as(
            "SELECT * FROM products WHERE organization_id = $1 \
             AND ($2::uuid IS NULL OR category_id = $2) ORDER BY sort_order, name",
        )
        .bind(organization_id)
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<Product>> {
        sqlx::query_as("SELECT * FROM products WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn create(&self, new: NewProduct, now: DateTime<Utc>) -> DataResult<Product> {
        sqlx::query_as(
            "INSERT INTO products (id, organization_id, category_id, name, description, price_cents, \
             image_url, is_available, sort_order, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.organization_id)
        .bind(new.category_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price_cents)
        .bind(&new.image_url)
        .bind(new.is_available)
        .bind(new.sort_order)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn update(&self, organization_id: Uuid, id: Uuid, update: ProductUpdate) -> DataResult<Option<Product>> {
        sqlx::query_as(
            "UPDATE products SET category_id = COALESCE($3, category_id), name = COALESCE($4, name), \
             description = CASE WHEN $5 THEN $6 ELSE description END, \
             price_cents = COALESCE($7, price_cents), \
             image_url = CASE WHEN $8 THEN $9 ELSE image_url END, \
             is_available = COALESCE($10, is_available), sort_order = COALESCE($11, sort_order) \
             WHERE id = $1 AND organization_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(organization_id)
        .bind(update.category_id)
        .bind(update.name)
        .bind(update.description.is_some())
        .bind(update.description.flatten())
        .bind(update.price_cents)
        .bind(update.image_url.is_some())
        .bind(update.image_url.flatten())
        .bind(update.is_available)
        .bind(update.sort_order)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)
    }

    async fn delete(&self, organization_id: Uuid, id: Uuid) -> DataResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ServiceRequestRepository for PgStore {
    async fn count_since(&self, table_id: Uuid, since: DateTime<Utc>) -> DataResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM service_requests WHERE table_id = $1 AND created_at >= $2",
        )
        .bind(table_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;
        Ok(count.max(0) as u64)
    }

    async fn insert(&self, new: NewServiceRequest, now: DateTime<Utc>) -> DataResult<ServiceRequest> {
        sqlx::query_as(
            "INSERT INTO service_requests (id, organization_id, table_id, request_type, status, message, session_id, created_at) \
             VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(new.organization_id)
        .bind(new.table_id)
        .bind(new.request_type)
        .bind(&new.message)
        .bind(&new.session_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db)
    }

    async fn find(&self, organization_id: Uuid, id: Uuid) -> DataResult<Option<ServiceRequest>> {
        sqlx::query_as("SELECT * FROM service_requests WHERE id = $1 AND organization_id = $2")
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)
    }

    async fn list(
        &self,
        organization_id: Uuid,
        status: Option<RequestStatus>,
        pageable: Pageable,
    ) -> DataResult<Page<ServiceRequest>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM service_requests WHERE organization_id = $1 \
             AND ($2::request_status IS NULL OR status = $2)",
        )
        .bind(organization_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(db)?;

        let content = sqlx::query_as(
            "SELECT * FROM service_requests WHERE organization_id = $1 \
             AND ($2::request_status IS NULL OR status = $2) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
        )
        .bind(organization_id)
        .bind(status)
        .bind(pageable.limit() as i64)
        .bind(pageable.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        Ok(Page::new(content, &pageable, total.max(0) as u64))
    }

    async fn transition(
        &self,
        organization_id: Uuid,
        id: Uuid,
        transition: Transition,
        handled_by: Uuid,
        now: DateTime<Utc>,
    ) -> DataResult<TransitionOutcome> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let old: Option<ServiceRequest> = sqlx::query_as(
            "SELECT * FROM service_requests WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db)?;

        let Some(old) = old else {
            return Ok(TransitionOutcome::NotFound);
        };
        if !transition.can_apply(old.status) {
            return Ok(TransitionOutcome::InvalidState(old.status));
        }

        let next = transition.apply(&old, handled_by, now);
        let new: ServiceRequest = sqlx::query_as(
            "UPDATE service_requests SET status = $3, acknowledged_at = $4, completed_at = $5, handled_by = $6 \
             WHERE id = $1 AND organization_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(organization_id)
        .bind(next.status)
        .bind(next.acknowledged_at)
        .bind(next.completed_at)
        .bind(next.handled_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(db)?;

        tx.commit().await.map_err(db)?;
        Ok(TransitionOutcome::Updated { old, new })
    }

    async fn pending_ids(&self, organization_id: Uuid) -> DataResult<Vec<Uuid>> {
        sqlx::query_scalar("SELECT id FROM service_requests WHERE organization_id = $1 AND status = 'pending'")
            .bind(organization_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db)
    }
}
