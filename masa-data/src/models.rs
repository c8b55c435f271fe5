//! Entities. Every tenant-owned row carries its `organization_id`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub settings: Value,
    pub theme: Value,
    pub legal: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn document(&self, document: OrgDocument) -> &Value {
        match document {
            OrgDocument::Settings => &self.settings,
            OrgDocument::Theme => &self.theme,
            OrgDocument::Legal => &self.legal,
        }
    }
}

/// The JSON blobs stored on an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgDocument {
    Settings,
    Theme,
    Legal,
}

impl OrgDocument {
    pub fn column(self) -> &'static str {
        match self {
            OrgDocument::Settings => "settings",
            OrgDocument::Theme => "theme",
            OrgDocument::Legal => "legal",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrganization {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "user_role", rename_all = "snake_case"))]
pub enum Role {
    Superadmin,
    Owner,
    Staff,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Owner => "owner",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "superadmin" => Ok(Role::Superadmin),
            "owner" => Ok(Role::Owner),
            "staff" => Ok(Role::Staff),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Profile {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub organization_id: Option<Uuid>,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct PasswordReset {
    pub token: String,
    pub profile_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Table {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub qr_token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTable {
    pub organization_id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub qr_token: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TableUpdate {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Category {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub organization_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

/// Partial update. `description: Some(None)` clears the column.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub organization_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price_cents: Option<i64>,
    pub image_url: Option<Option<String>>,
    pub is_available: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "request_type", rename_all = "snake_case"))]
pub enum RequestType {
    CallWaiter,
    RequestBill,
    NeedHelp,
    Feedback,
    Complaint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "request_status", rename_all = "snake_case"))]
pub enum RequestStatus {
    Pending,
    Acknowledged,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Acknowledged => "acknowledged",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_pending(self) -> bool {
        self == RequestStatus::Pending
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ServiceRequest {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub table_id: Uuid,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub message: Option<String>,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub handled_by: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewServiceRequest {
    pub organization_id: Uuid,
    pub table_id: Uuid,
    pub request_type: RequestType,
    pub message: Option<String>,
    pub session_id: Option<String>,
}

/// Staff actions on a service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Acknowledge,
    Start,
    Complete,
    Cancel,
}

impl Transition {
    /// Statuses the transition may start from.
    pub fn allowed_from(self) -> &'static [RequestStatus] {
        use RequestStatus::*;
        match self {
            Transition::Acknowledge => &[Pending],
            Transition::Start => &[Pending, Acknowledged],
            Transition::Complete | Transition::Cancel => &[Pending, Acknowledged, InProgress],
        }
    }

    pub fn target(self) -> RequestStatus {
        match self {
            Transition::Acknowledge => RequestStatus::Acknowledged,
            Transition::Start => RequestStatus::InProgress,
            Transition::Complete => RequestStatus::Completed,
            Transition::Cancel => RequestStatus::Cancelled,
        }
    }

    pub fn can_apply(self, from: RequestStatus) -> bool {
        self.allowed_from().contains(&from)
    }

    /// Produce the updated row. Callers check [`can_apply`](Self::can_apply) first.
    pub fn apply(self, row: &ServiceRequest, handled_by: Uuid, now: DateTime<Utc>) -> ServiceRequest {
        let mut next = row.clone();
        next.status = self.target();
        next.handled_by = Some(handled_by);
        match self {
            Transition::Acknowledge => next.acknowledged_at = Some(now),
            Transition::Start => {
                next.acknowledged_at.get_or_insert(now);
            }
            Transition::Complete | Transition::Cancel => next.completed_at = Some(now),
        }
        next
    }
}

/// Result of a guarded status update.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Updated {
        old: ServiceRequest,
        new: ServiceRequest,
    },
    NotFound,
    InvalidState(RequestStatus),
}
