//! Business operations behind the HTTP handlers. Every operation returns
//! [`masa_core::ActionResult`] and never panics on bad input.

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod menu;
pub mod organizations;
pub mod service_requests;
pub mod tables;

use serde::{Deserialize, Deserializer};
use uuid::Uuid;

pub use admin::AdminService;
pub use auth::AuthService;
pub use catalog::CatalogService;
pub use menu::MenuService;
pub use organizations::OrganizationService;
pub use service_requests::ServiceRequestService;
pub use tables::TableService;

/// Cache key of the public menu of an organization.
pub fn menu_key(organization_id: Uuid) -> String {
    format!("menu:{organization_id}")
}

/// Prefix of every cached dashboard view of an organization.
pub fn dashboard_prefix(organization_id: Uuid) -> String {
    format!("dashboard:{organization_id}:")
}

/// Emails are compared and stored lowercase.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// garde rule for patchable optional text: when set, at most `max` characters.
pub(crate) fn nullable_text(max: usize) -> impl FnOnce(&Option<Option<String>>, &()) -> garde::Result {
    move |value, _| match value {
        Some(Some(text)) if text.chars().count() > max => {
            Err(garde::Error::new(format!("length is greater than {max}")))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        description: Option<Option<String>>,
    }

    #[test]
    fn absent_and_null_are_distinct() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        let null: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(absent.description, None);
        assert_eq!(null.description, Some(None));
        assert_eq!(set.description, Some(Some("x".into())));
    }

    #[test]
    fn nullable_text_limits_characters() {
        assert!(nullable_text(3)(&Some(Some("çağ".into())), &()).is_ok());
        assert!(nullable_text(3)(&Some(Some("abcd".into())), &()).is_err());
        assert!(nullable_text(3)(&Some(None), &()).is_ok());
    }
}
