//! Shared building blocks for the Masa services: layered configuration,
//! the tagged error taxonomy with localized messages, tracing setup, a TTL
//! query cache, JSON merge patch, health probes and an injectable clock.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod i18n;
pub mod json;
pub mod layers;
pub mod validation;

pub use cache::QueryCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ConfigValue, FromConfig, MasaConfig};
pub use error::{ActionError, ActionResult, ApiResponse, ErrorKind, FieldError};
pub use i18n::{Locale, MessageKey};
pub use layers::init_tracing;

pub mod prelude {
    //! Re-exports of the most commonly used types.
    pub use crate::error::{ActionError, ActionResult, ApiResponse, ErrorKind};
    pub use crate::i18n::{Locale, MessageKey};
    pub use crate::validation::{validate, Validate};
}
