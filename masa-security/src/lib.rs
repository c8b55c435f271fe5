//! Authentication for the dashboard and admin APIs.
//!
//! Sessions are HS256 JWTs issued at login; [`StaffUser`] validates the
//! bearer token on every authenticated request. Passwords are stored as
//! argon2 PHC strings.

pub mod config;
pub mod error;
pub mod extractor;
pub mod jwt;
pub mod password;
pub mod token;

pub use config::JwtConfig;
pub use error::SecurityError;
pub use extractor::{extract_bearer_token, StaffUser};
pub use jwt::{Claims, TokenService};
pub use password::{hash_password, verify_password};
pub use token::random_token;
