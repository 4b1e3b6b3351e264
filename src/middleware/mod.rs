mod auth;
mod error_handler;

pub use auth::{OptionalClaims, auth_middleware, optional_auth};
pub use error_handler::log_errors;
