//! Common types for the Keycloak admin token service

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
