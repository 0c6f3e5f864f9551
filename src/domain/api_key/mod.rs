//! Stored provider keys
//!
//! Per-user provider credentials used when a session's key source is the
//! user's own key.

mod entity;
mod repository;
mod validation;

pub use entity::{ApiKeyId, StoredApiKey, fingerprint, mask_secret};
pub use repository::ApiKeyRepository;
pub use validation::{ApiKeyValidationError, validate_api_key_label, validate_api_key_secret};
