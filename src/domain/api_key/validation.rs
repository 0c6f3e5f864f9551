//! Provider key validation

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiKeyValidationError {
    #[error("API key secret cannot be empty")]
    EmptySecret,

    #[error("API key secret must be at least {0} characters")]
    TooShort(usize),

    #[error("API key secret exceeds maximum length of {0} characters")]
    TooLong(usize),

    #[error("API key secret cannot contain whitespace")]
    ContainsWhitespace,

    #[error("API key label exceeds maximum length of {0} characters")]
    LabelTooLong(usize),
}

const MIN_SECRET_LENGTH: usize = 8;
const MAX_SECRET_LENGTH: usize = 512;
const MAX_LABEL_LENGTH: usize = 100;

/// Validate a provider secret before it is stored
///
/// Rules:
/// - Between 8 and 512 characters
/// - No whitespace anywhere
pub fn validate_api_key_secret(secret: &str) -> Result<(), ApiKeyValidationError> {
    if secret.is_empty() {
        return Err(ApiKeyValidationError::EmptySecret);
    }

    if secret.chars().any(char::is_whitespace) {
        return Err(ApiKeyValidationError::ContainsWhitespace);
    }

    let len = secret.chars().count();

    if len < MIN_SECRET_LENGTH {
        return Err(ApiKeyValidationError::TooShort(MIN_SECRET_LENGTH));
    }

    if len > MAX_SECRET_LENGTH {
        return Err(ApiKeyValidationError::TooLong(MAX_SECRET_LENGTH));
    }

    Ok(())
}

pub fn validate_api_key_label(label: &str) -> Result<(), ApiKeyValidationError> {
    if label.chars().count() > MAX_LABEL_LENGTH {
        return Err(ApiKeyValidationError::LabelTooLong(MAX_LABEL_LENGTH));
    }

    Ok(())
}
