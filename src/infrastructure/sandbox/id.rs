//! Session id generation
//!
//! Ids are opaque and unguessable: a fixed prefix followed by URL-safe
//! base64 of random bytes.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::domain::session::SessionId;

#[derive(Debug, Clone)]
pub struct SessionIdGenerator {
    prefix: String,
    id_bytes: usize,
}

impl Default for SessionIdGenerator {
    fn default() -> Self {
        Self::new("sess_")
    }
}

impl SessionIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            id_bytes: 24,
        }
    }

    /// Set the number of random bytes
    pub fn with_id_bytes(mut self, bytes: usize) -> Self {
        self.id_bytes = bytes;
        self
    }

    pub fn generate(&self) -> SessionId {
        let mut random_bytes = vec![0u8; self.id_bytes];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        SessionId::new(format!(
            "{}{}",
            self.prefix,
            URL_SAFE_NO_PAD.encode(&random_bytes)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_format() {
        let id = SessionIdGenerator::default().generate();

        assert!(id.as_str().starts_with("sess_"));
        // 24 bytes encode to 32 base64 characters
        assert_eq!(id.as_str().len(), 5 + 32);
        assert!(
            id.as_str()[5..]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_unique() {
        let generator = SessionIdGenerator::default();
        let ids: HashSet<_> = (0..100).map(|_| generator.generate()).collect();

        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_custom_prefix_and_length() {
        let id = SessionIdGenerator::new("test_").with_id_bytes(3).generate();

        assert!(id.as_str().starts_with("test_"));
        assert_eq!(id.as_str().len(), 5 + 4);
    }
}
