//! Stored provider key infrastructure

mod in_memory;
mod vault;

pub use in_memory::InMemoryApiKeyRepository;
pub use vault::ApiKeyVault;
