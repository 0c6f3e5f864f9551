//! Baseline infrastructure implementations

mod in_memory;
mod service;
mod sql_repository;

pub use in_memory::InMemoryBaselineRepository;
pub use service::BaselineManager;
pub use sql_repository::SqlBaselineRepository;
