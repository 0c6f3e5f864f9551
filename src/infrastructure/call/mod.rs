//! Call tracking infrastructure implementations

mod in_memory;
mod sql_repository;
mod tracker;

pub use in_memory::InMemoryApiCallRepository;
pub use sql_repository::SqlApiCallRepository;
pub use tracker::CostTracker;
