//! Baselines: stored reference aggregates for comparing later runs

mod entity;
mod repository;

pub use entity::{
    Baseline, BaselineComparison, BaselineValidationError, CallAverages, validate_scenario_name,
};
pub use repository::BaselineRepository;
