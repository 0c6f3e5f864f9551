//! Tracked API calls and their aggregates

mod record;
mod repository;

pub use record::{ApiCallRecord, ExperimentSummary, NewApiCall, RecordedCall};
pub use repository::ApiCallRepository;

#[cfg(test)]
pub use repository::MockApiCallRepository;
