//! Sandboxed experiment sessions
//!
//! A session tracks one user's simulated API usage inside a bounded window and
//! enforces call, token and lifetime quotas.

mod config;
mod entity;
mod limits;
mod snapshot;

pub use config::{IsolationLevel, KeySource, SessionConfig};
pub use entity::{ExperimentSession, SessionId, SessionTotals};
pub use limits::ResourceLimits;
pub use snapshot::{SessionMetrics, SessionSnapshot};
