//! Session sandboxing: id generation, the session registry and its sweeper

mod id;
mod manager;
mod sweeper;

pub use id::SessionIdGenerator;
pub use manager::{DEFAULT_GRACE_PERIOD_MS, SandboxManager, SandboxSettings};
pub use sweeper::spawn_purge_task;
