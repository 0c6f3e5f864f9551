//! Usage simulation
//!
//! Projects what a usage profile costs per day and over a period, with and
//! without the top-ranked optimization strategies applied.

mod simulator;

pub use simulator::{
    AppliedStrategy, MAX_COMBINED_SAVINGS, OptimizedProjection, UsageProfile, UsageProjection,
    UsageSimulator,
};
